//! CLI end-to-end tests
//!
//! Tests for the docconv command-line interface.

#![cfg(unix)]

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the docconv binary
#[allow(deprecated)]
fn docconv_cmd() -> Command {
    let mut cmd = Command::cargo_bin("docconv").unwrap();
    for key in [
        "MAX_ATTEMPTS",
        "MAX_CONVERTERS",
        "POOL_CONVERT_TIMEOUT",
        "RETRY_WAIT_PERIOD",
        "EXECUTION_TIMEOUT",
        "LISTEN_HOST",
        "LISTEN_PORT",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Config pointing the engine at a fake soffice in `dir`.
fn fake_engine_config(dir: &Path) -> std::path::PathBuf {
    let soffice = common::write_script(dir, "soffice", common::COPYING_SOFFICE);
    let config = dir.join("docconv.toml");
    fs::write(
        &config,
        format!(
            r#"
[engine]
soffice = "{}"
timeout_program = ""
"#,
            soffice.display()
        ),
    )
    .unwrap();
    config
}

#[test]
fn test_cli_no_args_shows_help() {
    docconv_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    docconv_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("docconv"));
}

#[test]
fn test_cli_version_command() {
    docconv_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_start_help() {
    docconv_cmd()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Start the HTTP conversion server"));
}

#[test]
fn test_cli_formats() {
    docconv_cmd()
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("docx"))
        .stdout(predicate::str::contains("writer8"));
}

#[test]
fn test_cli_check_tools_command() {
    docconv_cmd()
        .arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("soffice"))
        .stdout(predicate::str::contains("pdftohtml"));
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("docconv.toml");
    fs::write(
        &config,
        r#"
[server]
port = 8000

[conversion]
max_attempts = 3
max_converters = 2
"#,
    )
    .unwrap();

    docconv_cmd()
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Workers: 2"));
}

#[test]
fn test_cli_validate_rejects_zero_workers() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("docconv.toml");
    fs::write(&config, "[conversion]\nmax_converters = 0\n").unwrap();

    docconv_cmd()
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_converters"));
}

#[test]
fn test_cli_validate_rejects_bad_env_override() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("docconv.toml");
    fs::write(&config, "").unwrap();

    docconv_cmd()
        .env("MAX_ATTEMPTS", "lots")
        .args(["validate", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MAX_ATTEMPTS"));
}

#[test]
fn test_cli_convert_file() {
    let temp = tempdir().unwrap();
    let config = fake_engine_config(temp.path());
    let input = temp.path().join("letter.odt");
    fs::write(&input, "letter body").unwrap();

    docconv_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "convert",
            input.to_str().unwrap(),
            "--to",
            "pdf",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("letter.pdf"));

    assert_eq!(
        fs::read_to_string(temp.path().join("letter.pdf")).unwrap(),
        "letter body"
    );
}

#[test]
fn test_cli_convert_explicit_output() {
    let temp = tempdir().unwrap();
    let config = fake_engine_config(temp.path());
    let input = temp.path().join("letter.odt");
    let output = temp.path().join("out").join("converted.docx");
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&input, "letter body").unwrap();

    docconv_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "convert",
            input.to_str().unwrap(),
            "--to",
            "docx",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "letter body");
}

#[test]
fn test_cli_convert_unknown_destination() {
    let temp = tempdir().unwrap();
    let config = fake_engine_config(temp.path());
    let input = temp.path().join("letter.odt");
    fs::write(&input, "x").unwrap();

    docconv_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "convert",
            input.to_str().unwrap(),
            "--to",
            "exe",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported destination format"));
}

#[test]
fn test_cli_convert_nonexistent_file() {
    docconv_cmd()
        .args(["convert", "/nonexistent/path/letter.odt", "--to", "pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_start_invalid_port() {
    docconv_cmd()
        .args(["start", "--port", "99999"])
        .assert()
        .failure();
}
