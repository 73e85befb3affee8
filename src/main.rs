mod cli;

use docconv::{config, server, service::ConversionService};
use docconv_engine::check_tools;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting docconv server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    for tool in check_tools(&config.engine_settings()) {
        if !tool.available {
            tracing::warn!("External tool not found: {}", tool.name);
        }
    }

    let service = Arc::new(ConversionService::new(&config));
    server::start_server(config, service).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "docconv=trace,docconv_engine=trace,docconv_common=debug,tower_http=debug".to_string()
        } else {
            "docconv=info,docconv_engine=info,docconv_common=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert { input, to, output } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(&input, &to, output, cli.config.as_deref()))
        }
        Commands::Formats => list_formats(cli.config.as_deref()),
        Commands::CheckTools => check_external_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("docconv {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert_file(
    input: &Path,
    to: &str,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !input.is_file() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }

    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Input path has no file name")?;
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {:?}", input))?;

    let service = ConversionService::new(&config);
    let disposition = format!("attachment; filename=\"{}\"", filename);
    let result = service.convert(Some(&disposition), to, &data).await;
    service.shutdown();
    let document = result?;

    let output = output.unwrap_or_else(|| input.with_file_name(&document.filename));
    tokio::fs::write(&output, &document.data)
        .await
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "{} -> {} ({}, {} bytes)",
        input.display(),
        output.display(),
        document.content_type,
        document.data.len()
    );
    Ok(())
}

fn list_formats(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = config.format_registry();

    println!("{:<8} {:<74} CONVERT-TO", "EXT", "CONTENT-TYPE");
    for format in registry.iter() {
        println!(
            "{:<8} {:<74} {}",
            format.extension,
            format.content_type,
            format.convert_to_target()
        );
    }
    Ok(())
}

fn check_external_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = check_tools(&config.engine_settings());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all conversions.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Workers: {}", config.conversion.max_converters);
            println!("  Attempts per job: {}", config.conversion.max_attempts);
            println!(
                "  Timeouts: {}s execution, {}s pool wait",
                config.conversion.execution_timeout_secs,
                config.conversion.pool_convert_timeout_secs
            );
            println!("  Extra formats: {}", config.formats.len());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
