//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which installs a fake `soffice` shell script in a
//! temp directory, builds a [`ConversionService`] around it, and can start
//! Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docconv::config::Config;
use docconv::server::{create_router, AppContext};
use docconv::service::ConversionService;
use tempfile::TempDir;

/// Copies the input (last argument) to `conversion.<ext>`, where `<ext>` is
/// the part of the `--convert-to` value before the first colon.
pub const COPYING_SOFFICE: &str = r#"for last; do :; done
fmt=""
prev=""
for arg; do
    [ "$prev" = "--convert-to" ] && fmt="${arg%%:*}"
    prev="$arg"
done
cp "$last" "conversion.$fmt""#;

/// Like [`COPYING_SOFFICE`], but takes half a second.
pub fn slow_copying_soffice() -> String {
    format!("sleep 0.5\n{COPYING_SOFFICE}")
}

/// Always fails without producing output.
pub const FAILING_SOFFICE: &str = r#"echo "Error: source file could not be loaded" >&2
exit 1"#;

/// Test harness wrapping a [`ConversionService`] backed by a fake engine.
pub struct TestHarness {
    pub ctx: AppContext,
    /// Holds the fake engine and the job scratch directory.
    pub dir: TempDir,
}

impl TestHarness {
    /// Harness whose engine copies the input through unchanged.
    pub fn new() -> Self {
        Self::with_script(COPYING_SOFFICE, Config::default())
    }

    /// Harness whose engine runs `script` under `sh`.
    pub fn with_script(script: &str, mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let soffice = write_script(dir.path(), "soffice", script);

        config.engine.soffice = soffice.to_string_lossy().into_owned();
        config.engine.timeout_program = None;

        let scratch = dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).expect("failed to create scratch dir");

        let service = Arc::new(ConversionService::new(&config).with_scratch_dir(&scratch));
        let ctx = AppContext {
            service,
            config: Arc::new(config),
        };

        Self { ctx, dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start an Axum server around a custom engine script and config.
    pub async fn with_server_script(script: &str, config: Config) -> (Self, SocketAddr) {
        Self::with_script(script, config).serve().await
    }

    async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Job directories currently present in the scratch area.
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.scratch_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }
}

/// Write an executable shell script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}
