//! The conversion service shared by the HTTP handlers and the CLI.

use std::path::PathBuf;

use bytes::Bytes;
use docconv_common::{Error, FormatRegistry, Result};
use docconv_engine::{ConversionRequest, JobWorkspace, Planner, Supervisor, WorkerPool};
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::config::Config;

/// A finished conversion, ready to send back.
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    /// Download name, e.g. `report.pdf`.
    pub filename: String,
    /// MIME type of the destination format.
    pub content_type: String,
    pub data: Bytes,
}

impl ConvertedDocument {
    /// `attachment; filename="<name>"`
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// Format catalog plus the worker pool, built once at startup.
#[derive(Debug)]
pub struct ConversionService {
    registry: FormatRegistry,
    pool: WorkerPool,
    scratch_dir: Option<PathBuf>,
}

impl ConversionService {
    pub fn new(config: &Config) -> Self {
        let registry = config.format_registry();
        let pool = WorkerPool::new(
            config.pool_settings(),
            Planner::new(config.engine_settings()),
            Supervisor::new(config.supervisor_settings()),
        );

        info!(
            "Conversion service ready: formats [{}], {} workers, {} attempt(s) per job",
            registry.extensions().join(", "),
            pool.size(),
            config.conversion.max_attempts
        );

        Self {
            registry,
            pool,
            scratch_dir: None,
        }
    }

    /// Create job workspaces under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Convert `body` into the `destination` format.
    ///
    /// `content_disposition` supplies the original filename, whose extension
    /// selects the source format. All temporary files are gone by the time
    /// this returns.
    pub async fn convert(
        &self,
        content_disposition: Option<&str>,
        destination: &str,
        body: &[u8],
    ) -> Result<ConvertedDocument> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("convert", %request_id, destination);
        self.convert_inner(content_disposition, destination, body)
            .instrument(span)
            .await
    }

    async fn convert_inner(
        &self,
        content_disposition: Option<&str>,
        destination: &str,
        body: &[u8],
    ) -> Result<ConvertedDocument> {
        let request = ConversionRequest::resolve(&self.registry, content_disposition, destination)?;

        info!(
            "Converting {:?} ({} bytes) from {} to {}",
            request.original_filename(),
            body.len(),
            request.source().extension,
            request.destination().extension
        );

        let workspace = match self.scratch_dir {
            Some(ref dir) => JobWorkspace::new_in(dir)?,
            None => JobWorkspace::new()?,
        };
        let job = request.into_job(workspace.path());
        workspace.write_input(&job, body).await?;

        let log = self.pool.submit(job.clone())?.wait().await?;
        if !log.is_empty() {
            error!("Conversion of {:?} failed:", job.original_filename());
            for line in &log {
                error!("{}", line);
            }
            return Err(Error::ConversionExhausted { log });
        }

        let data = workspace.read_output(&job).await?;
        info!(
            "Converted {:?} to {:?} ({} bytes)",
            job.original_filename(),
            job.download_filename(),
            data.len()
        );

        Ok(ConvertedDocument {
            filename: job.download_filename().to_string(),
            content_type: job.response_mime_type().to_string(),
            data: Bytes::from(data),
        })
    }

    /// Stop accepting conversions and cancel the ones in flight.
    pub fn shutdown(&self) {
        info!("Shutting down conversion service");
        self.pool.close();
    }
}
