//! # docconv-engine
//!
//! Conversion orchestration for docconv.
//!
//! This crate provides:
//!
//! - **Request resolution** ([`ConversionRequest`]) -- turn untrusted request
//!   metadata into a fully specified [`ConversionJob`].
//! - **Workspaces** ([`JobWorkspace`]) -- one private temporary directory per
//!   job, removed on drop.
//! - **Command planning** ([`Planner`]) -- pick the external invocation for a
//!   source/destination pair, including the PDF to HTML extract-and-inline
//!   pipeline.
//! - **Supervision** ([`Supervisor`]) -- run a [`CommandPlan`] with bounded
//!   retries, a per-attempt timeout, and process-group cleanup.
//! - **Scheduling** ([`WorkerPool`]) -- cap the number of concurrent
//!   conversions and bound how long callers wait.
//! - **Tool discovery** ([`tools`]) -- check that soffice, pdftohtml and
//!   timeout are installed.
//!
//! ## Example
//!
//! ```no_run
//! use docconv_common::FormatRegistry;
//! use docconv_engine::{
//!     ConversionRequest, JobWorkspace, Planner, PoolSettings, Supervisor, SupervisorSettings,
//!     WorkerPool,
//! };
//!
//! # async fn example() -> docconv_common::Result<()> {
//! let registry = FormatRegistry::builtin();
//! let request = ConversionRequest::resolve(
//!     &registry,
//!     Some(r#"attachment; filename="report.odt""#),
//!     "pdf",
//! )?;
//!
//! let workspace = JobWorkspace::new()?;
//! let job = request.into_job(workspace.path());
//! workspace.write_input(&job, b"...").await?;
//!
//! let pool = WorkerPool::new(
//!     PoolSettings::default(),
//!     Planner::default(),
//!     Supervisor::new(SupervisorSettings::default()),
//! );
//! let log = pool.submit(job.clone())?.wait().await?;
//! assert!(log.is_empty());
//! let pdf = workspace.read_output(&job).await?;
//! # let _ = pdf;
//! # Ok(())
//! # }
//! ```

mod inline;
pub mod job;
pub mod plan;
pub mod pool;
pub mod supervisor;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use inline::inline_images;
pub use job::{ConversionJob, ConversionRequest};
pub use plan::{CommandPlan, EngineSettings, Planner, PostProcess, Strategy};
pub use pool::{PoolSettings, PoolTicket, WorkerPool};
pub use supervisor::{Supervisor, SupervisorSettings};
pub use tools::{check_tool, check_tools, ToolInfo};
pub use workspace::JobWorkspace;
