//! Per-job temporary working directories.

use std::path::Path;

use docconv_common::{Error, Result};
use tempfile::TempDir;

use crate::job::ConversionJob;

/// Private working directory for a single conversion.
///
/// The engine's profile directory, the uploaded input, and every file the
/// engine produces live here. The directory is removed when the workspace is
/// dropped, whichever way the request ends.
///
/// # Example
///
/// ```no_run
/// use docconv_engine::JobWorkspace;
///
/// let workspace = JobWorkspace::new()?;
/// assert!(workspace.path().is_dir());
/// # Ok::<(), docconv_common::Error>(())
/// ```
#[derive(Debug)]
pub struct JobWorkspace {
    temp_dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh, empty workspace under the system temp directory.
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("docconv-")
            .tempdir()
            .map_err(|e| Error::internal(format!("failed to create temp dir: {e}")))?;
        Ok(Self { temp_dir })
    }

    /// Create a workspace inside a specific parent directory.
    pub fn new_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("docconv-")
            .tempdir_in(parent)
            .map_err(|e| Error::internal(format!("failed to create temp dir: {e}")))?;
        Ok(Self { temp_dir })
    }

    /// Get the workspace directory path.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write the uploaded document to the job's input path.
    pub async fn write_input(&self, job: &ConversionJob, data: &[u8]) -> Result<()> {
        self.check_owned(job)?;
        tokio::fs::write(job.input_path(), data).await?;
        Ok(())
    }

    /// Read the converted document from the job's output path.
    pub async fn read_output(&self, job: &ConversionJob) -> Result<Vec<u8>> {
        self.check_owned(job)?;
        Ok(tokio::fs::read(job.output_path()).await?)
    }

    fn check_owned(&self, job: &ConversionJob) -> Result<()> {
        if job.work_dir() != self.path() {
            return Err(Error::internal(format!(
                "job directory {:?} does not belong to workspace {:?}",
                job.work_dir(),
                self.path()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ConversionRequest;
    use docconv_common::FormatRegistry;

    fn job_in(workspace: &JobWorkspace) -> ConversionJob {
        ConversionRequest::resolve(
            &FormatRegistry::builtin(),
            Some(r#"attachment; filename="report.odt""#),
            "pdf",
        )
        .unwrap()
        .into_job(workspace.path())
    }

    #[test]
    fn test_workspace_is_empty_dir() {
        let workspace = JobWorkspace::new().unwrap();
        assert!(workspace.path().is_dir());
        assert_eq!(std::fs::read_dir(workspace.path()).unwrap().count(), 0);
        assert!(workspace
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("docconv-"));
    }

    #[test]
    fn test_workspaces_are_distinct() {
        let a = JobWorkspace::new().unwrap();
        let b = JobWorkspace::new().unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_removed_on_drop() {
        let workspace = JobWorkspace::new().unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(workspace.path().join("conversion.odt"), b"data").unwrap();
        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn test_new_in_parent() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = JobWorkspace::new_in(parent.path()).unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.starts_with(parent.path()));
        drop(workspace);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_input_output_round_trip() {
        let workspace = JobWorkspace::new().unwrap();
        let job = job_in(&workspace);

        workspace.write_input(&job, b"odt bytes").await.unwrap();
        assert_eq!(std::fs::read(job.input_path()).unwrap(), b"odt bytes");

        std::fs::write(job.output_path(), b"pdf bytes").unwrap();
        assert_eq!(workspace.read_output(&job).await.unwrap(), b"pdf bytes");
    }

    #[tokio::test]
    async fn test_rejects_foreign_job() {
        let workspace = JobWorkspace::new().unwrap();
        let other = JobWorkspace::new().unwrap();
        let job = job_in(&other);
        assert!(workspace.write_input(&job, b"x").await.is_err());
    }
}
