//! Supervised execution of a [`CommandPlan`].
//!
//! Each attempt runs the planned program in the job directory with the
//! planned environment, captures its output, runs the post-process stage,
//! and checks for the expected output file. Failed attempts are retried up
//! to `max_attempts` times with a fixed wait in between.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use docconv_common::ConversionLog;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::plan::CommandPlan;

/// How long to keep reading pipes after the process is gone.
const PIPE_GRACE: Duration = Duration::from_secs(2);

/// Retry and timeout policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Total attempts, including the first (at least 1).
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_wait: Duration,
    /// Wall-clock limit for one attempt.
    pub execution_timeout: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_wait: Duration::from_secs(1),
            execution_timeout: Duration::from_secs(25),
        }
    }
}

/// How an attempt's process ended.
#[derive(Debug)]
enum Exit {
    Exited(ExitStatus),
    TimedOut(Duration),
    Cancelled,
}

impl Exit {
    fn success(&self) -> bool {
        matches!(self, Self::Exited(status) if status.success())
    }

    fn describe(&self) -> String {
        match self {
            Self::Exited(status) => match status.code() {
                Some(code) => format!("Got RC {code}"),
                None => killed_by(status),
            },
            Self::TimedOut(limit) => format!("Timed out after {}s", limit.as_secs()),
            Self::Cancelled => "Cancelled".to_string(),
        }
    }
}

#[cfg(unix)]
fn killed_by(status: &ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => format!("Killed by signal {signal}"),
        None => format!("Got RC none ({status})"),
    }
}

#[cfg(not(unix))]
fn killed_by(status: &ExitStatus) -> String {
    format!("Got RC none ({status})")
}

struct Attempt {
    exit: Exit,
    stdout: String,
    stderr: String,
}

/// Runs command plans under the retry/timeout policy.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    settings: SupervisorSettings,
}

impl Supervisor {
    pub fn new(mut settings: SupervisorSettings) -> Self {
        settings.max_attempts = settings.max_attempts.max(1);
        Self { settings }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Execute `plan` until it succeeds, attempts run out, or `cancel` fires.
    ///
    /// Returns an empty log on success. Otherwise returns every line
    /// collected across all attempts. Faults that prevent an attempt from
    /// running at all (spawn errors, post-process I/O errors) are recorded
    /// as a single line and end the loop.
    pub async fn run(&self, plan: &CommandPlan, cancel: &CancellationToken) -> ConversionLog {
        let max = self.settings.max_attempts;
        let output = plan.output_path();
        let mut log = ConversionLog::new();

        for attempt in 1..=max {
            if cancel.is_cancelled() {
                log.push("Cancelled before attempt started");
                return log;
            }

            debug!("Conversion attempt {}/{}: {}", attempt, max, plan.command_line());
            log.push("Running command:");
            log.push(plan.command_line());

            let result = match self.attempt(plan, cancel).await {
                Ok(result) => result,
                Err(e) => {
                    log.push(format!("Failed to run {}: {e}", plan.program()));
                    return log;
                }
            };

            log.push(result.exit.describe());
            log.push(result.stdout);
            log.push(result.stderr);

            if let Some(stage) = plan.post_process_stage() {
                if let Err(e) = stage.run(&mut log) {
                    log.push(format!("Post-processing failed: {e}"));
                    return log;
                }
            }

            if result.exit.success() && output.is_file() {
                if attempt > 1 {
                    info!("Conversion succeeded on attempt {}/{}", attempt, max);
                }
                return ConversionLog::new();
            }

            if output.exists() {
                if let Err(e) = std::fs::remove_file(output) {
                    log.push(format!("Failed to remove stale {}: {e}", output.display()));
                    return log;
                }
            }

            if matches!(result.exit, Exit::Cancelled) {
                return log;
            }

            warn!(
                "Conversion attempt {}/{} failed: {}",
                attempt,
                max,
                result.exit.describe()
            );

            if attempt < max {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.retry_wait) => {}
                    _ = cancel.cancelled() => {
                        log.push("Cancelled while waiting to retry");
                        return log;
                    }
                }
            }
        }

        log
    }

    async fn attempt(
        &self,
        plan: &CommandPlan,
        cancel: &CancellationToken,
    ) -> std::io::Result<Attempt> {
        let mut cmd = Command::new(plan.program());
        cmd.args(plan.arguments())
            .current_dir(plan.work_dir())
            .env_clear()
            .envs(plan.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so the wrapper and everything it forks can be
        // killed together.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let stdout = tokio::spawn(drain(child.stdout.take()));
        let stderr = tokio::spawn(drain(child.stderr.take()));

        let limit = self.settings.execution_timeout;
        let exit = tokio::select! {
            status = child.wait() => Exit::Exited(status?),
            _ = tokio::time::sleep(limit) => Exit::TimedOut(limit),
            _ = cancel.cancelled() => Exit::Cancelled,
        };

        if !matches!(exit, Exit::Exited(_)) {
            terminate(&mut child).await;
        }

        Ok(Attempt {
            exit,
            stdout: collect(stdout).await,
            stderr: collect(stderr).await,
        })
    }
}

/// Kill the process group led by `child`, then the child itself.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(raw) = i32::try_from(pid) {
            let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
        }
    }
    let _ = child.kill().await;
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

async fn collect(mut task: JoinHandle<Vec<u8>>) -> String {
    match tokio::time::timeout(PIPE_GRACE, &mut task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).replace('\r', ""),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}
