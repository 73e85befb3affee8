//! Command planning: decide exactly what to run for a job.
//!
//! Planning is pure. A [`CommandPlan`] describes the program, arguments,
//! environment, expected output, and an optional post-processing stage;
//! the [`Supervisor`](crate::Supervisor) is the only thing that executes it.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docconv_common::{ConversionLog, Format, Result};

use crate::inline::inline_images;
use crate::job::ConversionJob;

/// Default hard timeout passed to the `timeout` wrapper.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(20);

/// Flags that keep a headless soffice from touching anything interactive.
const SOFFICE_QUIET_FLAGS: &[&str] = &[
    "--writer",
    "--nocrashreport",
    "--nodefault",
    "--nofirststartwizard",
    "--nologo",
    "--norestore",
];

/// Which external invocation a format pair needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Headless soffice with the destination's export filter.
    GenericConvert,
    /// `pdftohtml` followed by inlining the extracted images.
    ExtractAndInline,
}

impl Strategy {
    /// Select the strategy for a source/destination pair.
    pub fn select(source: &Format, destination: &Format) -> Self {
        if source.matches("pdf") && destination.matches("html") {
            Self::ExtractAndInline
        } else {
            Self::GenericConvert
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenericConvert => write!(f, "generic-convert"),
            Self::ExtractAndInline => write!(f, "extract-and-inline"),
        }
    }
}

/// Second stage run after every attempt of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    /// Rewrite `intermediate` into `output` with local images embedded as
    /// data URIs, then delete `intermediate`.
    InlineImages {
        intermediate: PathBuf,
        output: PathBuf,
        base_dir: PathBuf,
    },
}

impl PostProcess {
    /// Run the stage, appending progress lines to `log`.
    pub fn run(&self, log: &mut ConversionLog) -> Result<()> {
        match self {
            Self::InlineImages {
                intermediate,
                output,
                base_dir,
            } => inline_images(intermediate, output, base_dir, log),
        }
    }
}

/// Names of the external programs and the hard timeout they run under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// LibreOffice binary.
    pub soffice: String,
    /// Poppler's pdftohtml binary.
    pub pdftohtml: String,
    /// Wrapper enforcing a wall-clock limit (`timeout`); `None` disables it.
    pub timeout_program: Option<String>,
    /// Limit handed to the wrapper.
    pub execution_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            soffice: "soffice".to_string(),
            pdftohtml: "pdftohtml".to_string(),
            timeout_program: Some("timeout".to_string()),
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }
}

/// A fully specified external invocation.
///
/// # Example
///
/// ```
/// use docconv_engine::CommandPlan;
/// use std::path::Path;
///
/// let mut plan = CommandPlan::new("sh", Path::new("/tmp/job"), Path::new("/tmp/job/out.pdf"));
/// plan.arg("-c").arg("touch out.pdf");
/// assert_eq!(plan.command_line(), "sh -c 'touch out.pdf'");
/// ```
#[derive(Debug, Clone)]
pub struct CommandPlan {
    strategy: Strategy,
    program: String,
    args: Vec<String>,
    env: BTreeMap<OsString, OsString>,
    work_dir: PathBuf,
    output_path: PathBuf,
    post_process: Option<PostProcess>,
}

impl CommandPlan {
    /// Create a plan with no arguments and an empty environment.
    pub fn new(program: impl Into<String>, work_dir: &Path, output_path: &Path) -> Self {
        Self {
            strategy: Strategy::GenericConvert,
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            work_dir: work_dir.to_path_buf(),
            output_path: output_path.to_path_buf(),
            post_process: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set one environment variable.
    pub fn env(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Copy the current process environment into the plan.
    pub fn inherit_env(&mut self) -> &mut Self {
        self.env.extend(std::env::vars_os());
        self
    }

    pub fn post_process(&mut self, stage: PostProcess) -> &mut Self {
        self.post_process = Some(stage);
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn environment(&self) -> &BTreeMap<OsString, OsString> {
        &self.env
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// File whose presence after a zero exit means success.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn post_process_stage(&self) -> Option<&PostProcess> {
        self.post_process.as_ref()
    }

    /// Shell-style rendering used in logs.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Builds [`CommandPlan`]s from jobs.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    settings: EngineSettings,
}

impl Planner {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Produce the plan for a job.
    pub fn plan(&self, job: &ConversionJob) -> CommandPlan {
        let strategy = Strategy::select(job.source(), job.destination());
        let mut plan = match strategy {
            Strategy::GenericConvert => self.generic_convert(job),
            Strategy::ExtractAndInline => self.extract_and_inline(job),
        };
        plan.strategy = strategy;
        plan.inherit_env();

        tracing::debug!(
            strategy = %strategy,
            "Planned command: {}",
            plan.command_line()
        );
        plan
    }

    fn generic_convert(&self, job: &ConversionJob) -> CommandPlan {
        let mut plan = self.wrapped(&self.settings.soffice, job);
        plan.arg("--headless")
            .arg("--convert-to")
            .arg(job.destination().convert_to_target());

        if let Some(ref filter) = job.source().input_filter {
            plan.arg(format!("--infilter={filter}"));
        }

        plan.arg(format!(
            "-env:UserInstallation=file://{}",
            job.work_dir().display()
        ))
        .args(SOFFICE_QUIET_FLAGS.iter().copied())
        .arg(job.input_path().to_string_lossy());
        plan
    }

    fn extract_and_inline(&self, job: &ConversionJob) -> CommandPlan {
        let mut plan = self.wrapped(&self.settings.pdftohtml, job);
        plan.args(["-nomerge", "-s", "-c"])
            .arg(job.input_path().to_string_lossy());

        let mut intermediate = job.stem_path().into_os_string();
        intermediate.push("-html.html");

        plan.post_process(PostProcess::InlineImages {
            intermediate: PathBuf::from(intermediate),
            output: job.output_path(),
            base_dir: job.work_dir().to_path_buf(),
        });
        plan
    }

    /// Start a plan for `tool`, behind the timeout wrapper when configured.
    fn wrapped(&self, tool: &str, job: &ConversionJob) -> CommandPlan {
        let output = job.output_path();
        match self.settings.timeout_program.as_deref() {
            Some(wrapper) if !wrapper.is_empty() => {
                let secs = self.settings.execution_timeout.as_secs().max(1);
                let mut plan = CommandPlan::new(wrapper, job.work_dir(), &output);
                plan.arg(format!("{secs}s")).arg(tool);
                plan
            }
            _ => CommandPlan::new(tool, job.work_dir(), &output),
        }
    }
}
