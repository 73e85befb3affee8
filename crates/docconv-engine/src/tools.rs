//! External tool detection.

use std::path::PathBuf;
use std::process::Command;

use crate::plan::EngineSettings;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
///
/// # Example
///
/// ```no_run
/// use docconv_engine::check_tool;
///
/// let info = check_tool("soffice");
/// if info.available {
///     println!("soffice version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "--version")
}

/// Check if a tool is available using a custom version argument.
///
/// Some tools (pdftohtml) print their version on stderr, so both streams
/// are consulted.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    let path = which::which(name).ok();
    let result = Command::new(name).arg(version_arg).output();

    match result {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let version = stdout
                .lines()
                .chain(stderr.lines())
                .find(|l| !l.trim().is_empty())
                .map(|s| s.trim().to_string());

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        Err(_) => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check every tool the configured engine may invoke.
pub fn check_tools(settings: &EngineSettings) -> Vec<ToolInfo> {
    let mut tools = vec![
        check_tool(&settings.soffice),
        check_tool_with_arg(&settings.pdftohtml, "-v"),
    ];
    if let Some(ref wrapper) = settings.timeout_program {
        tools.push(check_tool(wrapper));
    }
    tools
}
