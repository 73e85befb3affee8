use docconv_common::Format;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Extra formats, registered after the built-in table.
    #[serde(default)]
    pub formats: Vec<Format>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `index.html` and other static assets.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Largest accepted upload.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Retry, pool, and timeout knobs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Attempts per conversion, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Conversions allowed to run at once.
    #[serde(default = "default_max_converters")]
    pub max_converters: usize,

    /// How long a request waits for its conversion, queueing included.
    #[serde(default = "default_pool_convert_timeout")]
    pub pool_convert_timeout_secs: u64,

    /// Pause between failed attempts.
    #[serde(default = "default_retry_wait_period")]
    pub retry_wait_period_secs: u64,

    /// Hard limit for one run of the external program.
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    1
}
fn default_max_converters() -> usize {
    5
}
fn default_pool_convert_timeout() -> u64 {
    60
}
fn default_retry_wait_period() -> u64 {
    1
}
fn default_execution_timeout() -> u64 {
    20
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_converters: default_max_converters(),
            pool_convert_timeout_secs: default_pool_convert_timeout(),
            retry_wait_period_secs: default_retry_wait_period(),
            execution_timeout_secs: default_execution_timeout(),
        }
    }
}

/// External programs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_soffice")]
    pub soffice: String,

    #[serde(default = "default_pdftohtml")]
    pub pdftohtml: String,

    /// Wall-clock wrapper; set to an empty string to run tools directly.
    #[serde(default = "default_timeout_program")]
    pub timeout_program: Option<String>,
}

fn default_soffice() -> String {
    "soffice".to_string()
}
fn default_pdftohtml() -> String {
    "pdftohtml".to_string()
}
fn default_timeout_program() -> Option<String> {
    Some("timeout".to_string())
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            soffice: default_soffice(),
            pdftohtml: default_pdftohtml(),
            timeout_program: default_timeout_program(),
        }
    }
}
