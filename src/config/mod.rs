mod types;

pub use types::*;

use anyhow::{Context, Result};
use docconv_common::FormatRegistry;
use docconv_engine::{EngineSettings, PoolSettings, SupervisorSettings};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Extra time the supervisor allows beyond the wrapper's own limit, so the
/// wrapper normally fires first and its exit code is logged.
const EXECUTION_GRACE: Duration = Duration::from_secs(5);

/// Load configuration from a TOML file, then apply environment overrides
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./docconv.toml",
        "~/.config/docconv/config.toml",
        "/etc/docconv/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply the deployment environment variables on top of `config`.
///
/// `lookup` returns the raw value for a variable name, if set. Each variable
/// overrides one field independently; a value that does not parse is an
/// error rather than silently ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let conv = &mut config.conversion;
    override_from(&lookup, "MAX_ATTEMPTS", &mut conv.max_attempts)?;
    override_from(&lookup, "MAX_CONVERTERS", &mut conv.max_converters)?;
    override_from(
        &lookup,
        "POOL_CONVERT_TIMEOUT",
        &mut conv.pool_convert_timeout_secs,
    )?;
    override_from(&lookup, "RETRY_WAIT_PERIOD", &mut conv.retry_wait_period_secs)?;
    override_from(&lookup, "EXECUTION_TIMEOUT", &mut conv.execution_timeout_secs)?;

    if let Some(host) = lookup("LISTEN_HOST").filter(|h| !h.trim().is_empty()) {
        config.server.host = host.trim().to_string();
    }
    override_from(&lookup, "LISTEN_PORT", &mut config.server.port)?;

    Ok(())
}

fn override_from<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw))?;
    }
    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }
    if config.server.max_body_bytes == 0 {
        anyhow::bail!("server.max_body_bytes must be at least 1");
    }

    let conv = &config.conversion;
    if conv.max_attempts == 0 {
        anyhow::bail!("conversion.max_attempts must be at least 1");
    }
    if conv.max_converters == 0 {
        anyhow::bail!("conversion.max_converters must be at least 1");
    }
    if conv.pool_convert_timeout_secs == 0 {
        anyhow::bail!("conversion.pool_convert_timeout_secs must be at least 1");
    }
    if conv.execution_timeout_secs == 0 {
        anyhow::bail!("conversion.execution_timeout_secs must be at least 1");
    }

    if config.engine.soffice.trim().is_empty() {
        anyhow::bail!("engine.soffice cannot be empty");
    }
    if config.engine.pdftohtml.trim().is_empty() {
        anyhow::bail!("engine.pdftohtml cannot be empty");
    }

    for format in &config.formats {
        if format.extension.trim().is_empty() {
            anyhow::bail!("Configured format has an empty extension");
        }
        if format.content_type.trim().is_empty() {
            anyhow::bail!("Format '{}' has no content_type", format.extension);
        }
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.is_dir() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}

impl Config {
    /// Built-in formats followed by the configured ones.
    pub fn format_registry(&self) -> FormatRegistry {
        let mut registry = FormatRegistry::builtin();
        for format in &self.formats {
            registry.register(format.clone());
        }
        registry
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            soffice: self.engine.soffice.clone(),
            pdftohtml: self.engine.pdftohtml.clone(),
            timeout_program: self
                .engine
                .timeout_program
                .clone()
                .filter(|p| !p.trim().is_empty()),
            execution_timeout: Duration::from_secs(self.conversion.execution_timeout_secs),
        }
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            max_attempts: self.conversion.max_attempts,
            retry_wait: Duration::from_secs(self.conversion.retry_wait_period_secs),
            execution_timeout: Duration::from_secs(self.conversion.execution_timeout_secs)
                + EXECUTION_GRACE,
        }
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            size: self.conversion.max_converters,
            wait_timeout: Duration::from_secs(self.conversion.pool_convert_timeout_secs),
        }
    }
}
