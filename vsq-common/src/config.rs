//! Configuration loading and config file discovery
//!
//! Config file location follows this priority order:
//! 1. Explicit path (command-line argument)
//! 2. `VSQ_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/vsq/config.toml` on Linux)
//!
//! A missing config file is never fatal: callers get `TomlConfig::default()`
//! and a warning in the log.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VSQ_CONFIG";

/// Default log level when neither config nor `RUST_LOG` specify one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Tracing filter level (e.g. "info", "debug", "vsq_pipeline=trace")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// On-disk configuration shared by the VSQ binaries
///
/// Every field is optional; per-field resolution against ENV and CLI
/// happens in the consuming crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the remote recognition/valuation backend
    pub api_base_url: Option<String>,
    /// Override for the bundled specification catalog (JSON file)
    pub catalog_path: Option<PathBuf>,
    /// Directory holding the example image gallery
    pub gallery_dir: Option<PathBuf>,
    /// Per-request timeout for remote calls; absent means no timeout
    pub request_timeout_secs: Option<u64>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load config from a file
    ///
    /// Returns defaults (with a warning) if the file does not exist.
    /// A file that exists but cannot be parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let (config, source) = Self::read(path)?;
        source.log();
        Ok(config)
    }

    /// Discover and load the config file without logging
    ///
    /// Binaries call this before tracing is installed and report the
    /// returned [`ConfigSource`] afterwards. Discovery never fails; only a
    /// malformed file produces an error.
    pub fn discover(cli_path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_path) {
            Some(path) => Self::read(&path),
            None => Ok((Self::default(), ConfigSource::Unavailable)),
        }
    }

    fn read(path: &Path) -> Result<(Self, ConfigSource)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Missing(path.to_path_buf())));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Resolved path does not exist; defaults used
    Missing(PathBuf),
    /// No config location could be determined; defaults used
    Unavailable,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file not found at {}, using defaults",
                path.display()
            ),
            ConfigSource::Unavailable => {
                warn!("No config file location available, using defaults")
            }
        }
    }
}

/// Resolve the config file path by priority (CLI → ENV → platform default)
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Platform config file location (`<config_dir>/vsq/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vsq").join("config.toml"))
}
