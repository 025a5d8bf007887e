//! Configuration resolution for vsq-pipeline
//!
//! Each setting resolves independently with priority
//! CLI → environment → TOML → compiled default, and logs where it came from.

use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use vsq_common::config::TomlConfig;
use vsq_common::{Error, Result};

/// Compiled default for the backend base URL
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

pub const ENV_API_BASE_URL: &str = "VSQ_API_BASE_URL";
pub const ENV_CATALOG_PATH: &str = "VSQ_CATALOG_PATH";
pub const ENV_GALLERY_DIR: &str = "VSQ_GALLERY_DIR";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "VSQ_REQUEST_TIMEOUT_SECS";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base_url: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub gallery_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
}

/// Resolved pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub api_base_url: String,
    /// `None` uses the bundled catalog
    pub catalog_path: Option<PathBuf>,
    pub gallery_dir: Option<PathBuf>,
    /// `None` means remote calls never time out
    pub request_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            catalog_path: None,
            gallery_dir: None,
            request_timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Resolve every setting from CLI, environment, and TOML
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let api_base_url = pick(
            "api_base_url",
            cli.api_base_url.clone(),
            env_value(ENV_API_BASE_URL),
            toml_config.api_base_url.clone(),
        )
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let catalog_path = pick(
            "catalog_path",
            cli.catalog_path.clone(),
            env_value(ENV_CATALOG_PATH).map(PathBuf::from),
            toml_config.catalog_path.clone(),
        );

        let gallery_dir = pick(
            "gallery_dir",
            cli.gallery_dir.clone(),
            env_value(ENV_GALLERY_DIR).map(PathBuf::from),
            toml_config.gallery_dir.clone(),
        );

        let env_timeout = env_value(ENV_REQUEST_TIMEOUT_SECS)
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    Error::Config(format!(
                        "{} must be a whole number of seconds, got {:?}",
                        ENV_REQUEST_TIMEOUT_SECS, raw
                    ))
                })
            })
            .transpose()?;
        let request_timeout = pick(
            "request_timeout_secs",
            cli.request_timeout_secs,
            env_timeout,
            toml_config.request_timeout_secs,
        )
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

        if !is_valid_value(&api_base_url) {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }

        Ok(Self {
            api_base_url,
            catalog_path,
            gallery_dir,
            request_timeout,
        })
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_value(v))
}

/// First present value by priority, logging its source
fn pick<T>(setting: &str, cli: Option<T>, env: Option<T>, toml: Option<T>) -> Option<T> {
    let (source, value) = if cli.is_some() {
        ("command line", cli)
    } else if env.is_some() {
        ("environment", env)
    } else if toml.is_some() {
        ("TOML config", toml)
    } else {
        return None;
    };
    info!("{} loaded from {}", setting, source);
    value
}
