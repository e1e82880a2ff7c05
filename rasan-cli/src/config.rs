//! Configuration loading for the `rasan` binary.
//!
//! `api_base_url` and `store_path` are required. Everything else has a
//! default.

use rasan_core::PipelineConfig;
use rasan_gateway::HttpGatewayConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when `--config` is absent.
pub const CONFIG_ENV: &str = "RASAN_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    pub api_base_url: String,
    /// Absent means no client-side timeout.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// JSON file holding the session's artifacts between invocations.
    pub store_path: PathBuf,
    #[serde(default)]
    pub log_filter: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or RASAN_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<rasan_core::ConfigError> for ConfigError {
    fn from(err: rasan_core::ConfigError) -> Self {
        match err {
            rasan_core::ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => ConfigError::InvalidValue {
                field,
                reason: format!("{} (got {})", reason, value),
            },
        }
    }
}

impl CliConfig {
    /// Load from `path`, falling back to `RASAN_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(config_path_from_env)
            .ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api_base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url".to_string(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms".to_string(),
                reason: "must be > 0 when set".to_string(),
            });
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        self.pipeline.validate()?;
        Ok(())
    }

    pub fn gateway_config(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.api_base_url.trim().to_string(),
            timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}
