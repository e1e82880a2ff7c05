//! Configuration types

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upload size cap enforced before dispatch (10 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// What happens to analysis and training artifacts when a new dataset is uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationPolicy {
    /// Leave downstream artifacts in place. They may describe the old dataset.
    #[default]
    Retain,
    /// Delete every artifact derived from the previous upload.
    ClearDownstream,
}

/// Readiness poll applied between training and the first visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessConfig {
    pub initial_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl ReadinessConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// No waiting at all. Used by tests and scripted runs.
    pub fn immediate() -> Self {
        Self {
            initial_delay_ms: 0,
            poll_interval_ms: 0,
            max_attempts: 1,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            poll_interval_ms: 500,
            max_attempts: 10,
        }
    }
}

/// Controller policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub max_upload_bytes: u64,
    pub invalidation: InvalidationPolicy,
    pub readiness: ReadinessConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            invalidation: InvalidationPolicy::default(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_upload_bytes > 0
    /// - readiness.max_attempts > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.max_upload_bytes".to_string(),
                value: self.max_upload_bytes.to_string(),
                reason: "max_upload_bytes must be greater than 0".to_string(),
            });
        }

        if self.readiness.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.readiness.max_attempts".to_string(),
                value: self.readiness.max_attempts.to_string(),
                reason: "max_attempts must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
