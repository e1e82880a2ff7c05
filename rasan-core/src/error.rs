//! Error types for RASAN pipeline operations

use crate::enums::{ArtifactKey, Stage};
use crate::normalize::extract_error_message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// How a backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The backend rejected the request with a structured field-error list.
    Validation,
    /// Any other non-2xx response.
    Backend,
    /// A 2xx response whose body did not match the expected shape.
    Decode,
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            GatewayErrorKind::Transport => "transport",
            GatewayErrorKind::Validation => "validation",
            GatewayErrorKind::Backend => "backend",
            GatewayErrorKind::Decode => "decode",
        };
        f.write_str(value)
    }
}

/// Normalized failure of a single backend call.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind} error: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    /// HTTP status when a response was received.
    pub status: Option<u16>,
    /// The raw error payload (the `detail` field when the backend sends one).
    pub raw: Option<Value>,
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Transport,
            message: message.into(),
            status: None,
            raw: None,
        }
    }

    pub fn decode(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: GatewayErrorKind::Decode,
            message: message.into(),
            status: Some(status),
            raw: None,
        }
    }

    /// Build from a non-2xx response. `raw` is the already-unwrapped payload.
    pub fn from_payload(status: u16, raw: Value) -> Self {
        let kind = if status == 422 || raw.is_array() {
            GatewayErrorKind::Validation
        } else {
            GatewayErrorKind::Backend
        };
        let extracted = extract_error_message(&raw);
        let message = if extracted.trim().is_empty() || raw.is_null() {
            format!("HTTP {}", status)
        } else {
            extracted
        };
        Self {
            kind,
            message,
            status: Some(status),
            raw: Some(raw),
        }
    }

    /// Build from a 2xx payload that reports a failure in-band (e.g. a
    /// training response with `status: "failed"`).
    pub fn in_band(status: u16, raw: Option<Value>, fallback: &str) -> Self {
        let message = raw
            .as_ref()
            .map(extract_error_message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Self {
            kind: GatewayErrorKind::Backend,
            message,
            status: Some(status),
            raw,
        }
    }
}

/// Result type alias for backend calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Artifact store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("IO error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Serialization error for {key}: {reason}")]
    Serde { key: ArtifactKey, reason: String },

    #[error("Stored artifact {key} is corrupt: {reason}")]
    Corrupt { key: ArtifactKey, reason: String },

    #[error("Store file {path} is unreadable: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// User-facing failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    MissingPrerequisite,
    TransportFailure,
    ValidationFailure,
    PartialVisualizationFailure,
    GenericBackendFailure,
}

/// Master error type for stage operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    #[error("Cannot enter {stage}: missing {missing}, go back to {redirect_to}")]
    MissingPrerequisite {
        stage: Stage,
        missing: ArtifactKey,
        redirect_to: Stage,
    },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Backend call failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Response for {key} superseded by a newer request")]
    Stale { key: ArtifactKey },

    #[error("Model {model_id} not ready after {attempts} attempts")]
    NotReady { model_id: String, attempts: u32 },
}

impl PipelineError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            PipelineError::MissingPrerequisite { .. } => FailureCategory::MissingPrerequisite,
            PipelineError::InvalidInput { .. } => FailureCategory::ValidationFailure,
            PipelineError::Gateway(err) => match err.kind {
                GatewayErrorKind::Transport => FailureCategory::TransportFailure,
                GatewayErrorKind::Validation => FailureCategory::ValidationFailure,
                GatewayErrorKind::Backend | GatewayErrorKind::Decode => {
                    FailureCategory::GenericBackendFailure
                }
            },
            PipelineError::Storage(_)
            | PipelineError::Stale { .. }
            | PipelineError::NotReady { .. } => FailureCategory::GenericBackendFailure,
        }
    }

    /// Human-readable text for a status line. Backend failures show only the
    /// extracted message.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Gateway(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for stage operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_field_errors_are_validation() {
        let err = GatewayError::from_payload(
            422,
            json!([{"loc": ["body", "target"], "msg": "field required", "type": "value_error.missing"}]),
        );
        assert_eq!(err.kind, GatewayErrorKind::Validation);
        assert_eq!(err.message, "body.target: field required");
        assert_eq!(err.status, Some(422));
    }

    #[test]
    fn test_from_payload_string_detail_is_backend() {
        let err = GatewayError::from_payload(400, json!("Target column 'y' not found in dataset"));
        assert_eq!(err.kind, GatewayErrorKind::Backend);
        assert_eq!(err.message, "Target column 'y' not found in dataset");
    }

    #[test]
    fn test_from_payload_empty_falls_back_to_status() {
        let err = GatewayError::from_payload(502, json!(""));
        assert_eq!(err.message, "HTTP 502");
        let err = GatewayError::from_payload(500, Value::Null);
        assert_eq!(err.message, "HTTP 500");
    }

    #[test]
    fn test_in_band_failure_uses_error_field() {
        let err = GatewayError::in_band(200, Some(json!("pycaret setup failed")), "Training failed");
        assert_eq!(err.message, "pycaret setup failed");
        let err = GatewayError::in_band(200, None, "Training failed");
        assert_eq!(err.message, "Training failed");
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            PipelineError::from(GatewayError::transport("connection refused")).category(),
            FailureCategory::TransportFailure
        );
        assert_eq!(
            PipelineError::from(GatewayError::from_payload(422, json!([]))).category(),
            FailureCategory::ValidationFailure
        );
        assert_eq!(
            PipelineError::MissingPrerequisite {
                stage: Stage::Analyze,
                missing: ArtifactKey::UploadedFile,
                redirect_to: Stage::Upload,
            }
            .category(),
            FailureCategory::MissingPrerequisite
        );
    }

    #[test]
    fn test_missing_prerequisite_display() {
        let err = PipelineError::MissingPrerequisite {
            stage: Stage::Results,
            missing: ArtifactKey::TrainingResult,
            redirect_to: Stage::Train,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Results"));
        assert!(msg.contains("trainingResult"));
        assert!(msg.contains("Train"));
    }
}
