//! Error types for the CLI.

use crate::config::ConfigError;
use rasan_core::{GatewayError, PipelineError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}", .0.user_message())]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid argument {arg}: {reason}")]
    InvalidArgument { arg: String, reason: String },
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

pub type CliResult<T> = Result<T, CliError>;
