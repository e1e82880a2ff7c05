//! RASAN command-line driver.
//!
//! Each invocation opens the JSON artifact file named in the config, runs one
//! stage command against the backend, prints a plain-text summary and the
//! stage's status reports, then exits.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod render;

pub use commands::{execute, Cli, Command};
pub use config::{CliConfig, ConfigError, LogFormat};
pub use error::{CliError, CliResult};

use rasan_gateway::HttpGateway;
use rasan_pipeline::StageController;
use rasan_storage::FileArtifactStore;
use std::sync::Arc;

/// Build a controller over the configured backend and artifact file.
pub fn build_controller(config: &CliConfig) -> CliResult<StageController> {
    let gateway = HttpGateway::new(&config.gateway_config())?;
    let store = FileArtifactStore::open(&config.store_path)?;
    tracing::debug!(
        base_url = %gateway.base_url(),
        store = %store.path().display(),
        "Controller ready"
    );
    Ok(StageController::new(
        Arc::new(gateway),
        Arc::new(store),
        config.pipeline.clone(),
    ))
}
