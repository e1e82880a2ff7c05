//! Tracing subscriber setup.

use crate::config::LogFormat;
use crate::error::{CliError, CliResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "RASAN_LOG";

const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive: `RASAN_LOG`, then the config file, then `info`.
pub fn filter_directive(env_value: Option<String>, configured: Option<&str>) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init(configured: Option<&str>, format: LogFormat) -> CliResult<()> {
    let directive = filter_directive(std::env::var(LOG_ENV).ok(), configured);
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| CliError::Logging(format!("bad filter '{}': {}", directive, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| CliError::Logging(e.to_string()))?;

    tracing::debug!(filter = %directive, format = ?format, "Logging initialized");
    Ok(())
}
