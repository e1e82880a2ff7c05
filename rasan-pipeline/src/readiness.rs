//! Model readiness poll.
//!
//! A freshly trained model may not be loadable yet. Instead of waiting a
//! fixed delay, ask the backend for the model until it reports itself loaded.

use rasan_core::{GatewayErrorKind, ModelInfo, PipelineError, PipelineResult, ReadinessConfig};
use rasan_gateway::Gateway;

/// Status values that mean the model can serve predictions.
const READY_STATUSES: &[&str] = &["loaded", "ready"];

pub fn is_ready(info: &ModelInfo) -> bool {
    READY_STATUSES
        .iter()
        .any(|status| info.status.eq_ignore_ascii_case(status))
}

/// Poll `GET /models/{model_id}` until the model is ready.
///
/// Non-2xx answers are treated as "not yet" and polled again. Transport,
/// validation and decode failures end the poll immediately.
pub async fn wait_for_model(
    gateway: &dyn Gateway,
    model_id: &str,
    config: &ReadinessConfig,
) -> PipelineResult<ModelInfo> {
    if !config.initial_delay().is_zero() {
        tokio::time::sleep(config.initial_delay()).await;
    }

    for attempt in 1..=config.max_attempts {
        match gateway.get_model(model_id).await {
            Ok(info) if is_ready(&info) => {
                tracing::debug!(model_id = %model_id, attempt, "Model ready");
                return Ok(info);
            }
            Ok(info) => {
                tracing::debug!(model_id = %model_id, attempt, status = %info.status, "Model not ready");
            }
            Err(e) if e.kind == GatewayErrorKind::Backend => {
                tracing::debug!(model_id = %model_id, attempt, error = %e, "Model not available yet");
            }
            Err(e) => return Err(e.into()),
        }

        if attempt < config.max_attempts && !config.poll_interval().is_zero() {
            tokio::time::sleep(config.poll_interval()).await;
        }
    }

    tracing::warn!(model_id = %model_id, attempts = config.max_attempts, "Model never became ready");
    Err(PipelineError::NotReady {
        model_id: model_id.to_string(),
        attempts: config.max_attempts,
    })
}
