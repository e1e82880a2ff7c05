//! RASAN Gateway - Backend Client
//!
//! One method per backend endpoint. Every failure, whether the request never
//! left the machine or the backend answered with a non-2xx status, comes back
//! as a normalized [`GatewayError`](rasan_core::GatewayError). No retries and
//! no timeout unless one is configured.

pub mod failure;
pub mod http;
pub mod types;

pub use failure::normalize_failure;
pub use http::{HttpGateway, HttpGatewayConfig, DEFAULT_BASE_URL};
pub use types::{AnalyzeRequest, PredictRequest, TrainRequest, VisualizeRequest};

use async_trait::async_trait;
use rasan_core::{
    AiStatus, AnalysisResult, DatasetDescriptor, GatewayResult, HealthStatus, ModelInfo,
    PredictionResult, PreprocessRecord, TrainingResponse, UploadFile, VisualizationResponse,
};

// ============================================================================
// GATEWAY TRAIT
// ============================================================================

/// Typed access to the backend endpoint set.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `POST /upload` with the file as multipart field `file`.
    async fn upload(&self, file: &UploadFile) -> GatewayResult<DatasetDescriptor>;

    /// `POST /preprocess/{filename}`.
    async fn preprocess(&self, filename: &str) -> GatewayResult<PreprocessRecord>;

    /// `POST /analyze`.
    async fn analyze(&self, request: &AnalyzeRequest) -> GatewayResult<AnalysisResult>;

    /// `POST /train`. The response carries no target column.
    async fn train(&self, request: &TrainRequest) -> GatewayResult<TrainingResponse>;

    /// `GET /models/{model_id}`. A 2xx answer means the model is known.
    async fn get_model(&self, model_id: &str) -> GatewayResult<ModelInfo>;

    /// `POST /predict`.
    async fn predict(&self, request: &PredictRequest) -> GatewayResult<PredictionResult>;

    /// `POST /visualizations/{model_id}/predict-and-visualize`.
    async fn predict_and_visualize(
        &self,
        request: &VisualizeRequest,
    ) -> GatewayResult<VisualizationResponse>;

    /// `GET /health`.
    async fn health(&self) -> GatewayResult<HealthStatus>;

    /// `GET /ai/status`.
    async fn ai_status(&self) -> GatewayResult<AiStatus>;
}
