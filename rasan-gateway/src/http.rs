//! reqwest-backed gateway.

use crate::failure::normalize_failure;
use crate::types::{AnalyzeRequest, PredictRequest, TrainRequest, VisualizeRequest};
use crate::Gateway;
use async_trait::async_trait;
use rasan_core::{
    AiStatus, AnalysisResult, DatasetDescriptor, GatewayError, GatewayResult, HealthStatus,
    ModelInfo, PredictionResult, PreprocessRecord, TrainingResponse, UploadFile,
    VisualizationResponse,
};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::Instrument;

/// Default backend location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Connection settings for [`HttpGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

/// Gateway speaking HTTP/JSON to the backend. One attempt per call.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &HttpGatewayConfig) -> GatewayResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> GatewayResult<reqwest::Response> {
        request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Backend unreachable");
            GatewayError::transport(e.to_string())
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let response = self.send(self.client.get(self.url(path))).await?;
        parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::transport(format!("failed to read response body: {}", e)))?;

    if (200..300).contains(&status) {
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(status, error = %e, "Unexpected response shape");
            GatewayError::decode(status, e.to_string())
        })
    } else {
        let err = normalize_failure(status, &body);
        tracing::warn!(status, kind = %err.kind, message = %err.message, "Backend call failed");
        Err(err)
    }
}

fn upload_part(file: &UploadFile) -> GatewayResult<Part> {
    let content_type = file.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&file.filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });
    Part::bytes(file.bytes.clone())
        .file_name(file.filename.clone())
        .mime_str(&content_type)
        .map_err(|e| GatewayError::transport(format!("invalid content type {}: {}", content_type, e)))
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn upload(&self, file: &UploadFile) -> GatewayResult<DatasetDescriptor> {
        let span = tracing::info_span!("gateway.upload", filename = %file.filename, bytes = file.size());
        async {
            let form = Form::new().part("file", upload_part(file)?);
            let response = self
                .send(self.client.post(self.url("/upload")).multipart(form))
                .await?;
            parse_response(response).await
        }
        .instrument(span)
        .await
    }

    async fn preprocess(&self, filename: &str) -> GatewayResult<PreprocessRecord> {
        let span = tracing::info_span!("gateway.preprocess", filename = %filename);
        let path = format!("/preprocess/{}", urlencoding::encode(filename));
        async {
            let response = self.send(self.client.post(self.url(&path))).await?;
            parse_response(response).await
        }
        .instrument(span)
        .await
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> GatewayResult<AnalysisResult> {
        let span = tracing::info_span!(
            "gateway.analyze",
            filename = %request.filename,
            target = request.target_column.as_deref().unwrap_or("")
        );
        self.post_json("/analyze", request).instrument(span).await
    }

    async fn train(&self, request: &TrainRequest) -> GatewayResult<TrainingResponse> {
        let span = tracing::info_span!(
            "gateway.train",
            filename = %request.filename,
            target = %request.target,
            problem_type = %request.problem_type
        );
        self.post_json("/train", request).instrument(span).await
    }

    async fn get_model(&self, model_id: &str) -> GatewayResult<ModelInfo> {
        let span = tracing::debug_span!("gateway.get_model", model_id = %model_id);
        let path = format!("/models/{}", urlencoding::encode(model_id));
        self.get_json(&path).instrument(span).await
    }

    async fn predict(&self, request: &PredictRequest) -> GatewayResult<PredictionResult> {
        let span = tracing::info_span!(
            "gateway.predict",
            model_id = %request.model_id,
            inputs = request.data.len()
        );
        self.post_json("/predict", request).instrument(span).await
    }

    async fn predict_and_visualize(
        &self,
        request: &VisualizeRequest,
    ) -> GatewayResult<VisualizationResponse> {
        let span = tracing::info_span!(
            "gateway.predict_and_visualize",
            model_id = %request.model_id,
            filename = %request.filename,
            charts = request.chart_types.len()
        );
        async {
            let builder = self
                .client
                .post(self.url(&request.path()))
                .query(&request.query());
            let response = self.send(builder).await?;
            parse_response(response).await
        }
        .instrument(span)
        .await
    }

    async fn health(&self) -> GatewayResult<HealthStatus> {
        self.get_json("/health")
            .instrument(tracing::debug_span!("gateway.health"))
            .await
    }

    async fn ai_status(&self) -> GatewayResult<AiStatus> {
        self.get_json("/ai/status")
            .instrument(tracing::debug_span!("gateway.ai_status"))
            .await
    }
}
