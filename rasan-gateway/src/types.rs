//! Request bodies sent to the backend.

use rasan_core::{ChartKind, PredictionInput, ProblemType};
use serde::{Deserialize, Serialize};

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub filename: String,
    /// Absent requests an un-targeted analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
}

/// Body of `POST /train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub filename: String,
    pub target: String,
    pub problem_type: ProblemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

/// Body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub model_id: String,
    pub data: PredictionInput,
}

/// Parameters of `POST /visualizations/{model_id}/predict-and-visualize`.
///
/// Sent as path and query parameters, not as a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizeRequest {
    pub model_id: String,
    pub filename: String,
    pub target_column: String,
    /// Empty lets the backend pick the default set for the problem type.
    #[serde(default)]
    pub chart_types: Vec<ChartKind>,
}

impl VisualizeRequest {
    pub fn path(&self) -> String {
        format!(
            "/visualizations/{}/predict-and-visualize",
            urlencoding::encode(&self.model_id)
        )
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("filename", self.filename.clone()),
            ("target_column", self.target_column.clone()),
        ];
        query.extend(
            self.chart_types
                .iter()
                .map(|kind| ("chart_types", kind.as_str().to_string())),
        );
        query
    }
}
