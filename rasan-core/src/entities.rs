//! Entity types exchanged with the backend and persisted between stages.

use crate::enums::{ArtifactKey, ChartKind, ProblemType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// A stage output that lives under a fixed key in the artifact store.
pub trait StageArtifact: Serialize + DeserializeOwned {
    const KEY: ArtifactKey;
}

// ============================================================================
// UPLOAD
// ============================================================================

/// Description of an uploaded dataset. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    pub filename: String,
    #[serde(rename = "rows")]
    pub row_count: u64,
    #[serde(rename = "columns")]
    pub column_count: u64,
    pub column_names: Vec<String>,
    #[serde(rename = "memory_usage")]
    pub memory_usage_bytes: u64,
    #[serde(default)]
    pub dtypes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl DatasetDescriptor {
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Column names that appear more than once, in first-repeat order.
    pub fn duplicate_columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for name in &self.column_names {
            if !seen.insert(name.as_str()) && !duplicates.contains(name) {
                duplicates.push(name.clone());
            }
        }
        duplicates
    }
}

impl StageArtifact for DatasetDescriptor {
    const KEY: ArtifactKey = ArtifactKey::UploadedFile;
}

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// CSV when the declared content type is `text/csv`, or, with no declared
    /// type, when the file name carries a `.csv` extension.
    pub fn is_csv(&self) -> bool {
        match &self.content_type {
            Some(content_type) => {
                let essence = content_type
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase();
                essence == "text/csv"
            }
            None => self.filename.to_ascii_lowercase().ends_with(".csv"),
        }
    }
}

// ============================================================================
// PREPROCESS
// ============================================================================

/// Output of the preprocessing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessRecord {
    pub preprocessed_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_shape: Option<(u64, u64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessed_shape: Option<(u64, u64)>,
    #[serde(default)]
    pub missing_values: BTreeMap<String, u64>,
    #[serde(default)]
    pub duplicate_rows: u64,
    #[serde(default)]
    pub numerical_columns: Vec<String>,
    #[serde(default)]
    pub categorical_columns: Vec<String>,
    #[serde(default)]
    pub preprocessing_applied: Vec<String>,
}

impl PreprocessRecord {
    /// The last path segment of `preprocessed_path`, if non-empty.
    pub fn filename(&self) -> Option<&str> {
        self.preprocessed_path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}

impl StageArtifact for PreprocessRecord {
    const KEY: ArtifactKey = ArtifactKey::PreprocessedData;
}

// ============================================================================
// ANALYSIS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCharacteristics {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub total_columns: u64,
    #[serde(default)]
    pub numerical_columns: u64,
    #[serde(default)]
    pub categorical_columns: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_values: Option<u64>,
}

/// Output of the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Absent when no target column was analyzed.
    #[serde(default)]
    pub problem_type: Option<ProblemType>,
    #[serde(default)]
    pub target_column: Option<String>,
    #[serde(default)]
    pub suitable_approaches: Vec<String>,
    #[serde(default)]
    pub data_characteristics: DataCharacteristics,
    #[serde(default)]
    pub recommended_visualizations: Vec<String>,
    #[serde(default)]
    pub ai_insights: Option<String>,
    #[serde(default)]
    pub ai_enabled: bool,
}

impl StageArtifact for AnalysisResult {
    const KEY: ArtifactKey = ArtifactKey::AnalysisResult;
}

// ============================================================================
// TRAINING
// ============================================================================

/// One row of the backend's model-comparison table.
pub type MetricRow = Map<String, Value>;

/// Training response as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResponse {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub model_type: Option<String>,
    pub status: String,
    #[serde(default)]
    pub metrics: Vec<MetricRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Training outcome as persisted: the backend response plus the target the
/// controller trained against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub model_id: String,
    pub model_type: String,
    pub status: String,
    #[serde(default)]
    pub metrics: Vec<MetricRow>,
    pub target_column: String,
}

impl TrainingResult {
    /// Column headers of the metrics table, taken from the first row.
    pub fn metric_columns(&self) -> Vec<&str> {
        self.metrics
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The problem type, when `model_type` carries one of the wire labels.
    pub fn problem_type(&self) -> Option<ProblemType> {
        self.model_type.parse().ok()
    }
}

impl StageArtifact for TrainingResult {
    const KEY: ArtifactKey = ArtifactKey::TrainingResult;
}

/// Response of `GET /models/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub model_id: Option<String>,
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// VISUALIZATION
// ============================================================================

/// A renderable figure (Plotly-style `{data, layout}` object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotFigure(pub Value);

impl PlotFigure {
    pub fn traces(&self) -> &[Value] {
        self.0
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn layout(&self) -> Option<&Map<String, Value>> {
        self.0.get("layout").and_then(Value::as_object)
    }

    pub fn title(&self) -> Option<&str> {
        let title = self.layout()?.get("title")?;
        title
            .as_str()
            .or_else(|| title.get("text").and_then(Value::as_str))
    }
}

/// A chart that failed to render. `error` is kept raw for message extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMarker {
    pub error: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a visualization set. Any object carrying an `error` field is
/// a failure marker, whatever else it contains.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartResult {
    Figure(PlotFigure),
    Failed(ErrorMarker),
}

impl ChartResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, ChartResult::Failed(_))
    }
}

impl<'de> Deserialize<'de> for ChartResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ChartResult::from(value))
    }
}

impl From<Value> for ChartResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut object) if object.contains_key("error") => {
                let error = object.remove("error").unwrap_or(Value::Null);
                ChartResult::Failed(ErrorMarker { error, extra: object })
            }
            other => ChartResult::Figure(PlotFigure(other)),
        }
    }
}

impl Serialize for ChartResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChartResult::Figure(figure) => figure.serialize(serializer),
            ChartResult::Failed(marker) => marker.serialize(serializer),
        }
    }
}

/// Chart kind to chart result, as returned by the predict-and-visualize call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualizationSet(pub BTreeMap<ChartKind, ChartResult>);

impl VisualizationSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, kind: ChartKind, result: ChartResult) {
        self.0.insert(kind, result);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChartKind, &ChartResult)> {
        self.0.iter()
    }
}

impl FromIterator<(ChartKind, ChartResult)> for VisualizationSet {
    fn from_iter<I: IntoIterator<Item = (ChartKind, ChartResult)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl StageArtifact for VisualizationSet {
    const KEY: ArtifactKey = ArtifactKey::Visualizations;
}

/// Sample of true and predicted values attached to a visualization response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionSample {
    #[serde(default)]
    pub y_true: Vec<Value>,
    #[serde(default)]
    pub y_pred: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationResponse {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub problem_type: Option<String>,
    #[serde(default)]
    pub visualizations: VisualizationSet,
    #[serde(default)]
    pub predictions: Option<PredictionSample>,
}

// ============================================================================
// PREDICTION
// ============================================================================

/// Editable model input: one numeric value per non-target column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionInput(pub BTreeMap<String, f64>);

impl PredictionInput {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.0.get(column).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predictions {
    Single(f64),
    Many(Vec<f64>),
}

impl Predictions {
    pub fn values(&self) -> Vec<f64> {
        match self {
            Predictions::Single(value) => vec![*value],
            Predictions::Many(values) => values.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predictions: Predictions,
}

impl StageArtifact for PredictionResult {
    const KEY: ArtifactKey = ArtifactKey::PredictionResult;
}

// ============================================================================
// HEALTH AND EXPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiStatus {
    pub openai_available: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Downloadable summary of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub model_id: String,
    pub model_type: String,
    pub training_result: TrainingResult,
}

impl ExportBundle {
    pub fn from_training(training_result: TrainingResult) -> Self {
        Self {
            model_id: training_result.model_id.clone(),
            model_type: training_result.model_type.clone(),
            training_result,
        }
    }

    pub fn suggested_file_name(&self) -> String {
        format!("{}_results.json", self.model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dataset_descriptor_wire_names() {
        let descriptor: DatasetDescriptor = serde_json::from_value(json!({
            "filename": "houses.csv",
            "rows": 120,
            "columns": 3,
            "column_names": ["area", "rooms", "price"],
            "dtypes": {"area": "float64"},
            "memory_usage": 4096,
            "file_path": "./data/houses.csv"
        }))
        .unwrap();
        assert_eq!(descriptor.row_count, 120);
        assert_eq!(descriptor.memory_usage_bytes, 4096);
        assert!(descriptor.has_column("price"));
        assert!(descriptor.duplicate_columns().is_empty());
    }

    #[test]
    fn test_duplicate_columns_reported_once() {
        let descriptor = DatasetDescriptor {
            filename: "d.csv".to_string(),
            row_count: 1,
            column_count: 4,
            column_names: vec!["a".into(), "b".into(), "a".into(), "a".into()],
            memory_usage_bytes: 0,
            dtypes: BTreeMap::new(),
            file_path: None,
        };
        assert_eq!(descriptor.duplicate_columns(), vec!["a".to_string()]);
    }

    #[test]
    fn test_preprocess_filename_is_last_segment() {
        let record: PreprocessRecord = serde_json::from_value(json!({
            "preprocessed_path": "./data/houses_preprocessed.csv",
            "original_shape": [120, 3],
            "duplicate_rows": 2
        }))
        .unwrap();
        assert_eq!(record.filename(), Some("houses_preprocessed.csv"));
        assert_eq!(record.original_shape, Some((120, 3)));

        let trailing = PreprocessRecord {
            preprocessed_path: "./data/".to_string(),
            ..record
        };
        assert_eq!(trailing.filename(), None);
    }

    #[test]
    fn test_upload_file_csv_detection() {
        let typed = UploadFile::new("data.txt", Some("text/csv; charset=utf-8".into()), vec![]);
        assert!(typed.is_csv());
        let mistyped = UploadFile::new("data.csv", Some("application/json".into()), vec![]);
        assert!(!mistyped.is_csv());
        let untyped = UploadFile::new("DATA.CSV", None, vec![]);
        assert!(untyped.is_csv());
    }

    #[test]
    fn test_chart_result_error_field_marks_failure() {
        let set: VisualizationSet = serde_json::from_value(json!({
            "feature_importance": {"data": [{"type": "bar"}], "layout": {"title": {"text": "FI"}}},
            "roc_curve": {"error": "no probabilities", "data": []},
            "custom_plot": {"data": []}
        }))
        .unwrap();
        assert_eq!(set.len(), 3);
        match &set.0[&ChartKind::FeatureImportance] {
            ChartResult::Figure(figure) => {
                assert_eq!(figure.traces().len(), 1);
                assert_eq!(figure.title(), Some("FI"));
            }
            other => panic!("expected figure, got {:?}", other),
        }
        assert!(set.0[&ChartKind::RocCurve].is_failed());
        assert!(!set.0[&ChartKind::Other("custom_plot".into())].is_failed());
    }

    #[test]
    fn test_analysis_without_target_decodes() {
        let analysis: AnalysisResult = serde_json::from_value(json!({
            "problem_type": null,
            "suitable_approaches": [],
            "data_characteristics": {"total_rows": 10, "total_columns": 2,
                                      "numerical_columns": 2, "categorical_columns": 0},
            "target_column": null
        }))
        .unwrap();
        assert_eq!(analysis.problem_type, None);
        assert!(!analysis.ai_enabled);
        assert_eq!(analysis.data_characteristics.total_rows, 10);
    }

    #[test]
    fn test_predictions_single_or_many() {
        let single: PredictionResult = serde_json::from_value(json!({"predictions": 3.5})).unwrap();
        assert_eq!(single.predictions.values(), vec![3.5]);
        let many: PredictionResult =
            serde_json::from_value(json!({"predictions": [1.0, 2.0]})).unwrap();
        assert_eq!(many.predictions, Predictions::Many(vec![1.0, 2.0]));
    }

    #[test]
    fn test_metric_columns_follow_backend_order() {
        let result = TrainingResult {
            model_id: "model_1".into(),
            model_type: "Regression".into(),
            status: "completed".into(),
            metrics: vec![serde_json::from_value(json!({"Model": "lr", "MAE": 0.4, "R2": 0.9})).unwrap()],
            target_column: "price".into(),
        };
        assert_eq!(result.metric_columns(), vec!["Model", "MAE", "R2"]);
        assert_eq!(result.problem_type(), Some(ProblemType::Regression));
        let bundle = ExportBundle::from_training(result);
        assert_eq!(bundle.suggested_file_name(), "model_1_results.json");
    }
}
