//! Enum types for pipeline stages, artifacts, problem types and chart kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PIPELINE STAGES
// ============================================================================

/// A navigable pipeline step. Order matters: earlier stages produce the
/// artifacts later stages consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Preprocess,
    Analyze,
    Train,
    /// Predict and visualize.
    Results,
}

impl Stage {
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Upload,
            Stage::Preprocess,
            Stage::Analyze,
            Stage::Train,
            Stage::Results,
        ]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Upload => "Upload",
            Stage::Preprocess => "Preprocess",
            Stage::Analyze => "Analyze",
            Stage::Train => "Train",
            Stage::Results => "Results",
        }
    }

    /// Artifacts that must exist in the store before this stage may be entered.
    ///
    /// Preprocessing is best-effort, so no stage requires `PreprocessedData`.
    /// Analysis is optional input to training, so only the uploaded dataset
    /// gates Analyze and Train.
    pub fn prerequisites(&self) -> &'static [ArtifactKey] {
        match self {
            Stage::Upload => &[],
            Stage::Preprocess | Stage::Analyze | Stage::Train => &[ArtifactKey::UploadedFile],
            Stage::Results => &[ArtifactKey::UploadedFile, ArtifactKey::TrainingResult],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// What the controller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Uploading,
    Preprocessing,
    Analyzing,
    Training,
    Visualizing,
    Predicting,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PipelineState::Idle => "idle",
            PipelineState::Uploading => "uploading",
            PipelineState::Preprocessing => "preprocessing",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Training => "training",
            PipelineState::Visualizing => "visualizing",
            PipelineState::Predicting => "predicting",
        };
        f.write_str(value)
    }
}

// ============================================================================
// ARTIFACT KEYS
// ============================================================================

/// Logical key of a persisted stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactKey {
    #[serde(rename = "uploadedFile")]
    UploadedFile,
    #[serde(rename = "preprocessedData")]
    PreprocessedData,
    #[serde(rename = "analysisResult")]
    AnalysisResult,
    #[serde(rename = "trainingResult")]
    TrainingResult,
    #[serde(rename = "visualizations")]
    Visualizations,
    #[serde(rename = "predictionResult")]
    PredictionResult,
}

impl ArtifactKey {
    pub fn all() -> &'static [ArtifactKey] {
        &[
            ArtifactKey::UploadedFile,
            ArtifactKey::PreprocessedData,
            ArtifactKey::AnalysisResult,
            ArtifactKey::TrainingResult,
            ArtifactKey::Visualizations,
            ArtifactKey::PredictionResult,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKey::UploadedFile => "uploadedFile",
            ArtifactKey::PreprocessedData => "preprocessedData",
            ArtifactKey::AnalysisResult => "analysisResult",
            ArtifactKey::TrainingResult => "trainingResult",
            ArtifactKey::Visualizations => "visualizations",
            ArtifactKey::PredictionResult => "predictionResult",
        }
    }

    /// The stage whose successful run writes this artifact.
    pub fn producer(&self) -> Stage {
        match self {
            ArtifactKey::UploadedFile => Stage::Upload,
            ArtifactKey::PreprocessedData => Stage::Preprocess,
            ArtifactKey::AnalysisResult => Stage::Analyze,
            ArtifactKey::TrainingResult => Stage::Train,
            ArtifactKey::Visualizations | ArtifactKey::PredictionResult => Stage::Results,
        }
    }

    /// Artifacts derived from the uploaded dataset that a re-upload may invalidate.
    pub fn downstream_of_upload() -> &'static [ArtifactKey] {
        &[
            ArtifactKey::AnalysisResult,
            ArtifactKey::TrainingResult,
            ArtifactKey::Visualizations,
            ArtifactKey::PredictionResult,
        ]
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtifactKey::all()
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("Invalid artifact key: {}", s))
    }
}

// ============================================================================
// PROBLEM TYPE
// ============================================================================

/// Kind of supervised learning problem, using the backend's wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProblemType {
    #[default]
    #[serde(rename = "Regression")]
    Regression,
    #[serde(rename = "Binary Classification")]
    BinaryClassification,
    #[serde(rename = "Multi-class Classification")]
    MulticlassClassification,
}

impl ProblemType {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            ProblemType::Regression => "Regression",
            ProblemType::BinaryClassification => "Binary Classification",
            ProblemType::MulticlassClassification => "Multi-class Classification",
        }
    }

    pub fn is_classification(&self) -> bool {
        !matches!(self, ProblemType::Regression)
    }

    /// Charts the backend renders for this problem type when none are requested.
    /// The ROC curve is added by the backend only when probabilities exist.
    pub fn default_charts(&self) -> Vec<ChartKind> {
        match self {
            ProblemType::Regression => vec![
                ChartKind::FeatureImportance,
                ChartKind::PredictionDistribution,
                ChartKind::RegressionMetrics,
                ChartKind::CorrelationHeatmap,
            ],
            ProblemType::BinaryClassification | ProblemType::MulticlassClassification => vec![
                ChartKind::FeatureImportance,
                ChartKind::ConfusionMatrix,
                ChartKind::ClassificationMetrics,
                ChartKind::PredictionDistribution,
            ],
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

impl FromStr for ProblemType {
    type Err = String;

    /// Accepts wire labels as well as short forms (`binary`, `multiclass`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "regression" => Ok(ProblemType::Regression),
            "binary" | "binaryclassification" => Ok(ProblemType::BinaryClassification),
            "multiclass" | "multiclassclassification" => {
                Ok(ProblemType::MulticlassClassification)
            }
            _ => Err(format!("Invalid problem type: {}", s)),
        }
    }
}

// ============================================================================
// CHART KINDS
// ============================================================================

/// Category of visualization. Unknown backend keys are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartKind {
    FeatureImportance,
    CorrelationHeatmap,
    ConfusionMatrix,
    RocCurve,
    ClassificationMetrics,
    RegressionMetrics,
    PredictionDistribution,
    Other(String),
}

impl ChartKind {
    pub fn known() -> &'static [ChartKind] {
        &[
            ChartKind::FeatureImportance,
            ChartKind::CorrelationHeatmap,
            ChartKind::ConfusionMatrix,
            ChartKind::RocCurve,
            ChartKind::ClassificationMetrics,
            ChartKind::RegressionMetrics,
            ChartKind::PredictionDistribution,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChartKind::FeatureImportance => "feature_importance",
            ChartKind::CorrelationHeatmap => "correlation_heatmap",
            ChartKind::ConfusionMatrix => "confusion_matrix",
            ChartKind::RocCurve => "roc_curve",
            ChartKind::ClassificationMetrics => "classification_metrics",
            ChartKind::RegressionMetrics => "regression_metrics",
            ChartKind::PredictionDistribution => "prediction_distribution",
            ChartKind::Other(name) => name.as_str(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            ChartKind::FeatureImportance => "Feature Importance".to_string(),
            ChartKind::CorrelationHeatmap => "Correlation Heatmap".to_string(),
            ChartKind::ConfusionMatrix => "Confusion Matrix".to_string(),
            ChartKind::RocCurve => "ROC Curve".to_string(),
            ChartKind::ClassificationMetrics => "Classification Metrics".to_string(),
            ChartKind::RegressionMetrics => "Regression Metrics".to_string(),
            ChartKind::PredictionDistribution => "Prediction Distribution".to_string(),
            ChartKind::Other(name) => name.replace('_', " "),
        }
    }
}

impl From<String> for ChartKind {
    fn from(value: String) -> Self {
        ChartKind::known()
            .iter()
            .find(|kind| kind.as_str() == value)
            .cloned()
            .unwrap_or(ChartKind::Other(value))
    }
}

impl From<&str> for ChartKind {
    fn from(value: &str) -> Self {
        ChartKind::from(value.to_string())
    }
}

impl From<ChartKind> for String {
    fn from(value: ChartKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
