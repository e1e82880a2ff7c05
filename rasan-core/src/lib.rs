//! RASAN Core - Entity Types and Pure Pipeline Logic
//!
//! Data structures shared by every other crate, the error taxonomy, and the
//! two pure functions the controller relies on at the Results stage: the
//! visualization normalizer and the prediction input synthesizer.
//! No I/O happens in this crate.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod normalize;
pub mod synth;

pub use config::{InvalidationPolicy, PipelineConfig, ReadinessConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use entities::{
    AiStatus, AnalysisResult, ChartResult, DataCharacteristics, DatasetDescriptor, ErrorMarker,
    ExportBundle, HealthStatus, MetricRow, ModelInfo, PlotFigure, PredictionInput,
    PredictionResult, PredictionSample, Predictions, PreprocessRecord, StageArtifact,
    TrainingResponse, TrainingResult, UploadFile, VisualizationResponse, VisualizationSet,
};
pub use enums::{ArtifactKey, ChartKind, PipelineState, ProblemType, Stage};
pub use error::{
    ConfigError, FailureCategory, GatewayError, GatewayErrorKind, GatewayResult, PipelineError,
    PipelineResult, StorageError,
};
pub use normalize::{
    extract_error_message, normalize_visualizations, NormalizedVisualizations,
    VisualizationDiagnostic,
};
pub use synth::{
    input_fingerprint, parse_input_value, synthesize_prediction_input, PredictionInputState,
};
