//! RASAN Test Utilities
//!
//! Shared test infrastructure for the RASAN workspace:
//! - A scripted mock gateway with a call log
//! - An artifact store whose writes can be switched to fail
//! - Proptest generators for entity types
//! - Test fixtures for common backend responses
//! - Custom assertions for pipeline errors

pub use rasan_storage::{ArtifactBatch, ArtifactStore, InMemoryArtifactStore, StoredArtifact};

pub use rasan_core::{
    AiStatus, AnalysisResult, ArtifactKey, ChartKind, ChartResult, DataCharacteristics,
    DatasetDescriptor, GatewayError, GatewayErrorKind, GatewayResult, HealthStatus, ModelInfo,
    PipelineError, PipelineResult, PlotFigure, PredictionInput, PredictionResult, Predictions,
    PreprocessRecord, ProblemType, Stage, StorageError, TrainingResponse, UploadFile,
    VisualizationResponse, VisualizationSet,
};
pub use rasan_gateway::{AnalyzeRequest, Gateway, PredictRequest, TrainRequest, VisualizeRequest};

use async_trait::async_trait;
use rasan_storage::StorageResult;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// ============================================================================
// MOCK GATEWAY
// ============================================================================

/// A call received by [`MockGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Upload { filename: String, bytes: usize },
    Preprocess { filename: String },
    Analyze(AnalyzeRequest),
    Train(TrainRequest),
    GetModel { model_id: String },
    Predict(PredictRequest),
    Visualize(VisualizeRequest),
    Health,
    AiStatus,
}

impl GatewayCall {
    pub fn endpoint(&self) -> &'static str {
        match self {
            GatewayCall::Upload { .. } => "upload",
            GatewayCall::Preprocess { .. } => "preprocess",
            GatewayCall::Analyze(_) => "analyze",
            GatewayCall::Train(_) => "train",
            GatewayCall::GetModel { .. } => "get_model",
            GatewayCall::Predict(_) => "predict",
            GatewayCall::Visualize(_) => "predict_and_visualize",
            GatewayCall::Health => "health",
            GatewayCall::AiStatus => "ai_status",
        }
    }
}

struct Scripted<T> {
    result: GatewayResult<T>,
    delay: Duration,
}

#[derive(Default)]
struct Script {
    upload: VecDeque<Scripted<DatasetDescriptor>>,
    preprocess: VecDeque<Scripted<PreprocessRecord>>,
    analyze: VecDeque<Scripted<AnalysisResult>>,
    train: VecDeque<Scripted<TrainingResponse>>,
    get_model: VecDeque<Scripted<ModelInfo>>,
    predict: VecDeque<Scripted<PredictionResult>>,
    visualize: VecDeque<Scripted<VisualizationResponse>>,
    health: VecDeque<Scripted<HealthStatus>>,
    ai_status: VecDeque<Scripted<AiStatus>>,
    calls: Vec<GatewayCall>,
}

/// Gateway that answers from per-endpoint queues of scripted results.
///
/// A call with nothing queued fails as a transport error, so a test that
/// forgets to script a response sees a failure rather than a hang.
#[derive(Default)]
pub struct MockGateway {
    script: Mutex<Script>,
}

macro_rules! scripted_endpoint {
    ($on:ident, $on_delayed:ident, $queue:ident, $ty:ty) => {
        pub fn $on(&self, result: GatewayResult<$ty>) -> &Self {
            self.$on_delayed(Duration::ZERO, result)
        }

        pub fn $on_delayed(&self, delay: Duration, result: GatewayResult<$ty>) -> &Self {
            self.script().$queue.push_back(Scripted { result, delay });
            self
        }
    };
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    scripted_endpoint!(on_upload, on_upload_delayed, upload, DatasetDescriptor);
    scripted_endpoint!(on_preprocess, on_preprocess_delayed, preprocess, PreprocessRecord);
    scripted_endpoint!(on_analyze, on_analyze_delayed, analyze, AnalysisResult);
    scripted_endpoint!(on_train, on_train_delayed, train, TrainingResponse);
    scripted_endpoint!(on_get_model, on_get_model_delayed, get_model, ModelInfo);
    scripted_endpoint!(on_predict, on_predict_delayed, predict, PredictionResult);
    scripted_endpoint!(on_visualize, on_visualize_delayed, visualize, VisualizationResponse);
    scripted_endpoint!(on_health, on_health_delayed, health, HealthStatus);
    scripted_endpoint!(on_ai_status, on_ai_status_delayed, ai_status, AiStatus);

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.script().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script().calls.len()
    }

    /// Number of calls received by one endpoint (see [`GatewayCall::endpoint`]).
    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    fn take<T>(
        &self,
        call: GatewayCall,
        pick: impl FnOnce(&mut Script) -> Option<Scripted<T>>,
    ) -> (&'static str, Option<Scripted<T>>) {
        let mut script = self.script();
        let endpoint = call.endpoint();
        script.calls.push(call);
        (endpoint, pick(&mut script))
    }
}

async fn resolve<T>((endpoint, next): (&'static str, Option<Scripted<T>>)) -> GatewayResult<T> {
    match next {
        Some(scripted) => {
            if !scripted.delay.is_zero() {
                tokio::time::sleep(scripted.delay).await;
            }
            scripted.result
        }
        None => Err(GatewayError::transport(format!(
            "no scripted response for {}",
            endpoint
        ))),
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn upload(&self, file: &UploadFile) -> GatewayResult<DatasetDescriptor> {
        let call = GatewayCall::Upload {
            filename: file.filename.clone(),
            bytes: file.bytes.len(),
        };
        resolve(self.take(call, |s| s.upload.pop_front())).await
    }

    async fn preprocess(&self, filename: &str) -> GatewayResult<PreprocessRecord> {
        let call = GatewayCall::Preprocess {
            filename: filename.to_string(),
        };
        resolve(self.take(call, |s| s.preprocess.pop_front())).await
    }

    async fn analyze(&self, request: &AnalyzeRequest) -> GatewayResult<AnalysisResult> {
        resolve(self.take(GatewayCall::Analyze(request.clone()), |s| s.analyze.pop_front())).await
    }

    async fn train(&self, request: &TrainRequest) -> GatewayResult<TrainingResponse> {
        resolve(self.take(GatewayCall::Train(request.clone()), |s| s.train.pop_front())).await
    }

    async fn get_model(&self, model_id: &str) -> GatewayResult<ModelInfo> {
        let call = GatewayCall::GetModel {
            model_id: model_id.to_string(),
        };
        resolve(self.take(call, |s| s.get_model.pop_front())).await
    }

    async fn predict(&self, request: &PredictRequest) -> GatewayResult<PredictionResult> {
        resolve(self.take(GatewayCall::Predict(request.clone()), |s| s.predict.pop_front())).await
    }

    async fn predict_and_visualize(
        &self,
        request: &VisualizeRequest,
    ) -> GatewayResult<VisualizationResponse> {
        resolve(self.take(GatewayCall::Visualize(request.clone()), |s| {
            s.visualize.pop_front()
        }))
        .await
    }

    async fn health(&self) -> GatewayResult<HealthStatus> {
        resolve(self.take(GatewayCall::Health, |s| s.health.pop_front())).await
    }

    async fn ai_status(&self) -> GatewayResult<AiStatus> {
        resolve(self.take(GatewayCall::AiStatus, |s| s.ai_status.pop_front())).await
    }
}

// ============================================================================
// FAILING STORE
// ============================================================================

/// In-memory store whose writes fail with an IO error while switched on.
///
/// Reads always succeed, so a test can inspect exactly what a failed
/// operation left behind.
#[derive(Debug, Default)]
pub struct FailingArtifactStore {
    inner: InMemoryArtifactStore,
    fail_writes: AtomicBool,
}

impl FailingArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, op: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                path: "failing-store".to_string(),
                reason: format!("{} refused: no space left on device", op),
            });
        }
        Ok(())
    }
}

impl ArtifactStore for FailingArtifactStore {
    fn get_raw(&self, key: ArtifactKey) -> StorageResult<Option<StoredArtifact>> {
        self.inner.get_raw(key)
    }

    fn put_raw(&self, key: ArtifactKey, record: Value) -> StorageResult<()> {
        self.check("put")?;
        self.inner.put_raw(key, record)
    }

    fn remove(&self, key: ArtifactKey) -> StorageResult<bool> {
        self.check("remove")?;
        self.inner.remove(key)
    }

    fn apply(&self, batch: ArtifactBatch) -> StorageResult<()> {
        self.check("batch")?;
        self.inner.apply(batch)
    }

    fn clear(&self) -> StorageResult<()> {
        self.check("clear")?;
        self.inner.clear()
    }

    fn keys(&self) -> StorageResult<Vec<ArtifactKey>> {
        self.inner.keys()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for RASAN entity types.

    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    /// A column name such as `sq_ft` or `price2`.
    pub fn arb_column_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,11}"
    }

    /// Unique, ordered column names.
    pub fn arb_column_names() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set(arb_column_name(), 1..20)
            .prop_map(|set| set.into_iter().collect())
    }

    /// Column names plus a target drawn from them.
    pub fn arb_columns_with_target() -> impl Strategy<Value = (Vec<String>, String)> {
        arb_column_names().prop_flat_map(|columns| {
            let len = columns.len();
            (Just(columns), 0..len).prop_map(|(columns, idx)| {
                let target = columns[idx].clone();
                (columns, target)
            })
        })
    }

    pub fn arb_problem_type() -> impl Strategy<Value = ProblemType> {
        prop_oneof![
            Just(ProblemType::Regression),
            Just(ProblemType::BinaryClassification),
            Just(ProblemType::MulticlassClassification),
        ]
    }

    pub fn arb_chart_kind() -> impl Strategy<Value = ChartKind> {
        prop_oneof![
            4 => prop::sample::select(ChartKind::known().to_vec()),
            1 => "[a-z]{3,10}_plot".prop_map(ChartKind::Other),
        ]
    }

    /// A raw backend error payload in any of the shapes the backend sends.
    pub fn arb_error_payload() -> impl Strategy<Value = Value> {
        let field_error = ("[a-z_]{1,8}", "[a-z ]{1,20}")
            .prop_map(|(loc, msg)| json!({"loc": ["body", loc], "msg": msg, "type": "value_error"}));
        prop_oneof![
            prop::collection::vec(field_error, 1..4).prop_map(Value::Array),
            "[A-Za-z ]{1,30}".prop_map(Value::String),
            "[A-Za-z ]{1,30}".prop_map(|m| json!({"message": m})),
            "[A-Za-z ]{1,30}".prop_map(|m| json!({"error": m})),
            any::<i64>().prop_map(|n| json!({"code": n})),
        ]
    }

    /// A visualization set mixing figures and error markers.
    pub fn arb_visualization_set() -> impl Strategy<Value = VisualizationSet> {
        prop::collection::btree_map(arb_chart_kind(), any::<bool>(), 0..8).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(kind, ok)| {
                    let value = if ok {
                        fixtures::figure(kind.as_str())
                    } else {
                        json!({"error": format!("{} failed", kind)})
                    };
                    (kind, ChartResult::from(value))
                })
                .collect()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built backend responses for common scenarios.

    use super::*;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    /// Descriptor for a small housing dataset: area, rooms, age, price.
    pub fn houses_dataset() -> DatasetDescriptor {
        dataset("houses.csv", &["area", "rooms", "age", "price"])
    }

    pub fn dataset(filename: &str, columns: &[&str]) -> DatasetDescriptor {
        DatasetDescriptor {
            filename: filename.to_string(),
            row_count: 120,
            column_count: columns.len() as u64,
            column_names: columns.iter().map(|c| c.to_string()).collect(),
            memory_usage_bytes: 4096,
            dtypes: columns
                .iter()
                .map(|c| (c.to_string(), "float64".to_string()))
                .collect(),
            file_path: Some(format!("./data/{}", filename)),
        }
    }

    pub fn csv_upload(filename: &str) -> UploadFile {
        UploadFile::new(
            filename,
            Some("text/csv".to_string()),
            b"area,rooms,age,price\n100,3,10,250000\n".to_vec(),
        )
    }

    /// Preprocess record whose path ends in `<stem>_preprocessed.csv`.
    pub fn preprocess_record(filename: &str) -> PreprocessRecord {
        let stem = filename.trim_end_matches(".csv");
        PreprocessRecord {
            preprocessed_path: format!("./data/{}_preprocessed.csv", stem),
            original_shape: Some((120, 4)),
            preprocessed_shape: Some((118, 4)),
            missing_values: BTreeMap::new(),
            duplicate_rows: 2,
            numerical_columns: vec![],
            categorical_columns: vec![],
            preprocessing_applied: vec!["Removed 2 duplicate rows".to_string()],
        }
    }

    pub fn analysis(target: Option<&str>, problem_type: Option<ProblemType>) -> AnalysisResult {
        AnalysisResult {
            problem_type,
            target_column: target.map(str::to_string),
            suitable_approaches: vec!["Random Forest".to_string()],
            data_characteristics: DataCharacteristics {
                total_rows: 120,
                total_columns: 4,
                numerical_columns: 4,
                categorical_columns: 0,
                missing_values: Some(0),
            },
            recommended_visualizations: vec![],
            ai_insights: None,
            ai_enabled: false,
        }
    }

    pub fn training_response(model_id: &str, model_type: ProblemType) -> TrainingResponse {
        TrainingResponse {
            model_id: Some(model_id.to_string()),
            model_type: Some(model_type.as_wire_str().to_string()),
            status: "completed".to_string(),
            metrics: vec![serde_json::from_value(
                json!({"Model": "Random Forest", "MAE": 0.41, "R2": 0.87}),
            )
            .unwrap_or_default()],
            error: None,
        }
    }

    pub fn model_loaded(model_id: &str) -> ModelInfo {
        ModelInfo {
            model_id: Some(model_id.to_string()),
            status: "loaded".to_string(),
            extra: Default::default(),
        }
    }

    /// A minimal Plotly-style figure.
    pub fn figure(title: &str) -> Value {
        json!({
            "data": [{"type": "bar", "x": [1, 2], "y": [3, 4]}],
            "layout": {"title": {"text": title}}
        })
    }

    /// Visualization response from `(chart key, raw entry)` pairs.
    pub fn visualization_response(model_id: &str, entries: Vec<(&str, Value)>) -> VisualizationResponse {
        VisualizationResponse {
            model_id: Some(model_id.to_string()),
            problem_type: Some("Regression".to_string()),
            visualizations: entries
                .into_iter()
                .map(|(kind, value)| (ChartKind::from(kind), ChartResult::from(value)))
                .collect(),
            predictions: None,
        }
    }

    pub fn validation_error(loc: &[&str], msg: &str) -> GatewayError {
        GatewayError::from_payload(422, json!([{"loc": loc, "msg": msg, "type": "value_error"}]))
    }

    pub fn backend_error(status: u16, detail: &str) -> GatewayError {
        GatewayError::from_payload(status, json!(detail))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for pipeline results.

    use super::*;

    /// Assert that a result is a MissingPrerequisite redirecting to `redirect`.
    #[track_caller]
    pub fn assert_missing_prerequisite<T: std::fmt::Debug>(
        result: &PipelineResult<T>,
        redirect: Stage,
    ) {
        match result {
            Err(PipelineError::MissingPrerequisite { redirect_to, .. }) => {
                assert_eq!(*redirect_to, redirect, "Wrong redirect target");
            }
            other => panic!("Expected MissingPrerequisite, got: {:?}", other),
        }
    }

    /// Assert that a result is an InvalidInput error for `field`.
    #[track_caller]
    pub fn assert_invalid_input<T: std::fmt::Debug>(result: &PipelineResult<T>, field: &str) {
        match result {
            Err(PipelineError::InvalidInput { field: f, .. }) => {
                assert_eq!(f, field, "Wrong field in InvalidInput");
            }
            other => panic!("Expected InvalidInput for {}, got: {:?}", field, other),
        }
    }

    /// Assert that a result is a gateway error of `kind`.
    #[track_caller]
    pub fn assert_gateway_error<T: std::fmt::Debug>(
        result: &PipelineResult<T>,
        kind: GatewayErrorKind,
    ) {
        match result {
            Err(PipelineError::Gateway(err)) => assert_eq!(err.kind, kind, "Wrong gateway error kind"),
            other => panic!("Expected Gateway error, got: {:?}", other),
        }
    }
}
