//! Stage controller.
//!
//! Sequences the pipeline stages, checks preconditions, calls the gateway and
//! commits each stage's artifact to the session store. Every public operation
//! returns a `PipelineResult` and also leaves a [`StatusReport`] behind, so a
//! failed stage is visible as status text without crashing the caller.

use crate::readiness::wait_for_model;
use crate::session::{Session, StageArtifacts, StageReadiness};
use crate::status::{ReportAction, ReportLevel, StatusReport};
use crate::tokens::{RequestToken, RequestTokens};
use rasan_core::{
    normalize_visualizations, parse_input_value, AiStatus, AnalysisResult, ArtifactKey, ChartKind,
    DatasetDescriptor, ExportBundle, FailureCategory, GatewayError, GatewayResult, HealthStatus,
    InvalidationPolicy, ModelInfo, NormalizedVisualizations, PipelineConfig, PipelineError,
    PipelineResult, PipelineState, PredictionInput, PredictionInputState, PredictionResult,
    PredictionSample, PreprocessRecord, ProblemType, Stage, StageArtifact, StorageError,
    TrainingResult, UploadFile, VisualizationDiagnostic, VisualizationSet,
};
use rasan_gateway::{AnalyzeRequest, Gateway, PredictRequest, TrainRequest, VisualizeRequest};
use rasan_storage::{ArtifactBatch, ArtifactStore, ArtifactStoreExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Training status the backend reports for a usable model.
const TRAINING_COMPLETED: &str = "completed";

/// Status reports kept in memory; older ones are dropped first.
pub const MAX_REPORTS: usize = 256;

// ============================================================================
// OPERATION TYPES
// ============================================================================

/// Result of an upload. Preprocessing is chained automatically and its
/// failure does not undo the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub dataset: DatasetDescriptor,
    pub preprocess: PipelineResult<PreprocessRecord>,
}

/// Training parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub target_column: String,
    pub problem_type: ProblemType,
    pub model_name: Option<String>,
    /// Restrict training to these columns. `None` uses every non-target column.
    pub features: Option<Vec<String>>,
}

impl TrainOptions {
    pub fn new(target_column: impl Into<String>, problem_type: ProblemType) -> Self {
        Self {
            target_column: target_column.into(),
            problem_type,
            model_name: None,
            features: None,
        }
    }
}

/// Values the Train stage is seeded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainDefaults {
    pub target_column: Option<String>,
    pub problem_type: ProblemType,
}

/// Result of training followed by the first visualization.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    pub training: TrainingResult,
    pub visualization: PipelineResult<VisualizationReport>,
}

/// Inputs of a predict-and-visualize call. Missing pieces fail fast.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualizeParams {
    pub model_id: String,
    pub filename: Option<String>,
    pub target_column: Option<String>,
    pub chart_types: Vec<ChartKind>,
}

/// A committed visualization set and its normalized view.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationReport {
    pub model_id: String,
    pub problem_type: Option<String>,
    pub set: VisualizationSet,
    pub normalized: NormalizedVisualizations,
    pub predictions: Option<PredictionSample>,
}

impl VisualizationReport {
    /// `PartialVisualizationFailure` when any chart failed.
    pub fn category(&self) -> Option<FailureCategory> {
        self.normalized
            .diagnostic
            .as_ref()
            .map(|_| FailureCategory::PartialVisualizationFailure)
    }
}

/// Backend probes.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendStatus {
    pub health: GatewayResult<HealthStatus>,
    pub ai: GatewayResult<AiStatus>,
}

// ============================================================================
// CONTROLLER
// ============================================================================

#[derive(Debug)]
struct ControllerState {
    state: PipelineState,
    in_flight: usize,
    tokens: RequestTokens,
    input: Option<PredictionInputState>,
    reports: VecDeque<StatusReport>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            state: PipelineState::Idle,
            in_flight: 0,
            tokens: RequestTokens::new(),
            input: None,
            reports: VecDeque::new(),
        }
    }
}

impl ControllerState {
    fn report(&mut self, report: StatusReport) {
        if self.reports.len() == MAX_REPORTS {
            self.reports.pop_front();
        }
        self.reports.push_back(report);
    }
}

/// Marks an operation as in flight; returns the controller to `Idle` when
/// the last one finishes.
struct Activity<'a> {
    controller: &'a StageController,
}

impl Drop for Activity<'_> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.controller.inner.lock() {
            inner.in_flight = inner.in_flight.saturating_sub(1);
            if inner.in_flight == 0 {
                inner.state = PipelineState::Idle;
            }
        }
    }
}

fn required<T>(value: Option<T>, stage: Stage, key: ArtifactKey) -> PipelineResult<T> {
    value.ok_or(PipelineError::MissingPrerequisite {
        stage,
        missing: key,
        redirect_to: key.producer(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Orchestrates the pipeline stages over one session.
pub struct StageController {
    gateway: Arc<dyn Gateway>,
    session: Session,
    config: PipelineConfig,
    inner: Mutex<ControllerState>,
}

impl StageController {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn ArtifactStore>,
        config: PipelineConfig,
    ) -> Self {
        let session = Session::new(store);
        tracing::debug!(session_id = %session.id(), "Created stage controller");
        Self {
            gateway,
            session,
            config,
            inner: Mutex::new(ControllerState::default()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(PipelineState::Idle)
    }

    /// The latest [`MAX_REPORTS`] reports since creation or the last reset,
    /// oldest first.
    pub fn reports(&self) -> Vec<StatusReport> {
        self.inner
            .lock()
            .map(|inner| inner.reports.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last_report(&self) -> Option<StatusReport> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.reports.back().cloned())
    }

    // ------------------------------------------------------------------------
    // Internal plumbing
    // ------------------------------------------------------------------------

    fn lock(&self) -> PipelineResult<MutexGuard<'_, ControllerState>> {
        self.inner
            .lock()
            .map_err(|_| PipelineError::Storage(StorageError::LockPoisoned))
    }

    fn begin(&self, state: PipelineState) -> PipelineResult<Activity<'_>> {
        let mut inner = self.lock()?;
        inner.state = state;
        inner.in_flight += 1;
        Ok(Activity { controller: self })
    }

    fn issue(&self, key: ArtifactKey) -> PipelineResult<RequestToken> {
        Ok(self.lock()?.tokens.issue(key))
    }

    fn push_report(&self, report: StatusReport) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.report(report);
        }
    }

    /// Run `apply` under the controller lock if `token` is still current.
    fn commit_with(
        &self,
        token: RequestToken,
        apply: impl FnOnce(&dyn ArtifactStore, &mut ControllerState) -> PipelineResult<()>,
    ) -> PipelineResult<()> {
        let mut inner = self.lock()?;
        if !inner.tokens.is_current(&token) {
            tracing::debug!(key = %token.key, seq = token.seq, "Discarding superseded response");
            return Err(PipelineError::Stale { key: token.key });
        }
        apply(self.session.store(), &mut inner)
    }

    /// A failure answering a superseded request is as stale as a success.
    fn settle<T>(&self, token: &RequestToken, response: GatewayResult<T>) -> PipelineResult<T> {
        match response {
            Ok(value) => Ok(value),
            Err(_) if !self.lock()?.tokens.is_current(token) => {
                Err(PipelineError::Stale { key: token.key })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn commit<T: StageArtifact>(&self, token: RequestToken, artifact: &T) -> PipelineResult<()> {
        self.commit_with(token, |store, _| Ok(store.put(artifact)?))
    }

    /// Turn a failure into a status report and hand the result back.
    fn record<T>(&self, stage: Stage, result: PipelineResult<T>) -> PipelineResult<T> {
        if let Err(e) = &result {
            match e {
                PipelineError::Stale { key } => {
                    tracing::debug!(stage = %stage, key = %key, "Superseded response dropped");
                }
                PipelineError::MissingPrerequisite { .. } => {
                    tracing::info!(stage = %stage, error = %e, "Prerequisite missing");
                    self.push_report(StatusReport::from_error(stage, e));
                }
                _ => {
                    tracing::warn!(stage = %stage, category = ?e.category(), error = %e, "Stage operation failed");
                    self.push_report(StatusReport::from_error(stage, e));
                }
            }
        }
        result
    }

    // ------------------------------------------------------------------------
    // Preconditions
    // ------------------------------------------------------------------------

    /// Check whether `stage` may be entered and load its artifacts.
    pub fn enter_stage(&self, stage: Stage) -> PipelineResult<StageReadiness> {
        let readiness = self.session.check(stage)?;
        if let StageReadiness::MissingPrerequisite {
            missing,
            redirect_to,
            ..
        } = &readiness
        {
            tracing::info!(stage = %stage, missing = %missing, redirect_to = %redirect_to, "Redirecting");
            self.push_report(
                StatusReport::new(
                    stage,
                    ReportLevel::Info,
                    format!("{} requires {}", stage, missing),
                )
                .with_action(ReportAction::Redirect(*redirect_to)),
            );
        }
        Ok(readiness)
    }

    fn require(&self, stage: Stage) -> PipelineResult<StageArtifacts> {
        self.session.check(stage)?.into_result()
    }

    // ------------------------------------------------------------------------
    // Upload and preprocess
    // ------------------------------------------------------------------------

    /// Exactly one file must be selected.
    pub fn select_upload(&self, mut files: Vec<UploadFile>) -> PipelineResult<UploadFile> {
        let result = match files.len() {
            1 => Ok(files.remove(0)),
            0 => Err(PipelineError::invalid("file", "no file selected")),
            n => Err(PipelineError::invalid(
                "file",
                format!("exactly one file may be uploaded, got {}", n),
            )),
        };
        self.record(Stage::Upload, result)
    }

    fn validate_upload(&self, file: &UploadFile) -> PipelineResult<()> {
        if file.filename.trim().is_empty() {
            return Err(PipelineError::invalid("file", "file name is empty"));
        }
        if !file.is_csv() {
            return Err(PipelineError::invalid("file", "only CSV files are supported"));
        }
        if file.bytes.is_empty() {
            return Err(PipelineError::invalid("file", "file is empty"));
        }
        if file.size() > self.config.max_upload_bytes {
            return Err(PipelineError::invalid(
                "file",
                format!(
                    "file is {} bytes, the limit is {} bytes",
                    file.size(),
                    self.config.max_upload_bytes
                ),
            ));
        }
        Ok(())
    }

    /// Upload `file`, then preprocess it.
    ///
    /// A successful upload always replaces `uploadedFile` and removes
    /// `preprocessedData`. Analysis and training results are removed only
    /// under [`InvalidationPolicy::ClearDownstream`].
    pub async fn run_upload(&self, file: UploadFile) -> PipelineResult<UploadOutcome> {
        let result = self.upload(file).await;
        self.record(Stage::Upload, result)
    }

    async fn upload(&self, file: UploadFile) -> PipelineResult<UploadOutcome> {
        self.validate_upload(&file)?;
        let token = self.issue(ArtifactKey::UploadedFile)?;

        let dataset = {
            let _activity = self.begin(PipelineState::Uploading)?;
            let response = self.gateway.upload(&file).await;
            self.settle(&token, response)?
        };

        let policy = self.config.invalidation;
        let mut batch = ArtifactBatch::new()
            .put(&dataset)?
            .remove(ArtifactKey::PreprocessedData);
        if policy == InvalidationPolicy::ClearDownstream {
            for key in ArtifactKey::downstream_of_upload() {
                batch = batch.remove(*key);
            }
        }
        self.commit_with(token, |store, inner| {
            let cleared = batch.keys();
            store.apply(batch)?;
            for key in cleared.into_iter().filter(|key| *key != ArtifactKey::UploadedFile) {
                inner.tokens.invalidate(key);
            }
            if policy == InvalidationPolicy::ClearDownstream {
                inner.input = None;
            }
            inner.report(StatusReport::success(
                Stage::Upload,
                format!(
                    "Uploaded {}: {} rows, {} columns",
                    dataset.filename, dataset.row_count, dataset.column_count
                ),
            ));
            Ok(())
        })?;
        tracing::info!(
            filename = %dataset.filename,
            rows = dataset.row_count,
            columns = dataset.column_count,
            policy = ?policy,
            "Dataset uploaded"
        );

        let duplicates = dataset.duplicate_columns();
        if !duplicates.is_empty() {
            tracing::warn!(duplicates = ?duplicates, "Dataset has duplicate column names");
            self.push_report(StatusReport::warning(
                Stage::Upload,
                format!("Duplicate column names: {}", duplicates.join(", ")),
            ));
        }

        let preprocess = self.preprocess(&dataset.filename).await;
        let preprocess = self.record(Stage::Preprocess, preprocess);
        Ok(UploadOutcome {
            dataset,
            preprocess,
        })
    }

    /// Preprocess the uploaded dataset again.
    pub async fn run_preprocess(&self) -> PipelineResult<PreprocessRecord> {
        let result = async {
            let artifacts = self.require(Stage::Preprocess)?;
            let dataset = required(artifacts.dataset, Stage::Preprocess, ArtifactKey::UploadedFile)?;
            self.preprocess(&dataset.filename).await
        }
        .await;
        self.record(Stage::Preprocess, result)
    }

    async fn preprocess(&self, filename: &str) -> PipelineResult<PreprocessRecord> {
        let token = self.issue(ArtifactKey::PreprocessedData)?;
        let record = {
            let _activity = self.begin(PipelineState::Preprocessing)?;
            let response = self.gateway.preprocess(filename).await;
            self.settle(&token, response)?
        };
        self.commit(token, &record)?;
        tracing::info!(filename = %filename, path = %record.preprocessed_path, "Dataset preprocessed");
        self.push_report(StatusReport::success(
            Stage::Preprocess,
            format!(
                "Preprocessed {}: {} step(s) applied",
                filename,
                record.preprocessing_applied.len()
            ),
        ));
        Ok(record)
    }

    // ------------------------------------------------------------------------
    // Analyze
    // ------------------------------------------------------------------------

    /// Analyze the uploaded dataset. `None` or a blank target requests an
    /// un-targeted analysis.
    pub async fn run_analyze(&self, target_column: Option<&str>) -> PipelineResult<AnalysisResult> {
        let result = self.analyze(non_empty(target_column.map(str::to_string))).await;
        self.record(Stage::Analyze, result)
    }

    async fn analyze(&self, target: Option<String>) -> PipelineResult<AnalysisResult> {
        let artifacts = self.require(Stage::Analyze)?;
        let dataset = required(artifacts.dataset, Stage::Analyze, ArtifactKey::UploadedFile)?;
        if let Some(target) = &target {
            if !dataset.has_column(target) {
                return Err(PipelineError::invalid(
                    "target_column",
                    format!("'{}' is not a column of {}", target, dataset.filename),
                ));
            }
        }

        let token = self.issue(ArtifactKey::AnalysisResult)?;
        let request = AnalyzeRequest {
            filename: dataset.filename.clone(),
            target_column: target.clone(),
        };
        let mut analysis = {
            let _activity = self.begin(PipelineState::Analyzing)?;
            let response = self.gateway.analyze(&request).await;
            self.settle(&token, response)?
        };
        if analysis.target_column.is_none() {
            analysis.target_column = target;
        }

        self.commit(token, &analysis)?;
        tracing::info!(
            filename = %request.filename,
            problem_type = ?analysis.problem_type,
            "Dataset analyzed"
        );
        let message = match &analysis.problem_type {
            Some(problem_type) => format!("Analysis complete: {}", problem_type),
            None => "Analysis complete".to_string(),
        };
        self.push_report(StatusReport::success(Stage::Analyze, message));
        Ok(analysis)
    }

    // ------------------------------------------------------------------------
    // Train
    // ------------------------------------------------------------------------

    /// Target and problem type to pre-fill the Train stage with, taken from
    /// the stored analysis.
    pub fn train_defaults(&self) -> PipelineResult<TrainDefaults> {
        let artifacts = self.require(Stage::Train)?;
        let columns = artifacts.dataset.as_ref();
        let analysis = artifacts.analysis.as_ref();
        let target_column = analysis
            .and_then(|a| a.target_column.clone())
            .filter(|t| columns.is_some_and(|d| d.has_column(t)));
        Ok(TrainDefaults {
            target_column,
            problem_type: analysis.and_then(|a| a.problem_type).unwrap_or_default(),
        })
    }

    pub async fn run_train(
        &self,
        target_column: &str,
        problem_type: ProblemType,
    ) -> PipelineResult<TrainingResult> {
        self.run_train_with(TrainOptions::new(target_column, problem_type))
            .await
    }

    /// Train a model. An empty target is rejected before any backend call.
    pub async fn run_train_with(&self, options: TrainOptions) -> PipelineResult<TrainingResult> {
        let result = self.train(options).await;
        self.record(Stage::Train, result)
    }

    async fn train(&self, options: TrainOptions) -> PipelineResult<TrainingResult> {
        let target = options.target_column.trim().to_string();
        if target.is_empty() {
            return Err(PipelineError::invalid("target_column", "target column is required"));
        }

        let artifacts = self.require(Stage::Train)?;
        let filename = required(
            artifacts.working_filename(),
            Stage::Train,
            ArtifactKey::UploadedFile,
        )?;
        let dataset = required(artifacts.dataset, Stage::Train, ArtifactKey::UploadedFile)?;
        if !dataset.has_column(&target) {
            return Err(PipelineError::invalid(
                "target_column",
                format!("'{}' is not a column of {}", target, dataset.filename),
            ));
        }
        if let Some(features) = &options.features {
            if let Some(bad) = features
                .iter()
                .find(|f| f.as_str() == target || !dataset.has_column(f))
            {
                return Err(PipelineError::invalid(
                    "features",
                    format!("'{}' cannot be used as a feature", bad),
                ));
            }
        }

        let token = self.issue(ArtifactKey::TrainingResult)?;
        let request = TrainRequest {
            filename,
            target: target.clone(),
            problem_type: options.problem_type,
            model_name: options.model_name,
            features: options.features,
        };
        let response = {
            let _activity = self.begin(PipelineState::Training)?;
            let response = self.gateway.train(&request).await;
            self.settle(&token, response)?
        };

        if response.status != TRAINING_COMPLETED {
            return Err(GatewayError::in_band(
                200,
                response.error,
                &format!("training finished with status '{}'", response.status),
            )
            .into());
        }
        let model_id = response
            .model_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::decode(200, "training response has no model_id"))?;

        let training = TrainingResult {
            model_id,
            model_type: response
                .model_type
                .unwrap_or_else(|| options.problem_type.as_wire_str().to_string()),
            status: response.status,
            metrics: response.metrics,
            target_column: target,
        };

        let superseded = [ArtifactKey::Visualizations, ArtifactKey::PredictionResult];
        let batch = superseded
            .iter()
            .fold(ArtifactBatch::new().put(&training)?, |batch, key| {
                batch.remove(*key)
            });
        self.commit_with(token, |store, inner| {
            store.apply(batch)?;
            for key in superseded {
                inner.tokens.invalidate(key);
            }
            inner.report(StatusReport::success(
                Stage::Train,
                format!("Model {} trained ({})", training.model_id, training.model_type),
            ));
            Ok(())
        })?;
        tracing::info!(
            model_id = %training.model_id,
            target = %training.target_column,
            filename = %request.filename,
            "Model trained"
        );
        Ok(training)
    }

    /// Train, wait for the model to load, then render its default charts.
    pub async fn run_train_and_visualize(
        &self,
        options: TrainOptions,
        chart_types: Vec<ChartKind>,
    ) -> PipelineResult<TrainOutcome> {
        let training = self.run_train_with(options).await?;
        let visualization = async {
            self.await_model_ready(&training.model_id).await?;
            self.visualize_latest(chart_types).await
        }
        .await;
        Ok(TrainOutcome {
            training,
            visualization,
        })
    }

    /// Poll the backend until `model_id` is loaded.
    pub async fn await_model_ready(&self, model_id: &str) -> PipelineResult<ModelInfo> {
        let result = async {
            let _activity = self.begin(PipelineState::Visualizing)?;
            wait_for_model(self.gateway.as_ref(), model_id, &self.config.readiness).await
        }
        .await;
        self.record(Stage::Results, result)
    }

    // ------------------------------------------------------------------------
    // Results: visualize
    // ------------------------------------------------------------------------

    /// Predict on the dataset and render charts for `params.model_id`.
    pub async fn run_visualize(&self, params: VisualizeParams) -> PipelineResult<VisualizationReport> {
        let result = self.visualize(params).await;
        self.record(Stage::Results, result)
    }

    async fn visualize(&self, params: VisualizeParams) -> PipelineResult<VisualizationReport> {
        let filename = required(
            non_empty(params.filename),
            Stage::Results,
            ArtifactKey::UploadedFile,
        )?;
        let target_column = required(
            non_empty(params.target_column),
            Stage::Results,
            ArtifactKey::TrainingResult,
        )?;
        if params.model_id.trim().is_empty() {
            return Err(PipelineError::invalid("model_id", "model id is empty"));
        }

        let token = self.issue(ArtifactKey::Visualizations)?;
        let request = VisualizeRequest {
            model_id: params.model_id,
            filename,
            target_column,
            chart_types: params.chart_types,
        };
        let response = {
            let _activity = self.begin(PipelineState::Visualizing)?;
            let response = self.gateway.predict_and_visualize(&request).await;
            self.settle(&token, response)?
        };

        let normalized = normalize_visualizations(&response.visualizations);
        self.commit(token, &response.visualizations)?;

        let report = match &normalized.diagnostic {
            None => StatusReport::success(
                Stage::Results,
                format!("{} chart(s) rendered", normalized.valid.len()),
            ),
            Some(VisualizationDiagnostic::Partial { .. }) => StatusReport::warning(
                Stage::Results,
                normalized.summary().unwrap_or_default(),
            )
            .with_action(ReportAction::Regenerate),
            Some(VisualizationDiagnostic::AllFailed { .. }) => StatusReport::new(
                Stage::Results,
                ReportLevel::Error,
                normalized.summary().unwrap_or_default(),
            )
            .with_action(ReportAction::Regenerate),
        };
        tracing::info!(
            model_id = %request.model_id,
            valid = normalized.valid.len(),
            failed = normalized.failed.len(),
            "Visualizations received"
        );
        self.push_report(report);

        Ok(VisualizationReport {
            model_id: request.model_id,
            problem_type: response.problem_type,
            set: response.visualizations,
            normalized,
            predictions: response.predictions,
        })
    }

    /// Visualize the stored model against the working dataset.
    pub async fn visualize_latest(
        &self,
        chart_types: Vec<ChartKind>,
    ) -> PipelineResult<VisualizationReport> {
        let params = self.require(Stage::Results).and_then(|artifacts| {
            let filename = artifacts.working_filename();
            let training = required(artifacts.training, Stage::Results, ArtifactKey::TrainingResult)?;
            Ok(VisualizeParams {
                model_id: training.model_id,
                filename,
                target_column: Some(training.target_column),
                chart_types,
            })
        });
        match params {
            Ok(params) => self.run_visualize(params).await,
            Err(e) => self.record(Stage::Results, Err(e)),
        }
    }

    /// Request the charts again after a partial or total failure.
    pub async fn regenerate(&self) -> PipelineResult<VisualizationReport> {
        self.visualize_latest(Vec::new()).await
    }

    /// Normalized view of the stored visualization set, if any.
    pub fn stored_visualizations(&self) -> PipelineResult<Option<NormalizedVisualizations>> {
        Ok(self
            .session
            .visualizations()?
            .map(|set| normalize_visualizations(&set)))
    }

    // ------------------------------------------------------------------------
    // Results: predict
    // ------------------------------------------------------------------------

    fn synced_input<'a>(
        &self,
        inner: &'a mut ControllerState,
        artifacts: &StageArtifacts,
    ) -> PipelineResult<&'a mut PredictionInputState> {
        let dataset = required(artifacts.dataset.as_ref(), Stage::Results, ArtifactKey::UploadedFile)?;
        let training = required(
            artifacts.training.as_ref(),
            Stage::Results,
            ArtifactKey::TrainingResult,
        )?;
        let columns = &dataset.column_names;
        let target = &training.target_column;

        if let Some(state) = inner.input.as_mut() {
            if state.sync(columns, target)? {
                tracing::debug!(target = %target, "Prediction input rebuilt");
            }
        } else {
            inner.input = Some(PredictionInputState::build(columns, target)?);
        }
        inner
            .input
            .as_mut()
            .ok_or_else(|| PipelineError::invalid("prediction_input", "input unavailable"))
    }

    /// Current prediction input: one entry per dataset column except the
    /// training target. Edits survive until the dataset or target changes.
    pub fn prediction_input(&self) -> PipelineResult<PredictionInput> {
        let result = (|| -> PipelineResult<PredictionInput> {
            let artifacts = self.require(Stage::Results)?;
            let mut inner = self.lock()?;
            Ok(self.synced_input(&mut inner, &artifacts)?.input.clone())
        })();
        self.record(Stage::Results, result)
    }

    /// Set one input column. Unknown columns are rejected.
    pub fn set_prediction_value(&self, column: &str, value: f64) -> PipelineResult<()> {
        let result = (|| -> PipelineResult<()> {
            let artifacts = self.require(Stage::Results)?;
            let mut inner = self.lock()?;
            self.synced_input(&mut inner, &artifacts)?
                .set_value(column, value)
        })();
        self.record(Stage::Results, result)
    }

    /// Set one input column from user text. Text without a leading number
    /// counts as `0`.
    pub fn set_prediction_text(&self, column: &str, text: &str) -> PipelineResult<()> {
        self.set_prediction_value(column, parse_input_value(text))
    }

    /// Predict with an explicit model and input.
    pub async fn run_predict(
        &self,
        model_id: &str,
        input: &PredictionInput,
    ) -> PipelineResult<PredictionResult> {
        let result = self.predict(model_id, input).await;
        self.record(Stage::Results, result)
    }

    async fn predict(&self, model_id: &str, input: &PredictionInput) -> PipelineResult<PredictionResult> {
        if model_id.trim().is_empty() {
            return Err(PipelineError::invalid("model_id", "model id is empty"));
        }
        if input.is_empty() {
            return Err(PipelineError::invalid("data", "prediction input is empty"));
        }

        let token = self.issue(ArtifactKey::PredictionResult)?;
        let request = PredictRequest {
            model_id: model_id.to_string(),
            data: input.clone(),
        };
        let prediction = {
            let _activity = self.begin(PipelineState::Predicting)?;
            let response = self.gateway.predict(&request).await;
            self.settle(&token, response)?
        };
        self.commit(token, &prediction)?;

        let values = prediction
            .predictions
            .values()
            .iter()
            .map(|v| format!("{:.4}", v))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::info!(model_id = %model_id, inputs = input.len(), "Prediction received");
        self.push_report(StatusReport::success(
            Stage::Results,
            format!("Prediction: {}", values),
        ));
        Ok(prediction)
    }

    /// Predict with the stored model and the current prediction input.
    pub async fn predict_current(&self) -> PipelineResult<PredictionResult> {
        let training = match self
            .require(Stage::Results)
            .and_then(|a| required(a.training, Stage::Results, ArtifactKey::TrainingResult))
        {
            Ok(training) => training,
            Err(e) => return self.record(Stage::Results, Err(e)),
        };
        let input = self.prediction_input()?;
        self.run_predict(&training.model_id, &input).await
    }

    // ------------------------------------------------------------------------
    // Results: model info, export, probes
    // ------------------------------------------------------------------------

    /// Backend status of the stored model.
    pub async fn model_info(&self) -> PipelineResult<ModelInfo> {
        let result = async {
            let artifacts = self.require(Stage::Results)?;
            let training = required(artifacts.training, Stage::Results, ArtifactKey::TrainingResult)?;
            self.gateway
                .get_model(&training.model_id)
                .await
                .map_err(PipelineError::from)
        }
        .await;
        self.record(Stage::Results, result)
    }

    /// Downloadable summary of the stored training result.
    pub fn export_results(&self) -> PipelineResult<ExportBundle> {
        let result = self.require(Stage::Results).and_then(|artifacts| {
            required(artifacts.training, Stage::Results, ArtifactKey::TrainingResult)
                .map(ExportBundle::from_training)
        });
        self.record(Stage::Results, result)
    }

    pub async fn backend_status(&self) -> BackendStatus {
        BackendStatus {
            health: self.gateway.health().await,
            ai: self.gateway.ai_status().await,
        }
    }

    /// Clear every artifact and return to `Idle`. Responses still in flight
    /// are discarded when they arrive.
    pub fn reset(&self) -> PipelineResult<()> {
        let mut inner = self.lock()?;
        self.session.store().clear()?;
        inner.tokens.invalidate_all();
        inner.input = None;
        inner.reports.clear();
        inner.state = PipelineState::Idle;
        tracing::info!(session_id = %self.session.id(), "Pipeline reset");
        Ok(())
    }
}

impl std::fmt::Debug for StageController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageController")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}
