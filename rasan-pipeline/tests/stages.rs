//! Stage controller behavior against a scripted gateway.

use rasan_core::{
    ArtifactKey, ChartKind, GatewayErrorKind, InvalidationPolicy, PipelineConfig, PipelineError,
    PipelineState, PredictionResult, Predictions, ProblemType, ReadinessConfig, Stage,
    TrainingResponse, UploadFile,
};
use rasan_pipeline::{
    ReportAction, ReportLevel, StageController, StageReadiness, TrainOptions, VisualizeParams,
    MAX_REPORTS,
};
use rasan_storage::{ArtifactStoreExt, InMemoryArtifactStore};
use rasan_test_utils::assertions::{
    assert_gateway_error, assert_invalid_input, assert_missing_prerequisite,
};
use rasan_test_utils::{fixtures, FailingArtifactStore, GatewayCall, MockGateway};
use serde_json::json;
use std::sync::Arc;

fn config() -> PipelineConfig {
    PipelineConfig {
        readiness: ReadinessConfig::immediate(),
        ..PipelineConfig::default()
    }
}

fn setup(config: PipelineConfig) -> (Arc<MockGateway>, Arc<InMemoryArtifactStore>, StageController) {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(InMemoryArtifactStore::new());
    let controller = StageController::new(gateway.clone(), store.clone(), config);
    (gateway, store, controller)
}

async fn upload_houses(gateway: &MockGateway, controller: &StageController) {
    gateway
        .on_upload(Ok(fixtures::houses_dataset()))
        .on_preprocess(Ok(fixtures::preprocess_record("houses.csv")));
    let outcome = controller
        .run_upload(fixtures::csv_upload("houses.csv"))
        .await
        .unwrap();
    assert!(outcome.preprocess.is_ok());
}

async fn train_houses(gateway: &MockGateway, controller: &StageController) {
    gateway.on_train(Ok(fixtures::training_response("m1", ProblemType::Regression)));
    controller
        .run_train("price", ProblemType::Regression)
        .await
        .unwrap();
}

// ============================================================================
// PRECONDITIONS
// ============================================================================

#[tokio::test]
async fn test_analyze_without_upload_redirects_to_upload() {
    let (gateway, _store, controller) = setup(config());

    let result = controller.run_analyze(Some("price")).await;

    assert_missing_prerequisite(&result, Stage::Upload);
    assert_eq!(gateway.call_count(), 0);
    let report = controller.last_report().unwrap();
    assert_eq!(report.level, ReportLevel::Info);
    assert_eq!(report.action, Some(ReportAction::Redirect(Stage::Upload)));
}

#[tokio::test]
async fn test_results_without_training_redirects_to_train() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;

    let readiness = controller.enter_stage(Stage::Results).unwrap();
    assert!(matches!(
        readiness,
        StageReadiness::MissingPrerequisite {
            missing: ArtifactKey::TrainingResult,
            redirect_to: Stage::Train,
            ..
        }
    ));
    assert_missing_prerequisite(&controller.export_results(), Stage::Train);
    assert_missing_prerequisite(&controller.visualize_latest(vec![]).await, Stage::Train);
}

#[tokio::test]
async fn test_train_only_needs_upload() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;

    assert!(controller.enter_stage(Stage::Train).unwrap().is_ready());
    train_houses(&gateway, &controller).await;
}

// ============================================================================
// UPLOAD
// ============================================================================

#[tokio::test]
async fn test_upload_chains_preprocess() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;

    assert_eq!(
        gateway.calls()[1],
        GatewayCall::Preprocess {
            filename: "houses.csv".into()
        }
    );
    let session = controller.session();
    assert_eq!(session.dataset().unwrap().unwrap().filename, "houses.csv");
    assert!(session.preprocess().unwrap().is_some());
    assert_eq!(controller.state(), PipelineState::Idle);
}

#[tokio::test]
async fn test_failed_preprocess_keeps_upload() {
    let (gateway, _store, controller) = setup(config());
    gateway
        .on_upload(Ok(fixtures::houses_dataset()))
        .on_preprocess(Err(fixtures::backend_error(500, "Preprocessing failed")));

    let outcome = controller
        .run_upload(fixtures::csv_upload("houses.csv"))
        .await
        .unwrap();

    assert_gateway_error(&outcome.preprocess, GatewayErrorKind::Backend);
    assert!(controller.session().dataset().unwrap().is_some());
    assert!(controller.session().preprocess().unwrap().is_none());
    let report = controller.last_report().unwrap();
    assert_eq!(report.stage, Stage::Preprocess);
    assert_eq!(report.message, "Preprocessing failed");
    assert_eq!(report.action, Some(ReportAction::Retry));
}

#[tokio::test]
async fn test_upload_validation_happens_before_backend() {
    let (gateway, _store, controller) = setup(PipelineConfig {
        max_upload_bytes: 8,
        ..config()
    });

    let not_csv = UploadFile::new("notes.txt", Some("text/plain".into()), b"hi".to_vec());
    assert_invalid_input(&controller.run_upload(not_csv).await, "file");

    let too_big = fixtures::csv_upload("houses.csv");
    assert_invalid_input(&controller.run_upload(too_big).await, "file");

    let empty = UploadFile::new("empty.csv", Some("text/csv".into()), Vec::new());
    assert_invalid_input(&controller.run_upload(empty).await, "file");

    assert_invalid_input(&controller.select_upload(vec![]), "file");
    assert_invalid_input(
        &controller.select_upload(vec![
            fixtures::csv_upload("a.csv"),
            fixtures::csv_upload("b.csv"),
        ]),
        "file",
    );
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_duplicate_columns_warn() {
    let (gateway, _store, controller) = setup(config());
    gateway
        .on_upload(Ok(fixtures::dataset("dup.csv", &["a", "b", "a"])))
        .on_preprocess(Ok(fixtures::preprocess_record("dup.csv")));

    controller
        .run_upload(fixtures::csv_upload("dup.csv"))
        .await
        .unwrap();

    assert!(controller
        .reports()
        .iter()
        .any(|r| r.level == ReportLevel::Warning && r.message.contains("Duplicate column names: a")));
}

#[tokio::test]
async fn test_reupload_retains_stale_analysis_by_default() {
    let (gateway, store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    gateway.on_analyze(Ok(fixtures::analysis(Some("price"), Some(ProblemType::Regression))));
    controller.run_analyze(Some("price")).await.unwrap();

    gateway
        .on_upload(Ok(fixtures::dataset("cars.csv", &["speed", "weight"])))
        .on_preprocess(Err(fixtures::backend_error(500, "boom")));
    controller
        .run_upload(fixtures::csv_upload("cars.csv"))
        .await
        .unwrap();

    let session = controller.session();
    assert_eq!(session.dataset().unwrap().unwrap().filename, "cars.csv");
    assert!(!store.contains(ArtifactKey::PreprocessedData).unwrap());
    assert!(store.contains(ArtifactKey::AnalysisResult).unwrap());
}

#[tokio::test]
async fn test_reupload_clears_downstream_when_configured() {
    let (gateway, store, controller) = setup(PipelineConfig {
        invalidation: InvalidationPolicy::ClearDownstream,
        ..config()
    });
    upload_houses(&gateway, &controller).await;
    gateway.on_analyze(Ok(fixtures::analysis(Some("price"), Some(ProblemType::Regression))));
    controller.run_analyze(Some("price")).await.unwrap();
    train_houses(&gateway, &controller).await;

    upload_houses(&gateway, &controller).await;

    assert!(store.contains(ArtifactKey::UploadedFile).unwrap());
    assert!(store.contains(ArtifactKey::PreprocessedData).unwrap());
    assert!(!store.contains(ArtifactKey::AnalysisResult).unwrap());
    assert!(!store.contains(ArtifactKey::TrainingResult).unwrap());
}

#[tokio::test]
async fn test_failed_reupload_commit_writes_nothing() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(FailingArtifactStore::new());
    let controller = StageController::new(gateway.clone(), store.clone(), config());
    upload_houses(&gateway, &controller).await;

    store.fail_writes(true);
    gateway.on_upload(Ok(fixtures::dataset("cars.csv", &["speed", "weight", "price"])));
    let result = controller.run_upload(fixtures::csv_upload("cars.csv")).await;
    store.fail_writes(false);

    assert!(matches!(result, Err(PipelineError::Storage(_))));
    assert_eq!(controller.last_report().unwrap().level, ReportLevel::Error);
    assert_eq!(gateway.calls_to("preprocess"), 1);
    let session = controller.session();
    assert_eq!(session.dataset().unwrap().unwrap().filename, "houses.csv");
    assert_eq!(
        session.preprocess().unwrap().unwrap().preprocessed_path,
        "./data/houses_preprocessed.csv"
    );

    gateway.on_train(Ok(fixtures::training_response("m1", ProblemType::Regression)));
    controller
        .run_train("price", ProblemType::Regression)
        .await
        .unwrap();
    match gateway.calls().last() {
        Some(GatewayCall::Train(request)) => {
            assert_eq!(request.filename, "houses_preprocessed.csv");
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_training_commit_keeps_previous_model() {
    let gateway = Arc::new(MockGateway::new());
    let store = Arc::new(FailingArtifactStore::new());
    let controller = StageController::new(gateway.clone(), store.clone(), config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;
    gateway.on_visualize(Ok(fixtures::visualization_response(
        "m1",
        vec![("residuals", fixtures::figure("Residuals"))],
    )));
    controller.visualize_latest(vec![]).await.unwrap();

    store.fail_writes(true);
    gateway.on_train(Ok(fixtures::training_response("m2", ProblemType::Regression)));
    let result = controller.run_train("price", ProblemType::Regression).await;
    store.fail_writes(false);

    assert!(matches!(result, Err(PipelineError::Storage(_))));
    assert_eq!(controller.session().training().unwrap().unwrap().model_id, "m1");
    assert!(controller.session().visualizations().unwrap().is_some());
}

// ============================================================================
// ANALYZE AND TRAIN
// ============================================================================

#[tokio::test]
async fn test_analyze_uses_uploaded_filename() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    gateway.on_analyze(Ok(fixtures::analysis(None, Some(ProblemType::Regression))));

    let analysis = controller.run_analyze(Some("price")).await.unwrap();

    match gateway.calls().last() {
        Some(GatewayCall::Analyze(request)) => {
            assert_eq!(request.filename, "houses.csv");
            assert_eq!(request.target_column.as_deref(), Some("price"));
        }
        other => panic!("unexpected call: {:?}", other),
    }
    assert_eq!(analysis.target_column.as_deref(), Some("price"));
}

#[tokio::test]
async fn test_analyze_rejects_unknown_target() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    let before = gateway.call_count();

    let result = controller.run_analyze(Some("color")).await;

    assert_invalid_input(&result, "target_column");
    assert_eq!(gateway.call_count(), before);
}

#[tokio::test]
async fn test_blank_analyze_target_is_untargeted() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    gateway.on_analyze(Ok(fixtures::analysis(None, None)));

    controller.run_analyze(Some("  ")).await.unwrap();

    match gateway.calls().last() {
        Some(GatewayCall::Analyze(request)) => assert_eq!(request.target_column, None),
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_target_makes_no_backend_call() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    let before = gateway.call_count();

    let result = controller.run_train("", ProblemType::Regression).await;

    assert_invalid_input(&result, "target_column");
    assert_eq!(gateway.call_count(), before);
    assert_eq!(controller.last_report().unwrap().level, ReportLevel::Error);
}

#[tokio::test]
async fn test_train_defaults_come_from_analysis() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    let defaults = controller.train_defaults().unwrap();
    assert_eq!(defaults.target_column, None);
    assert_eq!(defaults.problem_type, ProblemType::Regression);

    gateway.on_analyze(Ok(fixtures::analysis(
        Some("rooms"),
        Some(ProblemType::MulticlassClassification),
    )));
    controller.run_analyze(Some("rooms")).await.unwrap();

    let defaults = controller.train_defaults().unwrap();
    assert_eq!(defaults.target_column.as_deref(), Some("rooms"));
    assert_eq!(defaults.problem_type, ProblemType::MulticlassClassification);
}

#[tokio::test]
async fn test_train_uses_preprocessed_file_and_records_target() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    gateway.on_train(Ok(fixtures::training_response("m1", ProblemType::Regression)));

    let training = controller
        .run_train(" price ", ProblemType::Regression)
        .await
        .unwrap();

    match gateway.calls().last() {
        Some(GatewayCall::Train(request)) => {
            assert_eq!(request.filename, "houses_preprocessed.csv");
            assert_eq!(request.target, "price");
        }
        other => panic!("unexpected call: {:?}", other),
    }
    assert_eq!(training.model_id, "m1");
    assert_eq!(training.target_column, "price");
    assert_eq!(controller.session().training().unwrap(), Some(training));
}

#[tokio::test]
async fn test_train_rejects_target_as_feature() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    let options = TrainOptions {
        features: Some(vec!["area".into(), "price".into()]),
        ..TrainOptions::new("price", ProblemType::Regression)
    };

    assert_invalid_input(&controller.run_train_with(options).await, "features");
}

#[tokio::test]
async fn test_in_band_training_failure_writes_nothing() {
    let (gateway, store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    gateway.on_train(Ok(TrainingResponse {
        model_id: None,
        model_type: None,
        status: "failed".into(),
        metrics: vec![],
        error: Some(json!("Training failed: not enough rows")),
    }));

    let result = controller.run_train("price", ProblemType::Regression).await;

    match &result {
        Err(PipelineError::Gateway(err)) => {
            assert_eq!(err.message, "Training failed: not enough rows")
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!store.contains(ArtifactKey::TrainingResult).unwrap());
    assert_eq!(controller.last_report().unwrap().action, Some(ReportAction::Retry));
}

#[tokio::test]
async fn test_validation_error_message_is_extracted() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    gateway.on_train(Err(fixtures::validation_error(&["body", "target"], "field required")));

    let result = controller.run_train("price", ProblemType::Regression).await;

    assert_gateway_error(&result, GatewayErrorKind::Validation);
    let report = controller.last_report().unwrap();
    assert_eq!(report.message, "body.target: field required");
    assert_eq!(report.action, None);
}

#[tokio::test]
async fn test_transport_failure_is_reported_not_raised() {
    let (_gateway, _store, controller) = setup(config());

    let result = controller.run_upload(fixtures::csv_upload("houses.csv")).await;

    assert_gateway_error(&result, GatewayErrorKind::Transport);
    assert_eq!(controller.state(), PipelineState::Idle);
    assert!(controller.session().dataset().unwrap().is_none());
}

// ============================================================================
// RESULTS
// ============================================================================

#[tokio::test]
async fn test_train_and_visualize_polls_model_first() {
    let (gateway, _store, controller) = setup(PipelineConfig {
        readiness: ReadinessConfig {
            max_attempts: 3,
            ..ReadinessConfig::immediate()
        },
        ..config()
    });
    upload_houses(&gateway, &controller).await;
    gateway
        .on_train(Ok(fixtures::training_response("m1", ProblemType::Regression)))
        .on_get_model(Err(fixtures::backend_error(404, "Model not found")))
        .on_get_model(Ok(fixtures::model_loaded("m1")))
        .on_visualize(Ok(fixtures::visualization_response(
            "m1",
            vec![("residuals", fixtures::figure("Residuals"))],
        )));

    let outcome = controller
        .run_train_and_visualize(
            TrainOptions::new("price", ProblemType::Regression),
            ProblemType::Regression.default_charts(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.training.model_id, "m1");
    let report = outcome.visualization.unwrap();
    assert_eq!(report.normalized.valid.len(), 1);
    assert_eq!(report.category(), None);
    assert_eq!(gateway.calls_to("get_model"), 2);
    match gateway.calls().last() {
        Some(GatewayCall::Visualize(request)) => {
            assert_eq!(request.filename, "houses_preprocessed.csv");
            assert_eq!(request.target_column, "price");
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn test_partial_visualization_is_a_warning() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;
    gateway.on_visualize(Ok(fixtures::visualization_response(
        "m1",
        vec![
            ("residuals", fixtures::figure("Residuals")),
            ("feature_importance", json!({"error": "model has no feature_importances_"})),
        ],
    )));

    let report = controller.visualize_latest(vec![]).await.unwrap();

    assert_eq!(report.normalized.valid.len(), 1);
    assert_eq!(
        report.normalized.failed.get(&ChartKind::FeatureImportance).map(String::as_str),
        Some("model has no feature_importances_")
    );
    assert!(report.category().is_some());
    let status = controller.last_report().unwrap();
    assert_eq!(status.level, ReportLevel::Warning);
    assert_eq!(status.action, Some(ReportAction::Regenerate));
    assert!(status.message.starts_with("1/2 charts available"));
    assert_eq!(controller.session().visualizations().unwrap().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_visualize_keeps_previous_set() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;
    gateway
        .on_visualize(Ok(fixtures::visualization_response(
            "m1",
            vec![("residuals", fixtures::figure("Residuals"))],
        )))
        .on_visualize(Err(fixtures::backend_error(500, "Visualization failed")));

    controller.visualize_latest(vec![]).await.unwrap();
    let result = controller.regenerate().await;

    assert_gateway_error(&result, GatewayErrorKind::Backend);
    let stored = controller.stored_visualizations().unwrap().unwrap();
    assert_eq!(stored.valid.len(), 1);
}

#[tokio::test]
async fn test_visualize_without_filename_fails_fast() {
    let (gateway, _store, controller) = setup(config());

    let result = controller
        .run_visualize(VisualizeParams {
            model_id: "m1".into(),
            filename: None,
            target_column: Some("price".into()),
            chart_types: vec![],
        })
        .await;
    assert_missing_prerequisite(&result, Stage::Upload);

    let result = controller
        .run_visualize(VisualizeParams {
            model_id: "m1".into(),
            filename: Some("houses.csv".into()),
            target_column: Some(String::new()),
            chart_types: vec![],
        })
        .await;
    assert_missing_prerequisite(&result, Stage::Train);
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_prediction_input_excludes_target() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;

    let input = controller.prediction_input().unwrap();
    assert_eq!(input.keys().collect::<Vec<_>>(), vec!["age", "area", "rooms"]);
    assert!(input.0.values().all(|v| *v == 0.0));

    controller.set_prediction_value("area", 120.0).unwrap();
    controller.set_prediction_text("rooms", "3 bedrooms").unwrap();
    assert_invalid_input(&controller.set_prediction_value("price", 1.0), "column");

    let input = controller.prediction_input().unwrap();
    assert_eq!(input.get("area"), Some(120.0));
    assert_eq!(input.get("rooms"), Some(3.0));
}

#[tokio::test]
async fn test_prediction_input_resets_on_new_target() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;
    controller.set_prediction_value("area", 120.0).unwrap();

    gateway.on_train(Ok(fixtures::training_response("m2", ProblemType::Regression)));
    controller
        .run_train("area", ProblemType::Regression)
        .await
        .unwrap();

    let input = controller.prediction_input().unwrap();
    assert_eq!(input.get("area"), None);
    assert_eq!(input.get("price"), Some(0.0));
}

#[tokio::test]
async fn test_predict_current_sends_edited_input() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;
    controller.set_prediction_value("area", 95.5).unwrap();
    gateway.on_predict(Ok(PredictionResult {
        predictions: Predictions::Single(231000.0),
    }));

    let prediction = controller.predict_current().await.unwrap();

    assert_eq!(prediction.predictions.values(), vec![231000.0]);
    match gateway.calls().last() {
        Some(GatewayCall::Predict(request)) => {
            assert_eq!(request.model_id, "m1");
            assert_eq!(request.data.get("area"), Some(95.5));
            assert_eq!(request.data.len(), 3);
        }
        other => panic!("unexpected call: {:?}", other),
    }
    assert!(controller.session().prediction().unwrap().is_some());
}

#[tokio::test]
async fn test_predict_rejects_empty_input() {
    let (gateway, _store, controller) = setup(config());

    let result = controller.run_predict("m1", &Default::default()).await;

    assert_invalid_input(&result, "data");
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_new_training_clears_old_visualizations() {
    let (gateway, store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;
    gateway.on_visualize(Ok(fixtures::visualization_response(
        "m1",
        vec![("residuals", fixtures::figure("Residuals"))],
    )));
    controller.visualize_latest(vec![]).await.unwrap();

    gateway.on_train(Ok(fixtures::training_response("m2", ProblemType::Regression)));
    controller
        .run_train("price", ProblemType::Regression)
        .await
        .unwrap();

    assert!(!store.contains(ArtifactKey::Visualizations).unwrap());
}

#[tokio::test]
async fn test_model_info_and_export() {
    let (gateway, _store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;
    gateway.on_get_model(Ok(fixtures::model_loaded("m1")));

    let info = controller.model_info().await.unwrap();
    assert_eq!(info.status, "loaded");

    let bundle = controller.export_results().unwrap();
    assert_eq!(bundle.model_id, "m1");
    assert_eq!(bundle.training_result.target_column, "price");
    assert_eq!(bundle.suggested_file_name(), "m1_results.json");
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let (gateway, store, controller) = setup(config());
    upload_houses(&gateway, &controller).await;
    train_houses(&gateway, &controller).await;

    controller.reset().unwrap();

    assert!(store.is_empty());
    assert!(controller.reports().is_empty());
    assert_eq!(controller.state(), PipelineState::Idle);
    assert_missing_prerequisite(&controller.run_analyze(None).await, Stage::Upload);
}

#[test]
fn test_report_history_is_bounded() {
    let (_gateway, _store, controller) = setup(config());
    controller.enter_stage(Stage::Analyze).unwrap();
    for _ in 0..MAX_REPORTS + 5 {
        let _ = controller.select_upload(vec![]);
    }

    let reports = controller.reports();
    assert_eq!(reports.len(), MAX_REPORTS);
    assert!(reports.iter().all(|r| r.level == ReportLevel::Error));
    assert_eq!(controller.last_report().unwrap().stage, Stage::Upload);
}

#[tokio::test]
async fn test_backend_status_reports_each_probe() {
    let (gateway, _store, controller) = setup(config());
    gateway.on_health(Ok(rasan_core::HealthStatus {
        status: "healthy".into(),
    }));

    let status = controller.backend_status().await;

    assert_eq!(status.health.unwrap().status, "healthy");
    assert_eq!(status.ai.unwrap_err().kind, GatewayErrorKind::Transport);
}
