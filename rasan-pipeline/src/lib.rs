//! RASAN Pipeline - Stage Controller
//!
//! Drives the Upload, Preprocess, Analyze, Train and Results stages against
//! a [`rasan_gateway::Gateway`] and persists each stage's output in a
//! [`rasan_storage::ArtifactStore`].
//!
//! Stages are entered in order. Each one checks that the artifacts it needs
//! exist and redirects to the producing stage when they do not. Responses
//! that arrive after a newer request for the same artifact are dropped.

pub mod controller;
pub mod readiness;
pub mod session;
pub mod status;
pub mod tokens;

pub use controller::{
    BackendStatus, StageController, TrainDefaults, TrainOptions, TrainOutcome, UploadOutcome,
    VisualizationReport, VisualizeParams, MAX_REPORTS,
};
pub use readiness::{is_ready, wait_for_model};
pub use session::{Session, StageArtifacts, StageReadiness};
pub use status::{ReportAction, ReportLevel, StatusReport};
pub use tokens::{RequestToken, RequestTokens};
