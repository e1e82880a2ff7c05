//! Status reports surfaced after each stage operation.

use chrono::{DateTime, Utc};
use rasan_core::{FailureCategory, PipelineError, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ReportLevel::Info => "info",
            ReportLevel::Success => "success",
            ReportLevel::Warning => "warning",
            ReportLevel::Error => "error",
        };
        f.write_str(value)
    }
}

/// Follow-up the user can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Retry,
    /// Request the visualizations again.
    Regenerate,
    Redirect(Stage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub stage: Stage,
    pub level: ReportLevel,
    pub message: String,
    pub action: Option<ReportAction>,
    pub created_at: DateTime<Utc>,
}

impl StatusReport {
    pub fn new(stage: Stage, level: ReportLevel, message: impl Into<String>) -> Self {
        Self {
            stage,
            level,
            message: message.into(),
            action: None,
            created_at: Utc::now(),
        }
    }

    pub fn success(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, ReportLevel::Success, message)
    }

    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self::new(stage, ReportLevel::Warning, message)
    }

    pub fn with_action(mut self, action: ReportAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Non-fatal report for a failed operation.
    ///
    /// A missing prerequisite is a redirect, not an error banner.
    pub fn from_error(stage: Stage, err: &PipelineError) -> Self {
        match err {
            PipelineError::MissingPrerequisite { redirect_to, .. } => {
                Self::new(stage, ReportLevel::Info, err.user_message())
                    .with_action(ReportAction::Redirect(*redirect_to))
            }
            _ => {
                let report = Self::new(stage, ReportLevel::Error, err.user_message());
                match err.category() {
                    FailureCategory::TransportFailure | FailureCategory::GenericBackendFailure => {
                        report.with_action(ReportAction::Retry)
                    }
                    _ => report,
                }
            }
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.stage, self.message)
    }
}
