//! Plain-text rendering of pipeline artifacts.

use rasan_core::{
    AnalysisResult, ArtifactKey, DatasetDescriptor, ModelInfo, NormalizedVisualizations,
    PredictionInput, PredictionResult, PreprocessRecord, TrainingResult,
};
use rasan_pipeline::{BackendStatus, ReportLevel, StageArtifacts, StatusReport};
use serde_json::Value;
use std::fmt::Write;

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.4}", f),
            _ => n.to_string(),
        },
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

pub fn dataset(dataset: &DatasetDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {} rows x {} columns ({} bytes in memory)",
        dataset.filename, dataset.row_count, dataset.column_count, dataset.memory_usage_bytes
    );
    for column in &dataset.column_names {
        match dataset.dtypes.get(column) {
            Some(dtype) => {
                let _ = writeln!(out, "  {} ({})", column, dtype);
            }
            None => {
                let _ = writeln!(out, "  {}", column);
            }
        }
    }
    out
}

pub fn preprocess(record: &PreprocessRecord) -> String {
    let mut out = format!("Preprocessed file: {}\n", record.preprocessed_path);
    if let (Some(before), Some(after)) = (record.original_shape, record.preprocessed_shape) {
        let _ = writeln!(out, "  shape {}x{} -> {}x{}", before.0, before.1, after.0, after.1);
    }
    for step in &record.preprocessing_applied {
        let _ = writeln!(out, "  - {}", step);
    }
    out
}

pub fn analysis(analysis: &AnalysisResult) -> String {
    let mut out = String::new();
    let problem = analysis
        .problem_type
        .map(|p| p.to_string())
        .unwrap_or_else(|| "undetermined".to_string());
    let _ = writeln!(out, "Problem type: {}", problem);
    if let Some(target) = &analysis.target_column {
        let _ = writeln!(out, "Target: {}", target);
    }
    let data = &analysis.data_characteristics;
    let _ = writeln!(
        out,
        "Rows: {}  Columns: {} ({} numerical, {} categorical)",
        data.total_rows, data.total_columns, data.numerical_columns, data.categorical_columns
    );
    if !analysis.suitable_approaches.is_empty() {
        let _ = writeln!(out, "Approaches: {}", analysis.suitable_approaches.join(", "));
    }
    if let Some(insights) = &analysis.ai_insights {
        let _ = writeln!(out, "\n{}", insights.trim());
    }
    out
}

pub fn training(training: &TrainingResult) -> String {
    let mut out = format!(
        "Model {} ({}) trained on target '{}'\n",
        training.model_id, training.model_type, training.target_column
    );
    let columns = training.metric_columns();
    if columns.is_empty() {
        return out;
    }
    let _ = writeln!(out, "  {}", columns.join(" | "));
    for row in &training.metrics {
        let cells = columns
            .iter()
            .map(|c| row.get(*c).map(scalar).unwrap_or_else(|| "-".to_string()))
            .collect::<Vec<_>>();
        let _ = writeln!(out, "  {}", cells.join(" | "));
    }
    out
}

pub fn model_info(info: &ModelInfo) -> String {
    format!(
        "Model {}: {}\n",
        info.model_id.as_deref().unwrap_or("?"),
        info.status
    )
}

pub fn visualizations(normalized: &NormalizedVisualizations) -> String {
    let mut out = String::new();
    for (kind, figure) in &normalized.valid {
        let title = figure
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| kind.title());
        let _ = writeln!(out, "  ok    {} ({} traces)", title, figure.traces().len());
    }
    for (kind, message) in &normalized.failed {
        let _ = writeln!(out, "  fail  {}: {}", kind.title(), message);
    }
    if let Some(summary) = normalized.summary() {
        let _ = writeln!(out, "{}", summary);
    }
    out
}

pub fn prediction_input(input: &PredictionInput) -> String {
    input
        .0
        .iter()
        .map(|(column, value)| format!("  {} = {}\n", column, value))
        .collect()
}

pub fn prediction(prediction: &PredictionResult) -> String {
    let values = prediction
        .predictions
        .values()
        .iter()
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>();
    format!("Prediction: {}\n", values.join(", "))
}

pub fn artifacts(artifacts: &StageArtifacts) -> String {
    ArtifactKey::all()
        .iter()
        .map(|key| {
            let mark = if artifacts.has(*key) { "x" } else { " " };
            format!("  [{}] {}\n", mark, key)
        })
        .collect()
}

pub fn backend_status(status: &BackendStatus) -> String {
    let mut out = String::new();
    match &status.health {
        Ok(health) => {
            let _ = writeln!(out, "Backend: {}", health.status);
        }
        Err(e) => {
            let _ = writeln!(out, "Backend: unreachable ({})", e.message);
        }
    }
    match &status.ai {
        Ok(ai) if ai.openai_available => {
            let _ = writeln!(out, "AI insights: available");
        }
        Ok(ai) => {
            let _ = writeln!(
                out,
                "AI insights: unavailable{}",
                ai.message
                    .as_deref()
                    .map(|m| format!(" ({})", m))
                    .unwrap_or_default()
            );
        }
        Err(e) => {
            let _ = writeln!(out, "AI insights: unknown ({})", e.message);
        }
    }
    out
}

pub fn reports(reports: &[StatusReport]) -> String {
    reports.iter().map(|r| format!("{}\n", r)).collect()
}

/// Reports to print ahead of `error`. The trailing error report repeating
/// the same message is left out, since `error` is printed on its own.
pub fn reports_before_error(all: &[StatusReport], error: &str) -> String {
    match all.split_last() {
        Some((last, rest)) if last.level == ReportLevel::Error && last.message == error => {
            reports(rest)
        }
        _ => reports(all),
    }
}
