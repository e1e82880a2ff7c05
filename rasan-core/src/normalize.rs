//! Result normalization.
//!
//! Two pure functions live here:
//! - [`extract_error_message`] turns any backend error payload into one line
//!   of text, using a fixed precedence over the payload's shape.
//! - [`normalize_visualizations`] partitions a visualization set into
//!   renderable figures and failed charts, and produces a single diagnostic
//!   when any subset failed.

use crate::entities::{ChartResult, PlotFigure, VisualizationSet};
use crate::enums::ChartKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Separator used when joining a field-error list.
pub const FIELD_ERROR_SEPARATOR: &str = "; ";

/// Extract a human-readable message from a raw error payload.
///
/// Precedence:
/// 1. a list: each item's best text joined with `"; "`
/// 2. a string: used as is
/// 3. an object with a non-null `message` or `error`: that field
/// 4. anything else: the JSON text of the value
pub fn extract_error_message(raw: &Value) -> String {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(field_error_text)
            .collect::<Vec<_>>()
            .join(FIELD_ERROR_SEPARATOR),
        Value::String(text) => text.clone(),
        Value::Object(object) => match ["message", "error"]
            .iter()
            .find_map(|field| object.get(*field).filter(|value| !value.is_null()))
        {
            Some(Value::String(text)) => text.clone(),
            Some(nested) => extract_error_message(nested),
            None => literal(raw),
        },
        other => literal(other),
    }
}

fn field_error_text(item: &Value) -> String {
    let Some(object) = item.as_object() else {
        return match item {
            Value::String(text) => text.clone(),
            other => literal(other),
        };
    };

    let Some(msg) = object.get("msg").and_then(Value::as_str) else {
        return literal(item);
    };

    if let Some(location) = object.get("loc").and_then(location_text) {
        return format!("{}: {}", location, msg);
    }
    if let Some(kind) = object.get("type").and_then(Value::as_str) {
        return format!("{}: {}", kind, msg);
    }
    msg.to_string()
}

fn location_text(loc: &Value) -> Option<String> {
    let text = match loc {
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => literal(other),
            })
            .collect::<Vec<_>>()
            .join("."),
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => literal(other),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn literal(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unprintable error>".to_string())
}

// ============================================================================
// VISUALIZATION NORMALIZER
// ============================================================================

/// Diagnostic emitted when some or all charts failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisualizationDiagnostic {
    AllFailed { total: usize },
    Partial { available: usize, total: usize },
}

impl fmt::Display for VisualizationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisualizationDiagnostic::AllFailed { .. } => f.write_str("all visualizations failed"),
            VisualizationDiagnostic::Partial { available, total } => {
                write!(f, "{}/{} charts available", available, total)
            }
        }
    }
}

/// A visualization set split into what can be rendered and what failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedVisualizations {
    pub valid: BTreeMap<ChartKind, PlotFigure>,
    /// Failed chart kind to its extracted error message.
    pub failed: BTreeMap<ChartKind, String>,
    pub diagnostic: Option<VisualizationDiagnostic>,
}

impl NormalizedVisualizations {
    pub fn total(&self) -> usize {
        self.valid.len() + self.failed.len()
    }

    /// Diagnostic text followed by each failed chart's reason.
    pub fn summary(&self) -> Option<String> {
        let diagnostic = self.diagnostic.as_ref()?;
        if self.failed.is_empty() {
            return Some(diagnostic.to_string());
        }
        let reasons = self
            .failed
            .iter()
            .map(|(kind, message)| format!("{}: {}", kind, message))
            .collect::<Vec<_>>()
            .join(FIELD_ERROR_SEPARATOR);
        Some(format!("{} ({})", diagnostic, reasons))
    }
}

/// Partition a visualization set by the presence of an `error` field.
///
/// An empty set has no valid entries and is reported as all-failed.
pub fn normalize_visualizations(set: &VisualizationSet) -> NormalizedVisualizations {
    let mut valid = BTreeMap::new();
    let mut failed = BTreeMap::new();

    for (kind, result) in set.iter() {
        match result {
            ChartResult::Figure(figure) => {
                valid.insert(kind.clone(), figure.clone());
            }
            ChartResult::Failed(marker) => {
                failed.insert(kind.clone(), extract_error_message(&marker.error));
            }
        }
    }

    let total = valid.len() + failed.len();
    let diagnostic = if valid.is_empty() {
        Some(VisualizationDiagnostic::AllFailed { total })
    } else if valid.len() < total {
        Some(VisualizationDiagnostic::Partial {
            available: valid.len(),
            total,
        })
    } else {
        None
    };

    NormalizedVisualizations {
        valid,
        failed,
        diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn figure(name: &str) -> Value {
        json!({"data": [{"type": "bar", "name": name}], "layout": {}})
    }

    fn set(value: Value) -> VisualizationSet {
        serde_json::from_value(value).unwrap()
    }

    // ------------------------------------------------------------------------
    // Error extraction, one test per payload shape
    // ------------------------------------------------------------------------

    #[test]
    fn test_extract_field_error_with_location() {
        let raw = json!([{"loc": ["x"], "msg": "required"}]);
        assert_eq!(extract_error_message(&raw), "x: required");
    }

    #[test]
    fn test_extract_field_error_list_joined() {
        let raw = json!([
            {"loc": ["body", "filename"], "msg": "field required", "type": "value_error.missing"},
            {"loc": ["body", 0], "msg": "not a number"},
            {"msg": "bad shape", "type": "type_error"},
            {"msg": "plain"},
            {"code": 7},
            "already text"
        ]);
        assert_eq!(
            extract_error_message(&raw),
            "body.filename: field required; body.0: not a number; type_error: bad shape; plain; {\"code\":7}; already text"
        );
    }

    #[test]
    fn test_extract_string() {
        assert_eq!(extract_error_message(&json!("Only CSV files are supported")), "Only CSV files are supported");
    }

    #[test]
    fn test_extract_object_message_before_error() {
        let raw = json!({"message": "from message", "error": "from error"});
        assert_eq!(extract_error_message(&raw), "from message");
        let raw = json!({"error": "from error"});
        assert_eq!(extract_error_message(&raw), "from error");
        let raw = json!({"error": {"message": "nested"}});
        assert_eq!(extract_error_message(&raw), "nested");
    }

    #[test]
    fn test_extract_skips_null_message() {
        let raw = json!({"message": null, "error": "boom"});
        assert_eq!(extract_error_message(&raw), "boom");
        let raw = json!({"message": null});
        assert_eq!(extract_error_message(&raw), "{\"message\":null}");
    }

    #[test]
    fn test_extract_literal_fallback() {
        assert_eq!(extract_error_message(&json!({"code": 500})), "{\"code\":500}");
        assert_eq!(extract_error_message(&json!(42)), "42");
        assert_eq!(extract_error_message(&Value::Null), "null");
    }

    // ------------------------------------------------------------------------
    // Visualization partitioning
    // ------------------------------------------------------------------------

    #[test]
    fn test_partial_failure_reports_ratio() {
        let normalized = normalize_visualizations(&set(json!({
            "a": figure("a"),
            "b": {"error": "x"}
        })));
        assert_eq!(normalized.valid.len(), 1);
        assert!(normalized.valid.contains_key(&ChartKind::from("a")));
        assert_eq!(normalized.failed[&ChartKind::from("b")], "x");
        let diagnostic = normalized.diagnostic.clone().unwrap();
        assert_eq!(diagnostic, VisualizationDiagnostic::Partial { available: 1, total: 2 });
        assert!(diagnostic.to_string().contains("1/2"));
        assert_eq!(normalized.summary().unwrap(), "1/2 charts available (b: x)");
    }

    #[test]
    fn test_all_failed() {
        let normalized = normalize_visualizations(&set(json!({
            "a": {"error": "x"},
            "b": {"error": "y"}
        })));
        assert!(normalized.valid.is_empty());
        assert_eq!(
            normalized.diagnostic,
            Some(VisualizationDiagnostic::AllFailed { total: 2 })
        );
        assert_eq!(
            normalized.diagnostic.unwrap().to_string(),
            "all visualizations failed"
        );
    }

    #[test]
    fn test_all_valid_has_no_diagnostic() {
        let normalized = normalize_visualizations(&set(json!({
            "a": figure("a"),
            "b": figure("b")
        })));
        assert_eq!(normalized.valid.len(), 2);
        assert!(normalized.failed.is_empty());
        assert_eq!(normalized.diagnostic, None);
        assert_eq!(normalized.summary(), None);
    }

    #[test]
    fn test_error_marker_with_figure_fields_still_fails() {
        let normalized = normalize_visualizations(&set(json!({
            "confusion_matrix": {"data": [], "layout": {}, "error": [{"loc": ["y_pred"], "msg": "empty"}]}
        })));
        assert_eq!(normalized.failed[&ChartKind::ConfusionMatrix], "y_pred: empty");
    }

    #[test]
    fn test_empty_set_is_all_failed() {
        let normalized = normalize_visualizations(&VisualizationSet::default());
        assert_eq!(
            normalized.diagnostic,
            Some(VisualizationDiagnostic::AllFailed { total: 0 })
        );
    }
}
