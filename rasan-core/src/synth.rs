//! Prediction input synthesis.
//!
//! The editable input for a trained model has exactly one entry per dataset
//! column except the target. [`PredictionInputState`] keeps user edits while
//! the (columns, target) pair is unchanged and rebuilds from scratch when it
//! changes.

use crate::entities::PredictionInput;
use crate::error::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Build a fresh input with every non-target column set to zero.
pub fn synthesize_prediction_input(
    columns: &[String],
    target: &str,
) -> PipelineResult<PredictionInput> {
    if target.trim().is_empty() {
        return Err(PipelineError::invalid("target_column", "target column is empty"));
    }
    if !columns.iter().any(|c| c == target) {
        return Err(PipelineError::invalid(
            "target_column",
            format!("'{}' is not a dataset column", target),
        ));
    }

    let values: BTreeMap<String, f64> = columns
        .iter()
        .filter(|c| c.as_str() != target)
        .map(|c| (c.clone(), 0.0))
        .collect();
    Ok(PredictionInput(values))
}

/// Stable digest of the inputs the synthesized mapping depends on.
pub fn input_fingerprint(columns: &[String], target: &str) -> String {
    let mut hasher = Sha256::new();
    for column in columns {
        hasher.update(column.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update([0xffu8]);
    hasher.update(target.as_bytes());
    hex::encode(hasher.finalize())
}

/// Lenient numeric parse for user-entered values.
///
/// Uses the longest numeric prefix of the trimmed text; anything without one,
/// or a non-finite result, becomes `0`.
pub fn parse_input_value(text: &str) -> f64 {
    let trimmed = text.trim();
    let mut ends: Vec<usize> = trimmed
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .collect();
    ends.reverse();
    ends.into_iter()
        .filter_map(|end| trimmed[..end].parse::<f64>().ok())
        .find(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Prediction input plus the fingerprint it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInputState {
    pub fingerprint: String,
    pub input: PredictionInput,
}

impl PredictionInputState {
    pub fn build(columns: &[String], target: &str) -> PipelineResult<Self> {
        Ok(Self {
            fingerprint: input_fingerprint(columns, target),
            input: synthesize_prediction_input(columns, target)?,
        })
    }

    /// Bring the state in line with `(columns, target)`.
    ///
    /// Returns `true` when the mapping was rebuilt. On error the state is
    /// left untouched.
    pub fn sync(&mut self, columns: &[String], target: &str) -> PipelineResult<bool> {
        let fingerprint = input_fingerprint(columns, target);
        if fingerprint == self.fingerprint {
            return Ok(false);
        }
        let input = synthesize_prediction_input(columns, target)?;
        self.fingerprint = fingerprint;
        self.input = input;
        Ok(true)
    }

    /// Overwrite a single column. Unknown columns are rejected.
    pub fn set_value(&mut self, column: &str, value: f64) -> PipelineResult<()> {
        match self.input.0.get_mut(column) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PipelineError::invalid(
                "column",
                format!("'{}' is not a model input", column),
            )),
        }
    }
}
