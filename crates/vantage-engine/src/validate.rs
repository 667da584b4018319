//! Validation failures for derived records.
//!
//! Out-of-bounds dimensions and empty explanations are **hard failures**:
//! they are collected into the compute result's `errors[]` (the computation
//! continues so partial output stays inspectable), and callers must treat a
//! non-empty error list as "do not trust this result".

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("{record}: `{field}` = {value} out of bounds [{min}, {max}]")]
    OutOfBounds {
        record: String,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{record}: explain must have {min}..={max} entries, found {found}")]
    ExplainCount {
        record: String,
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("{record}: explain entry {index} is empty")]
    EmptyExplainEntry { record: String, index: usize },
}

/// Check a numeric dimension against its documented bounds. `max` of
/// `f64::INFINITY` means unbounded above.
pub fn check_bounds(
    record: &str,
    field: &str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::OutOfBounds {
            record: record.to_string(),
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Check an explain array: entry count within `min..=max`, every entry
/// non-empty. Zero explanations fails validation, never defaults.
pub fn check_explain(
    record: &str,
    explain: &[String],
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if explain.len() < min || explain.len() > max {
        return Err(ValidationError::ExplainCount {
            record: record.to_string(),
            min,
            max,
            found: explain.len(),
        });
    }
    for (index, entry) in explain.iter().enumerate() {
        if entry.trim().is_empty() {
            return Err(ValidationError::EmptyExplainEntry {
                record: record.to_string(),
                index,
            });
        }
    }
    Ok(())
}
