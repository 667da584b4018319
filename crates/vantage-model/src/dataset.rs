//! Raw dataset container and the forbidden-field gate.
//!
//! The core's correctness depends on one invariant the caller must enforce
//! before invoking compute: **derived fields never leak back into facts**.
//! A raw dataset that already contains `rankScore`, `issues`, `health`, etc.
//! has been round-tripped through a presentation layer and cannot be trusted
//! as ground truth. The gate here does a recursive key scan over the raw JSON
//! and reports every violation with its path; violations are collected, not
//! thrown, so callers can surface all of them at once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::facts::{Company, Investor, Person, Relationship, TeamMember};

/// Derived keys that must never appear in raw input.
pub const FORBIDDEN_FIELDS: &[&str] = &[
    "rankScore",
    "rankComponents",
    "rank",
    "health",
    "issues",
    "preIssues",
    "impact",
    "rippleScore",
    "trustRisk",
];

/// The immutable fact snapshot one compute invocation runs over.
///
/// Goals and deals are nested under their company; the remaining collections
/// are cross-company globals shared read-only by every per-company
/// evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub investors: Vec<Investor>,
    #[serde(default)]
    pub team: Vec<TeamMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DatasetError {
    /// A derived field was present in raw input.
    #[error("forbidden derived field `{field}` at `{path}`")]
    ForbiddenField { path: String, field: String },

    /// The raw JSON did not match the dataset contract.
    #[error("dataset shape error: {0}")]
    Shape(String),
}

/// Scan a raw JSON value for forbidden derived keys.
///
/// Returns every violation (empty vec means the gate passes). The scan is
/// recursive over objects and arrays; key comparison is exact (wire names
/// are camelCase).
pub fn forbidden_field_violations(raw: &Value) -> Vec<DatasetError> {
    let mut violations = Vec::new();
    scan(raw, "$", &mut violations);
    violations
}

fn scan(value: &Value, path: &str, out: &mut Vec<DatasetError>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if FORBIDDEN_FIELDS.contains(&key.as_str()) {
                    out.push(DatasetError::ForbiddenField {
                        path: path.to_string(),
                        field: key.clone(),
                    });
                }
                let child_path = format!("{path}.{key}");
                scan(child, &child_path, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let child_path = format!("{path}[{i}]");
                scan(child, &child_path, out);
            }
        }
        _ => {}
    }
}

/// Parse a raw JSON dataset, running the forbidden-field gate first.
///
/// Gate violations are returned as errors without attempting to parse: a
/// dataset that failed the gate is not a fact snapshot.
pub fn parse_dataset(raw: &Value) -> Result<Dataset, Vec<DatasetError>> {
    let violations = forbidden_field_violations(raw);
    if !violations.is_empty() {
        return Err(violations);
    }
    serde_json::from_value(raw.clone())
        .map_err(|e| vec![DatasetError::Shape(e.to_string())])
}
