//! CriterionResult — the atomic output of every check.

use serde::{Deserialize, Serialize};

/// One evaluated check: stable name, outcome, the measured value it was
/// decided on, and a human-readable label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub name: String,
    pub passed: bool,
    pub value: Option<f64>,
    pub label: String,
}

impl CriterionResult {
    pub fn new(
        name: impl Into<String>,
        passed: bool,
        value: Option<f64>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed,
            value,
            label: label.into(),
        }
    }

    /// A check that could not run because the series is too short.
    pub fn not_evaluated(name: impl Into<String>, needed: usize, have: usize) -> Self {
        Self {
            name: name.into(),
            passed: false,
            value: None,
            label: format!("not evaluated: needs {needed} bars, have {have}"),
        }
    }
}
