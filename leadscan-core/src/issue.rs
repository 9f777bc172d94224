//! Engine issue taxonomy.
//!
//! None of these abort a batch. They are recovered where they occur and
//! surface as warnings on results, log lines, or entries on a rank table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineIssue {
    /// Series shorter than a check's minimum; the check reports "not evaluated".
    #[error("insufficient history for {check}: needs {needed} bars, have {have}")]
    InsufficientHistory {
        check: String,
        needed: usize,
        have: usize,
    },

    /// Zero or one eligible ticker in a ranking pass; the sole ticker gets 0.
    #[error("universe too small for ranking: {ranked} eligible ticker(s)")]
    UniverseTooSmall { ranked: usize },

    /// Ticker missing from the provider for an as-of date; left out of that date.
    #[error("data gap: no bars for {ticker} on or before {as_of}")]
    DataGap { ticker: String, as_of: NaiveDate },

    /// Division by a zero (or non-finite) baseline; the check fails.
    #[error("numeric degenerate value in {context}")]
    NumericDegenerate { context: String },
}

/// `numerator / denominator`, or `None` when the baseline is zero or the
/// result is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let r = numerator / denominator;
    r.is_finite().then_some(r)
}
