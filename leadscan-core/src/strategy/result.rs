//! SignalResult — one evaluation of one strategy for one ticker at one date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::CriterionResult;

/// How far an evaluation got before its decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Outcome {
    /// Series shorter than the profile minimum; nothing was evaluated.
    InsufficientData { needed: usize, have: usize },
    /// A mandatory gate failed; scoring never ran.
    GateFailed { gate: String },
    /// All gates passed and every scoring rule ran.
    Scored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub strategy: String,
    /// Every check that ran, in evaluation order.
    pub criteria: Vec<CriterionResult>,
    pub score: f64,
    pub entry: bool,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub add_on_prices: Vec<f64>,
    pub pattern: Option<String>,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
    pub rs_rating: Option<u8>,
    pub risk_reward: Option<f64>,
    pub outcome: Outcome,
}

impl SignalResult {
    pub fn is_insufficient(&self) -> bool {
        matches!(self.outcome, Outcome::InsufficientData { .. })
    }

    /// Name of the gate that stopped the evaluation, if any.
    pub fn failed_gate(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::GateFailed { gate } => Some(gate),
            _ => None,
        }
    }

    pub fn criterion(&self, name: &str) -> Option<&CriterionResult> {
        self.criteria.iter().find(|c| c.name == name)
    }

    /// Percent between entry and stop, when both are set.
    pub fn risk_pct(&self) -> Option<f64> {
        let (entry, stop) = (self.entry_price?, self.stop_loss?);
        crate::issue::safe_ratio(entry - stop, entry).map(|r| r * 100.0)
    }
}
