//! Profile evaluation as a short-circuiting point accumulator.
//!
//! ```text
//! Start ──(enough bars)──▶ Gate(0) ─▶ Gate(1) ─▶ … ─▶ Scoring ─▶ Decision
//!   │                         │
//!   └─ insufficient data      └─ gate fails ──────────────────▶ Decision
//! ```
//!
//! Criteria and reasons only ever hold what actually ran, so a gate failure
//! is visible as the absence of every later check.

use chrono::NaiveDate;
use tracing::debug;

use super::pricing::Anchor;
use super::profile::{Gate, MissPolicy, ScoringRule, StrategyProfile};
use super::result::{Outcome, SignalResult};
use crate::domain::{Bar, CriterionResult};
use crate::issue::EngineIssue;
use crate::patterns::{Detector, MaAlignment, MarketDirection};
use crate::template::evaluate_template;

/// Per-date inputs an evaluation needs beyond the ticker's own bars.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalContext {
    pub rs_rating: Option<u8>,
    /// Benchmark direction at the same date; a weak market adds a warning.
    pub market: Option<MarketDirection>,
}

impl EvalContext {
    pub fn with_rs(rs_rating: Option<u8>) -> Self {
        Self {
            rs_rating,
            market: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Gate(usize),
    Scoring,
    Decision,
}

#[derive(Debug, Default)]
struct Accumulator {
    criteria: Vec<CriterionResult>,
    score: f64,
    reasons: Vec<String>,
    warnings: Vec<String>,
    pattern: Option<String>,
    anchor: Option<Anchor>,
}

impl Accumulator {
    fn apply_gate(&mut self, gate: &Gate, bars: &[Bar], rs_rating: Option<u8>) -> bool {
        match gate {
            Gate::RsRating { tiers } => {
                let Some(rs) = rs_rating else {
                    self.fail("rs_rating", None, "RS rating unavailable".into());
                    return false;
                };
                let tier = tiers
                    .iter()
                    .filter(|t| rs >= t.min)
                    .max_by_key(|t| t.min);
                match tier {
                    Some(t) => {
                        self.criteria.push(CriterionResult::new(
                            "rs_rating",
                            true,
                            Some(rs as f64),
                            format!("RS {rs} >= {}", t.min),
                        ));
                        self.award(format!("RS {rs}"), t.points);
                        true
                    }
                    None => {
                        let floor = tiers.iter().map(|t| t.min).min().unwrap_or(0);
                        self.fail("rs_rating", Some(rs as f64), format!("RS {rs} below {floor}"));
                        false
                    }
                }
            }
            Gate::TrendTemplate { variant, points } => {
                let t = evaluate_template(bars, *variant);
                self.criteria.extend(t.checks.iter().cloned());
                if t.stage2 {
                    self.reasons.push(format!("Trend template {}/8", t.checks_passed));
                    self.criteria.push(CriterionResult::new(
                        "stage2",
                        true,
                        Some(t.score),
                        "stage 2 uptrend",
                    ));
                    self.award("Stage 2 uptrend".into(), *points);
                    true
                } else {
                    self.fail(
                        "stage2",
                        Some(t.score),
                        format!("Stage 2 not met: trend template {}/8", t.checks_passed),
                    );
                    false
                }
            }
            Gate::MaAlignment => {
                let d = MaAlignment.detect(bars);
                let score = d.quality.unwrap_or(0.0);
                let passed = d.passed();
                self.criteria.push(d.criterion);
                if passed {
                    self.award("MA alignment".into(), score);
                } else {
                    self.reasons.push(format!("MA alignment {score}/100"));
                    self.warnings.push("wait for MA alignment".into());
                }
                passed
            }
        }
    }

    fn apply_rule(&mut self, rule: &ScoringRule, bars: &[Bar]) {
        let d = rule.check.detector().detect(bars);
        if let Some(caution) = &d.caution {
            self.warnings.push(caution.clone());
        }
        if d.passed() {
            let points = rule.award.points(&d);
            self.award(d.criterion.label.clone(), points);
            if self.pattern.is_none() {
                self.pattern = d.pattern.clone();
            }
            if self.anchor.is_none() {
                if let (Some(stop_ratio), Some(pivot)) = (rule.anchor_stop, d.pivot) {
                    self.anchor = Some(Anchor { pivot, stop_ratio });
                }
            }
        } else if rule.on_miss == MissPolicy::Warn {
            self.warnings.push(d.criterion.label.clone());
        }
        self.criteria.push(d.criterion);
    }

    fn award(&mut self, what: String, points: f64) {
        self.score += points;
        self.reasons.push(format!("{what} (+{points})"));
    }

    fn fail(&mut self, name: &str, value: Option<f64>, reason: String) {
        self.criteria
            .push(CriterionResult::new(name, false, value, reason.clone()));
        self.reasons.push(reason);
    }
}

impl StrategyProfile {
    /// Evaluate one ticker at `as_of`. Bars dated after `as_of` are ignored.
    pub fn evaluate(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        bars: &[Bar],
        ctx: &EvalContext,
    ) -> SignalResult {
        let bars = &bars[..bars.partition_point(|b| b.date <= as_of)];
        let mut acc = Accumulator::default();
        let mut outcome = Outcome::Scored;
        let mut phase = Phase::Start;

        loop {
            phase = match phase {
                Phase::Start => {
                    if bars.len() < self.min_bars {
                        return self.insufficient(ticker, as_of, bars.len(), ctx);
                    }
                    Phase::Gate(0)
                }
                Phase::Gate(i) => match self.gates.get(i) {
                    None => Phase::Scoring,
                    Some(gate) if acc.apply_gate(gate, bars, ctx.rs_rating) => Phase::Gate(i + 1),
                    Some(gate) => {
                        outcome = Outcome::GateFailed {
                            gate: gate.name().to_string(),
                        };
                        Phase::Decision
                    }
                },
                Phase::Scoring => {
                    for rule in &self.rules {
                        acc.apply_rule(rule, bars);
                    }
                    Phase::Decision
                }
                Phase::Decision => break,
            };
        }

        let scored = outcome == Outcome::Scored;
        let entry = scored && acc.score >= self.threshold;
        if scored {
            if let Some(labels) = &self.labels {
                acc.reasons
                    .insert(0, labels.label(acc.score, self.threshold).to_string());
            }
        }

        let levels = self.pricing.levels(bars, acc.anchor);
        if levels.as_ref().is_some_and(|l| l.clamped) {
            acc.warnings
                .push("stop at or above entry; placed 7% below entry".into());
        }
        if levels.is_none() {
            acc.warnings.push(
                EngineIssue::NumericDegenerate {
                    context: format!("{} price levels", self.id),
                }
                .to_string(),
            );
        }
        if let Some(m) = ctx.market.filter(|m| m.evaluated && !m.healthy) {
            acc.warnings.push(format!(
                "market in correction: index {:.2} vs MA50 {:.2} / MA200 {:.2}",
                m.close.unwrap_or(f64::NAN),
                m.ma50.unwrap_or(f64::NAN),
                m.ma200.unwrap_or(f64::NAN),
            ));
        }

        debug!(
            ticker,
            strategy = %self.id,
            score = acc.score,
            entry,
            "evaluated"
        );

        SignalResult {
            ticker: ticker.to_string(),
            as_of,
            strategy: self.id.clone(),
            criteria: acc.criteria,
            score: acc.score,
            entry,
            entry_price: levels.as_ref().map(|l| l.entry),
            stop_loss: levels.as_ref().map(|l| l.stop),
            add_on_prices: levels.as_ref().map(|l| l.add_ons.clone()).unwrap_or_default(),
            pattern: acc.pattern,
            reasons: acc.reasons,
            warnings: acc.warnings,
            rs_rating: ctx.rs_rating,
            risk_reward: levels.and_then(|l| l.risk_reward),
            outcome,
        }
    }

    fn insufficient(
        &self,
        ticker: &str,
        as_of: NaiveDate,
        have: usize,
        ctx: &EvalContext,
    ) -> SignalResult {
        let issue = EngineIssue::InsufficientHistory {
            check: self.id.clone(),
            needed: self.min_bars,
            have,
        };
        SignalResult {
            ticker: ticker.to_string(),
            as_of,
            strategy: self.id.clone(),
            criteria: Vec::new(),
            score: 0.0,
            entry: false,
            entry_price: None,
            stop_loss: None,
            add_on_prices: Vec::new(),
            pattern: None,
            reasons: vec!["insufficient data".to_string()],
            warnings: vec![issue.to_string()],
            rs_rating: ctx.rs_rating,
            risk_reward: None,
            outcome: Outcome::InsufficientData {
                needed: self.min_bars,
                have,
            },
        }
    }
}
