//! Entry, stop-loss, add-on and risk/reward levels.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, BarWindow};
use crate::indicators::{Indicator, Sma};
use crate::issue::safe_ratio;
use crate::patterns::PIVOT_ENTRY_BUFFER;

/// Stop placed under an entry when a rule puts it at or above the entry.
pub const STOP_CLAMP_RATIO: f64 = 0.93;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum EntryRule {
    /// Pivot of the first anchoring rule that fired, else `close * fallback_ratio`.
    FirstAnchor { fallback_ratio: f64 },
    /// Highest high of the last `lookback` bars.
    Pivot { lookback: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StopRule {
    /// `pivot * ratio` of the anchoring rule, else `close * fallback_ratio`.
    Anchor { fallback_ratio: f64 },
    /// Higher of the swing low and the moving average, unless that risks more
    /// than `max_risk_pct` of the close.
    SwingLowOrMa {
        swing_bars: usize,
        ma_period: usize,
        max_risk_pct: f64,
    },
    /// Higher of the moving average and `pivot * pivot_ratio`.
    MaOrPivot { ma_period: usize, pivot_ratio: f64 },
    BelowEntry { ratio: f64 },
}

fn default_target_gain_pct() -> f64 {
    20.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRules {
    pub entry: EntryRule,
    pub stop: StopRule,
    /// Multipliers of the entry price for scaling in.
    #[serde(default)]
    pub add_ons: Vec<f64>,
    /// Target used for risk/reward, as a gain above the pivot (or close).
    #[serde(default = "default_target_gain_pct")]
    pub target_gain_pct: f64,
}

/// Pivot and stop ratio recorded by the first anchoring rule to fire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub pivot: f64,
    pub stop_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevels {
    pub entry: f64,
    pub stop: f64,
    pub add_ons: Vec<f64>,
    pub risk_reward: Option<f64>,
    /// The rule's stop was at or above entry and was replaced.
    pub clamped: bool,
}

impl PriceRules {
    pub fn new(entry: EntryRule, stop: StopRule) -> Self {
        Self {
            entry,
            stop,
            add_ons: Vec::new(),
            target_gain_pct: default_target_gain_pct(),
        }
    }

    pub fn with_add_ons(mut self, add_ons: Vec<f64>) -> Self {
        self.add_ons = add_ons;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let window = match self.entry {
            EntryRule::Pivot { lookback } => lookback,
            EntryRule::FirstAnchor { .. } => 1,
        };
        let ma = match self.stop {
            StopRule::SwingLowOrMa {
                swing_bars,
                ma_period,
                ..
            } => swing_bars.min(ma_period),
            StopRule::MaOrPivot { ma_period, .. } => ma_period,
            _ => 1,
        };
        if window == 0 || ma == 0 {
            return Err("price rule windows must be >= 1".into());
        }
        Ok(())
    }

    /// Levels at the last bar; `None` when no positive finite entry exists.
    pub fn levels(&self, bars: &[Bar], anchor: Option<Anchor>) -> Option<PriceLevels> {
        let close = bars.last_close()?;
        let (entry, pivot) = match self.entry {
            EntryRule::FirstAnchor { fallback_ratio } => match anchor {
                Some(a) => (a.pivot * PIVOT_ENTRY_BUFFER, Some(a.pivot)),
                None => (close * fallback_ratio, None),
            },
            EntryRule::Pivot { lookback } => {
                let p = bars.tail(lookback).highest_high()?;
                (p * PIVOT_ENTRY_BUFFER, Some(p))
            }
        };
        if !(entry.is_finite() && entry > 0.0) {
            return None;
        }

        let stop = match self.stop {
            StopRule::Anchor { fallback_ratio } => {
                anchor.map_or(close * fallback_ratio, |a| a.pivot * a.stop_ratio)
            }
            StopRule::SwingLowOrMa {
                swing_bars,
                ma_period,
                max_risk_pct,
            } => {
                let swing = bars.tail(swing_bars).lowest_low()?;
                let candidate = Sma::new(ma_period)
                    .latest(bars)
                    .map_or(swing, |ma| swing.max(ma));
                let risk_pct = safe_ratio(close - candidate, close)? * 100.0;
                if risk_pct <= max_risk_pct {
                    candidate
                } else {
                    close * (1.0 - max_risk_pct / 100.0)
                }
            }
            StopRule::MaOrPivot {
                ma_period,
                pivot_ratio,
            } => {
                let floor = pivot.unwrap_or(close) * pivot_ratio;
                Sma::new(ma_period)
                    .latest(bars)
                    .map_or(floor, |ma| ma.max(floor))
            }
            StopRule::BelowEntry { ratio } => entry * ratio,
        };

        let clamped = !(stop < entry);
        let stop = if clamped { entry * STOP_CLAMP_RATIO } else { stop };

        let reference = pivot.unwrap_or(close);
        let reward_pct = (reference * (1.0 + self.target_gain_pct / 100.0) - entry) / entry * 100.0;
        let risk_pct = (entry - stop) / entry * 100.0;

        Some(PriceLevels {
            entry,
            stop,
            add_ons: self.add_ons.iter().map(|m| entry * m).collect(),
            risk_reward: safe_ratio(reward_pct, risk_pct),
            clamped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};
    use crate::patterns::test_bars::{flat, hlc};

    #[test]
    fn anchored_entry_and_stop() {
        let bars = hlc(&flat(10, 101.0, 99.0, 100.0));
        let rules = PriceRules::new(
            EntryRule::FirstAnchor { fallback_ratio: 1.02 },
            StopRule::Anchor { fallback_ratio: 0.93 },
        );
        let anchor = Anchor { pivot: 110.0, stop_ratio: 0.925 };
        let l = rules.levels(&bars, Some(anchor)).unwrap();
        assert_approx(l.entry, 110.11, 1e-9);
        assert_approx(l.stop, 101.75, 1e-9);
        assert!(!l.clamped);

        let l = rules.levels(&bars, None).unwrap();
        assert_approx(l.entry, 102.0, 1e-9);
        assert_approx(l.stop, 93.0, 1e-9);
    }

    #[test]
    fn pivot_entry_with_add_ons_and_risk_reward() {
        let bars = hlc(&flat(30, 100.0, 95.0, 98.0));
        let rules = PriceRules::new(
            EntryRule::Pivot { lookback: 30 },
            StopRule::BelowEntry { ratio: 0.93 },
        )
        .with_add_ons(vec![1.02, 1.03]);
        let l = rules.levels(&bars, None).unwrap();
        assert_approx(l.entry, 100.1, 1e-9);
        assert_approx(l.stop, 93.093, 1e-9);
        assert_approx(l.add_ons[0], 102.102, 1e-9);
        assert_approx(l.add_ons[1], 103.103, 1e-9);
        // (120 - 100.1) / 100.1 = 19.88%, risk 7%
        assert_approx(l.risk_reward.unwrap(), (19.9 / 100.1 * 100.0) / 7.0, 1e-9);
    }

    #[test]
    fn swing_low_stop_capped_at_max_risk() {
        // close 100, ten-bar low 80, short history so no MA: 20% risk -> 8% stop
        let mut rows = flat(9, 101.0, 99.0, 100.0);
        rows.push((101.0, 80.0, 100.0));
        let bars = hlc(&rows);
        let rules = PriceRules::new(
            EntryRule::Pivot { lookback: 10 },
            StopRule::SwingLowOrMa {
                swing_bars: 10,
                ma_period: 50,
                max_risk_pct: 8.0,
            },
        );
        let l = rules.levels(&bars, None).unwrap();
        assert_approx(l.stop, 92.0, 1e-9);

        // tight swing low is used as-is
        let bars = hlc(&flat(10, 101.0, 97.0, 100.0));
        let l = rules.levels(&bars, None).unwrap();
        assert_approx(l.stop, 97.0, 1e-9);
    }

    #[test]
    fn stop_at_or_above_entry_is_clamped() {
        // MA50 far above the pivot after a collapse
        let mut closes = vec![200.0; 60];
        closes.extend(vec![50.0; 15]);
        let bars = make_bars(&closes);
        let rules = PriceRules::new(
            EntryRule::Pivot { lookback: 10 },
            StopRule::MaOrPivot {
                ma_period: 50,
                pivot_ratio: 0.92,
            },
        );
        let l = rules.levels(&bars, None).unwrap();
        assert!(l.clamped);
        assert_approx(l.stop, l.entry * STOP_CLAMP_RATIO, 1e-9);
        assert!(l.stop < l.entry);
    }
}
