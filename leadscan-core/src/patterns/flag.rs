//! High-Tight-Flag: a doubling within eight weeks, then a shallow pullback.

use super::{range_pct, Detection, Detector};
use crate::domain::{Bar, BarWindow, CriterionResult};
use crate::issue::safe_ratio;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighTightFlag {
    /// Bars spanned by the gain measurement (base close is `gain_bars - 1` back).
    pub gain_bars: usize,
    pub min_gain_pct: f64,
    /// Window for the flag high (the pivot).
    pub high_window: usize,
    /// Window for the pullback low.
    pub low_window: usize,
    pub min_correction_pct: f64,
    pub max_correction_pct: f64,
    /// Close must be within this percentage of the flag high.
    pub max_below_high_pct: f64,
    pub min_bars: usize,
}

impl Default for HighTightFlag {
    fn default() -> Self {
        Self {
            gain_bars: 40,
            min_gain_pct: 100.0,
            high_window: 25,
            low_window: 15,
            min_correction_pct: 10.0,
            max_correction_pct: 25.0,
            max_below_high_pct: 15.0,
            min_bars: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighTightFlagAnalysis {
    pub gain_pct: Option<f64>,
    pub correction_pct: Option<f64>,
    pub flag_high: f64,
    pub confirmed: bool,
}

impl HighTightFlag {
    pub fn analyze(&self, bars: &[Bar]) -> Option<HighTightFlagAnalysis> {
        if bars.len() < self.min_bars.max(self.gain_bars).max(self.high_window) {
            return None;
        }
        let close = bars.last_close()?;
        let base = bars.close_back(self.gain_bars.saturating_sub(1))?;
        let gain_pct = safe_ratio(close - base, base).map(|r| r * 100.0);
        let flag_high = bars.tail(self.high_window).highest_high()?;
        let pullback_low = bars.tail(self.low_window).lowest_low()?;
        let correction_pct = range_pct(flag_high, pullback_low, flag_high);

        let confirmed = match (gain_pct, correction_pct) {
            (Some(gain), Some(corr)) => {
                gain >= self.min_gain_pct
                    && (self.min_correction_pct..=self.max_correction_pct).contains(&corr)
                    && close >= flag_high * (1.0 - self.max_below_high_pct / 100.0)
            }
            _ => false,
        };

        Some(HighTightFlagAnalysis {
            gain_pct,
            correction_pct,
            flag_high,
            confirmed,
        })
    }
}

impl Detector for HighTightFlag {
    fn name(&self) -> &'static str {
        "high_tight_flag"
    }

    fn min_bars(&self) -> usize {
        self.min_bars.max(self.gain_bars).max(self.high_window)
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        let Some(a) = self.analyze(bars) else {
            return Detection::not_evaluated(self.name(), self.min_bars(), bars.len());
        };
        let label = match (a.gain_pct, a.correction_pct) {
            (Some(g), Some(c)) => format!("{g:.0}% advance, {c:.1}% pullback"),
            _ => "degenerate price base".to_string(),
        };
        let d = Detection::new(CriterionResult::new(
            self.name(),
            a.confirmed,
            a.gain_pct,
            label,
        ));
        if a.confirmed {
            d.with_pivot(Some(a.flag_high)).with_pattern("High Tight Flag")
        } else {
            d
        }
    }
}
