//! Base patterns: base-quality scoring, cup-with-handle and flat base.

use super::{range_pct, Detection, Detector};
use crate::domain::{Bar, BarWindow, CriterionResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseTier {
    Excellent,
    Good,
    TooShallow,
    TooDeep,
}

impl BaseTier {
    /// Depth 15-25% Excellent, 12-35% Good, shallower TooShallow, else TooDeep.
    pub fn classify(depth_pct: f64) -> Self {
        if (15.0..=25.0).contains(&depth_pct) {
            BaseTier::Excellent
        } else if (12.0..=35.0).contains(&depth_pct) {
            BaseTier::Good
        } else if depth_pct < 12.0 {
            BaseTier::TooShallow
        } else {
            BaseTier::TooDeep
        }
    }

    pub fn score(self) -> f64 {
        match self {
            BaseTier::Excellent => 90.0,
            BaseTier::Good => 70.0,
            BaseTier::TooShallow => 30.0,
            BaseTier::TooDeep => 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseQuality {
    /// Base window (25 bars, about five weeks).
    pub window: usize,
    /// Most recent stretch checked for tightness.
    pub tight_window: usize,
    pub tight_range_pct: f64,
    pub tight_bonus: f64,
    /// Score needed for the check to pass.
    pub min_score: f64,
}

impl Default for BaseQuality {
    fn default() -> Self {
        Self {
            window: 25,
            tight_window: 10,
            tight_range_pct: 5.0,
            tight_bonus: 10.0,
            min_score: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseQualityAnalysis {
    pub depth_pct: f64,
    pub tier: BaseTier,
    /// Range of the last `tight_window` bars relative to their low.
    pub tightness_pct: Option<f64>,
    pub score: f64,
    pub weeks: f64,
}

impl BaseQuality {
    /// `None` below the window length or for a zero base high.
    pub fn analyze(&self, bars: &[Bar]) -> Option<BaseQualityAnalysis> {
        if bars.len() < self.window {
            return None;
        }
        let base = bars.tail(self.window);
        let high = base.highest_high()?;
        let low = base.lowest_low()?;
        let depth_pct = range_pct(high, low, high)?;
        let tier = BaseTier::classify(depth_pct);

        let recent = base.tail(self.tight_window);
        let tightness_pct = range_pct(recent.highest_high()?, recent.lowest_low()?, recent.lowest_low()?);
        let mut score = tier.score();
        if tightness_pct.is_some_and(|t| t < self.tight_range_pct) {
            score += self.tight_bonus;
        }

        Some(BaseQualityAnalysis {
            depth_pct,
            tier,
            tightness_pct,
            score,
            weeks: self.window as f64 / 5.0,
        })
    }
}

impl Detector for BaseQuality {
    fn name(&self) -> &'static str {
        "base_quality"
    }

    fn min_bars(&self) -> usize {
        self.window
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        if bars.len() < self.window {
            return Detection::not_evaluated(self.name(), self.window, bars.len());
        }
        match self.analyze(bars) {
            Some(a) => Detection::new(CriterionResult::new(
                self.name(),
                a.score >= self.min_score,
                Some(a.score),
                format!(
                    "base {:?} (depth {:.1}%, {:.0} weeks)",
                    a.tier, a.depth_pct, a.weeks
                ),
            ))
            .with_quality(Some(a.score)),
            None => Detection::new(CriterionResult::new(
                self.name(),
                false,
                None,
                "degenerate base range",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CupWithHandle {
    pub lookback: usize,
    pub min_depth_pct: f64,
    pub max_depth_pct: f64,
    /// Close must be at least this fraction of the window high.
    pub min_close_to_high: f64,
}

impl Default for CupWithHandle {
    fn default() -> Self {
        Self {
            lookback: 60,
            min_depth_pct: 12.0,
            max_depth_pct: 33.0,
            min_close_to_high: 0.95,
        }
    }
}

impl Detector for CupWithHandle {
    fn name(&self) -> &'static str {
        "cup_with_handle"
    }

    fn min_bars(&self) -> usize {
        self.lookback
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        if bars.len() < self.lookback {
            return Detection::not_evaluated(self.name(), self.lookback, bars.len());
        }
        let window = bars.tail(self.lookback);
        let (Some(high), Some(low), Some(close)) =
            (window.highest_high(), window.lowest_low(), bars.last_close())
        else {
            return Detection::not_evaluated(self.name(), self.lookback, bars.len());
        };
        let depth = range_pct(high, low, high);
        let passed = depth.is_some_and(|d| (self.min_depth_pct..=self.max_depth_pct).contains(&d))
            && close >= high * self.min_close_to_high;
        let label = match depth {
            Some(d) => format!("cup depth {d:.1}%"),
            None => "degenerate cup range".to_string(),
        };
        let d = Detection::new(CriterionResult::new(self.name(), passed, depth, label));
        if passed {
            d.with_pivot(Some(high)).with_pattern("Cup with Handle")
        } else {
            d
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatBase {
    pub lookback: usize,
    /// Range relative to the window low.
    pub max_range_pct: f64,
    pub min_close_to_high: f64,
}

impl Default for FlatBase {
    fn default() -> Self {
        Self {
            lookback: 30,
            max_range_pct: 15.0,
            min_close_to_high: 0.95,
        }
    }
}

impl Detector for FlatBase {
    fn name(&self) -> &'static str {
        "flat_base"
    }

    fn min_bars(&self) -> usize {
        self.lookback
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        if bars.len() < self.lookback {
            return Detection::not_evaluated(self.name(), self.lookback, bars.len());
        }
        let window = bars.tail(self.lookback);
        let (Some(high), Some(low), Some(close)) =
            (window.highest_high(), window.lowest_low(), bars.last_close())
        else {
            return Detection::not_evaluated(self.name(), self.lookback, bars.len());
        };
        let range = range_pct(high, low, low);
        let passed =
            range.is_some_and(|r| r <= self.max_range_pct) && close >= high * self.min_close_to_high;
        let label = match range {
            Some(r) => format!("{r:.1}% range over {:.0} weeks", self.lookback as f64 / 5.0),
            None => "degenerate base range".to_string(),
        };
        let d = Detection::new(CriterionResult::new(self.name(), passed, range, label));
        if passed {
            d.with_pivot(Some(high)).with_pattern("Flat Base")
        } else {
            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_bars::{flat, hlc};

    #[test]
    fn tier_boundaries() {
        assert_eq!(BaseTier::classify(15.0), BaseTier::Excellent);
        assert_eq!(BaseTier::classify(25.0), BaseTier::Excellent);
        assert_eq!(BaseTier::classify(12.0), BaseTier::Good);
        assert_eq!(BaseTier::classify(35.0), BaseTier::Good);
        assert_eq!(BaseTier::classify(11.9), BaseTier::TooShallow);
        assert_eq!(BaseTier::classify(35.1), BaseTier::TooDeep);
    }

    #[test]
    fn excellent_base_with_tight_finish() {
        let mut rows = flat(15, 100.0, 80.0, 90.0); // depth 20%
        rows.extend(flat(10, 100.0, 97.0, 99.0)); // last 10: 3.1% range
        let a = BaseQuality::default().analyze(&hlc(&rows)).unwrap();
        assert_eq!(a.tier, BaseTier::Excellent);
        assert_eq!(a.score, 100.0);
        assert!(BaseQuality::default().detect(&hlc(&rows)).passed());
    }

    #[test]
    fn shallow_base_fails() {
        let rows = flat(25, 100.0, 97.0, 98.0);
        let d = BaseQuality::default().detect(&hlc(&rows));
        // 3% deep: too shallow (30) + tight bonus (10)
        assert_eq!(d.value(), Some(40.0));
        assert!(!d.passed());
    }

    #[test]
    fn cup_depth_and_proximity() {
        let mut rows = flat(40, 100.0, 80.0, 90.0); // 20% deep
        rows.extend(flat(20, 99.0, 96.0, 97.0));
        let d = CupWithHandle::default().detect(&hlc(&rows));
        assert!(d.passed());
        assert_eq!(d.pivot, Some(100.0));

        // same cup but close 10% under the high
        let n = rows.len();
        rows[n - 1] = (99.0, 89.0, 90.0);
        assert!(!CupWithHandle::default().detect(&hlc(&rows)).passed());
    }

    #[test]
    fn shallow_cup_is_not_a_cup() {
        let rows = flat(60, 100.0, 95.0, 99.0);
        let d = CupWithHandle::default().detect(&hlc(&rows));
        assert!(!d.passed());
        assert!((d.value().unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn flat_base_range_against_low() {
        let rows = flat(30, 114.0, 100.0, 112.0);
        let d = FlatBase::default().detect(&hlc(&rows));
        assert!((d.value().unwrap() - 14.0).abs() < 1e-9);
        assert!(d.passed());
        assert_eq!(d.pattern.as_deref(), Some("Flat Base"));

        let rows = flat(30, 116.0, 100.0, 112.0);
        assert!(!FlatBase::default().detect(&hlc(&rows)).passed());
    }

    #[test]
    fn short_windows_not_evaluated() {
        let rows = flat(24, 100.0, 90.0, 95.0);
        let bars = hlc(&rows);
        assert!(BaseQuality::default().analyze(&bars).is_none());
        assert!(FlatBase::default().detect(&bars).value().is_none());
        assert!(CupWithHandle::default().detect(&bars).value().is_none());
    }
}
