//! Pivot proximity: how far the close sits below the recent high.

use super::{Detection, Detector};
use crate::domain::{Bar, BarWindow, CriterionResult};
use crate::issue::safe_ratio;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotProximity {
    /// Bars the pivot high is taken over (10-30 across strategies).
    pub lookback: usize,
    pub max_distance_pct: f64,
}

impl Default for PivotProximity {
    fn default() -> Self {
        Self {
            lookback: 10,
            max_distance_pct: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotProximityAnalysis {
    pub pivot: f64,
    pub distance_pct: f64,
    pub near: bool,
}

impl PivotProximity {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "pivot lookback must be >= 1");
        Self {
            lookback,
            ..Self::default()
        }
    }

    /// Highest high over the lookback.
    pub fn pivot(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < self.lookback {
            return None;
        }
        bars.tail(self.lookback).highest_high()
    }

    pub fn analyze(&self, bars: &[Bar]) -> Option<PivotProximityAnalysis> {
        let pivot = self.pivot(bars)?;
        let close = bars.last_close()?;
        let distance_pct = safe_ratio(pivot - close, pivot)? * 100.0;
        Some(PivotProximityAnalysis {
            pivot,
            distance_pct,
            near: distance_pct <= self.max_distance_pct,
        })
    }
}

impl Detector for PivotProximity {
    fn name(&self) -> &'static str {
        "pivot_proximity"
    }

    fn min_bars(&self) -> usize {
        self.lookback
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        if bars.len() < self.lookback {
            return Detection::not_evaluated(self.name(), self.lookback, bars.len());
        }
        match self.analyze(bars) {
            Some(a) => Detection::new(CriterionResult::new(
                self.name(),
                a.near,
                Some(a.distance_pct),
                format!(
                    "{:.1}% below {}-bar pivot {:.2}",
                    a.distance_pct, self.lookback, a.pivot
                ),
            ))
            .with_pivot(Some(a.pivot)),
            None => Detection::new(CriterionResult::new(
                self.name(),
                false,
                None,
                "zero pivot",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_bars::{flat, hlc};

    #[test]
    fn near_pivot_within_one_percent() {
        let mut rows = flat(9, 100.0, 95.0, 97.0);
        rows.push((99.5, 98.0, 99.2));
        let a = PivotProximity::new(10).analyze(&hlc(&rows)).unwrap();
        assert_eq!(a.pivot, 100.0);
        assert!((a.distance_pct - 0.8).abs() < 1e-9);
        assert!(a.near);
    }

    #[test]
    fn far_from_pivot() {
        let mut rows = flat(9, 100.0, 95.0, 97.0);
        rows.push((98.0, 96.0, 97.0));
        let d = PivotProximity::new(10).detect(&hlc(&rows));
        assert!(!d.passed());
        // pivot is still reported
        assert_eq!(d.pivot, Some(100.0));
    }

    #[test]
    fn lookback_selects_window() {
        let mut rows = flat(5, 120.0, 100.0, 110.0);
        rows.extend(flat(15, 100.0, 95.0, 99.5));
        let bars = hlc(&rows);
        assert_eq!(PivotProximity::new(15).pivot(&bars), Some(100.0));
        assert_eq!(PivotProximity::new(20).pivot(&bars), Some(120.0));
        assert_eq!(PivotProximity::new(30).pivot(&bars), None);
    }
}
