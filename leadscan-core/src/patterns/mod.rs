//! Pattern detectors.
//!
//! Each detector is a small parameter struct. `detect` reads only the bar
//! slice it is given (already truncated to the as-of date) and returns a
//! [`Detection`]; detectors also expose a typed `analyze` with their full
//! supporting metrics.

pub mod base;
pub mod flag;
pub mod pivot;
pub mod position;
pub mod vcp;
pub mod volume;

pub use base::{BaseQuality, BaseQualityAnalysis, BaseTier, CupWithHandle, FlatBase};
pub use flag::{HighTightFlag, HighTightFlagAnalysis};
pub use pivot::{PivotProximity, PivotProximityAnalysis};
pub use position::{
    market_direction, MaAlignment, MaAlignmentAnalysis, MarketDirection, NearYearHigh,
    YearPosition,
};
pub use vcp::{RangeBase, Vcp, VcpAnalysis, VcpQuality};
pub use volume::{
    BreakoutStrength, PivotVolume, VduBaseline, VolumeBreakout, VolumeBreakoutAnalysis,
    VolumeDryUp,
};

use crate::domain::{Bar, CriterionResult};

/// Multiplier applied to a pivot to place a breakout entry just above it.
pub const PIVOT_ENTRY_BUFFER: f64 = 1.001;

/// Outcome of one detector on one bar slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub criterion: CriterionResult,
    /// Breakout level the pattern defines, when it has one.
    pub pivot: Option<f64>,
    /// Detector-specific quality score (e.g. VCP tier score).
    pub quality: Option<f64>,
    /// Pattern classification for the signal, e.g. "VCP-4".
    pub pattern: Option<String>,
    /// Warning to surface even though the check did not pass.
    pub caution: Option<String>,
}

impl Detection {
    pub fn new(criterion: CriterionResult) -> Self {
        Self {
            criterion,
            pivot: None,
            quality: None,
            pattern: None,
            caution: None,
        }
    }

    pub fn not_evaluated(name: &str, needed: usize, have: usize) -> Self {
        Self::new(CriterionResult::not_evaluated(name, needed, have))
    }

    pub fn with_pivot(mut self, pivot: Option<f64>) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_quality(mut self, quality: Option<f64>) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_caution(mut self, caution: Option<String>) -> Self {
        self.caution = caution;
        self
    }

    pub fn passed(&self) -> bool {
        self.criterion.passed
    }

    pub fn value(&self) -> Option<f64> {
        self.criterion.value
    }
}

/// A single-ticker pattern check.
pub trait Detector: Send + Sync {
    /// Stable criterion name.
    fn name(&self) -> &'static str;

    /// Bars needed before the check is evaluated.
    fn min_bars(&self) -> usize;

    fn detect(&self, bars: &[Bar]) -> Detection;
}

/// Range of a window as a percentage of `base` (the window high or low).
pub(crate) fn range_pct(high: f64, low: f64, base: f64) -> Option<f64> {
    crate::issue::safe_ratio(high - low, base).map(|r| r * 100.0)
}
