//! Volume checks: dry-up before a breakout, expansion on it.

use super::{Detection, Detector};
use crate::domain::{Bar, BarWindow, CriterionResult};
use crate::issue::safe_ratio;
use serde::{Deserialize, Serialize};

/// What recent volume is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VduBaseline {
    /// The `lookback` bars immediately before the recent window.
    Preceding,
    /// Average over the trailing `bars`, recent window included.
    TrailingAverage { bars: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeDryUp {
    pub lookback: usize,
    pub baseline: VduBaseline,
    /// Flag when recent volume is below this percentage of the baseline.
    pub max_ratio_pct: f64,
    pub min_bars: usize,
}

impl Default for VolumeDryUp {
    fn default() -> Self {
        Self::preceding()
    }
}

impl VolumeDryUp {
    /// Last 10 bars under 70% of the 10 bars before them.
    pub fn preceding() -> Self {
        Self {
            lookback: 10,
            baseline: VduBaseline::Preceding,
            max_ratio_pct: 70.0,
            min_bars: 20,
        }
    }

    /// Last 10 bars under 50% of the 50-bar average.
    pub fn trailing() -> Self {
        Self {
            lookback: 10,
            baseline: VduBaseline::TrailingAverage { bars: 50 },
            max_ratio_pct: 50.0,
            min_bars: 60,
        }
    }

    fn required_bars(&self) -> usize {
        let base = match self.baseline {
            VduBaseline::Preceding => self.lookback * 2,
            VduBaseline::TrailingAverage { bars } => bars.max(self.lookback),
        };
        base.max(self.min_bars)
    }

    /// Recent volume as a percentage of the baseline.
    pub fn ratio_pct(&self, bars: &[Bar]) -> Option<f64> {
        if bars.len() < self.required_bars() {
            return None;
        }
        let recent = bars.tail(self.lookback).mean_volume()?;
        let baseline = match self.baseline {
            VduBaseline::Preceding => {
                let end = bars.len() - self.lookback;
                bars[end - self.lookback..end].mean_volume()?
            }
            VduBaseline::TrailingAverage { bars: n } => bars.tail(n).mean_volume()?,
        };
        safe_ratio(recent, baseline).map(|r| r * 100.0)
    }
}

impl Detector for VolumeDryUp {
    fn name(&self) -> &'static str {
        match self.baseline {
            VduBaseline::Preceding => "volume_dry_up",
            VduBaseline::TrailingAverage { .. } => "volume_dry_up_vs_average",
        }
    }

    fn min_bars(&self) -> usize {
        self.required_bars()
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        if bars.len() < self.required_bars() {
            return Detection::not_evaluated(self.name(), self.required_bars(), bars.len());
        }
        let ratio = self.ratio_pct(bars);
        let passed = ratio.is_some_and(|r| r < self.max_ratio_pct);
        let label = match ratio {
            Some(r) => format!("volume at {r:.0}% of baseline (< {:.0}%)", self.max_ratio_pct),
            None => "zero baseline volume".to_string(),
        };
        Detection::new(CriterionResult::new(self.name(), passed, ratio, label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakoutStrength {
    Strong,
    Moderate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBreakoutAnalysis {
    pub ratio: f64,
    pub price_up: bool,
    pub breakout: bool,
    pub strength: Option<BreakoutStrength>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeBreakout {
    pub avg_window: usize,
    pub min_ratio: f64,
    pub strong_ratio: f64,
    /// Ratios above this still break out but earn nothing and raise a warning.
    pub excessive_above: Option<f64>,
}

impl Default for VolumeBreakout {
    fn default() -> Self {
        Self {
            avg_window: 50,
            min_ratio: 1.5,
            strong_ratio: 2.0,
            excessive_above: None,
        }
    }
}

impl VolumeBreakout {
    pub fn with_min_ratio(mut self, min_ratio: f64) -> Self {
        self.min_ratio = min_ratio;
        self
    }

    pub fn with_excessive_above(mut self, ratio: f64) -> Self {
        self.excessive_above = Some(ratio);
        self
    }

    /// `None` below the averaging window or for a zero average.
    pub fn analyze(&self, bars: &[Bar]) -> Option<VolumeBreakoutAnalysis> {
        if bars.len() < self.avg_window.max(2) {
            return None;
        }
        let last = bars.last()?;
        let avg = bars.tail(self.avg_window).mean_volume()?;
        let ratio = safe_ratio(last.volume as f64, avg)?;
        let price_up = last.close > bars.close_back(1)?;
        let breakout = ratio >= self.min_ratio && price_up;
        let strength = breakout.then(|| {
            if ratio >= self.strong_ratio {
                BreakoutStrength::Strong
            } else {
                BreakoutStrength::Moderate
            }
        });
        Some(VolumeBreakoutAnalysis {
            ratio,
            price_up,
            breakout,
            strength,
        })
    }
}

impl Detector for VolumeBreakout {
    fn name(&self) -> &'static str {
        "volume_breakout"
    }

    fn min_bars(&self) -> usize {
        self.avg_window.max(2)
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        if bars.len() < self.min_bars() {
            return Detection::not_evaluated(self.name(), self.min_bars(), bars.len());
        }
        let Some(a) = self.analyze(bars) else {
            return Detection::new(CriterionResult::new(
                self.name(),
                false,
                None,
                "zero average volume",
            ));
        };
        let excessive = a.breakout && self.excessive_above.is_some_and(|x| a.ratio > x);
        let label = match (a.strength, excessive) {
            (_, true) => format!("volume {:.1}x average (excessive)", a.ratio),
            (Some(s), false) => format!("volume {:.1}x average ({s:?})", a.ratio),
            (None, false) if !a.price_up => format!("volume {:.1}x average, price not up", a.ratio),
            (None, false) => format!("volume {:.1}x average", a.ratio),
        };
        let caution = excessive.then(|| {
            format!(
                "volume {:.1}x average exceeds {:.1}x; breakout may be climactic",
                a.ratio,
                self.excessive_above.unwrap_or_default()
            )
        });
        Detection::new(CriterionResult::new(
            self.name(),
            a.breakout && !excessive,
            Some(a.ratio),
            label,
        ))
        .with_caution(caution)
    }
}

/// Volume confirmation at the pivot: close within `near_pct` of the pivot and
/// volume expanding against its average. The measured value is the volume
/// ratio, so profiles can award tiers (surge vs increase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivotVolume {
    pub pivot_lookback: usize,
    pub avg_window: usize,
    pub near_pct: f64,
    pub surge_ratio: f64,
    pub increase_ratio: f64,
}

impl Default for PivotVolume {
    fn default() -> Self {
        Self {
            pivot_lookback: 30,
            avg_window: 50,
            near_pct: 1.0,
            surge_ratio: 1.5,
            increase_ratio: 1.3,
        }
    }
}

impl Detector for PivotVolume {
    fn name(&self) -> &'static str {
        "pivot_breakout_volume"
    }

    fn min_bars(&self) -> usize {
        self.avg_window.max(self.pivot_lookback)
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        if bars.len() < self.min_bars() {
            return Detection::not_evaluated(self.name(), self.min_bars(), bars.len());
        }
        let pivot = bars.tail(self.pivot_lookback).highest_high();
        let close = bars.last_close();
        let ratio = bars
            .last()
            .zip(bars.tail(self.avg_window).mean_volume())
            .and_then(|(b, avg)| safe_ratio(b.volume as f64, avg));
        let near = match (pivot, close) {
            (Some(p), Some(c)) => safe_ratio((c - p).abs(), p).is_some_and(|d| d * 100.0 <= self.near_pct),
            _ => false,
        };

        let (passed, label) = match ratio {
            None => (false, "zero average volume".to_string()),
            Some(_) if !near => (false, "not at pivot".to_string()),
            Some(r) if r >= self.surge_ratio => (true, format!("volume surge {r:.1}x at pivot")),
            Some(r) if r >= self.increase_ratio => {
                (true, format!("volume increase {r:.1}x at pivot"))
            }
            Some(r) => (false, format!("volume {r:.1}x at pivot, no expansion")),
        };
        Detection::new(CriterionResult::new(self.name(), passed, ratio, label)).with_pivot(pivot)
    }
}
