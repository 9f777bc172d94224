//! Volatility Contraction Pattern.
//!
//! The high-low range is measured over nested trailing windows of decreasing
//! length. The pattern is confirmed when each range is strictly smaller than
//! the one before and the last is tighter than the variant's limit.

use super::{range_pct, Detection, Detector};
use crate::domain::{Bar, BarWindow, CriterionResult};
use serde::{Deserialize, Serialize};

/// Which end of the window a range is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBase {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VcpQuality {
    Excellent,
    Good,
    Fair,
}

impl VcpQuality {
    /// Tier of a final range: <4% Excellent, <6% Good, <8% Fair.
    pub fn classify(final_range_pct: f64) -> Option<Self> {
        if final_range_pct < 4.0 {
            Some(VcpQuality::Excellent)
        } else if final_range_pct < 6.0 {
            Some(VcpQuality::Good)
        } else if final_range_pct < 8.0 {
            Some(VcpQuality::Fair)
        } else {
            None
        }
    }

    pub fn score(self) -> f64 {
        match self {
            VcpQuality::Excellent => 95.0,
            VcpQuality::Good => 80.0,
            VcpQuality::Fair => 65.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VcpQuality::Excellent => "Excellent",
            VcpQuality::Good => "Good",
            VcpQuality::Fair => "Fair",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VcpAnalysis {
    /// Range percentage per window, longest window first.
    pub contractions: Vec<f64>,
    pub confirmed: bool,
    pub quality: Option<VcpQuality>,
}

impl VcpAnalysis {
    pub fn final_range(&self) -> Option<f64> {
        self.contractions.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vcp {
    pub windows: Vec<usize>,
    pub range_base: RangeBase,
    pub max_final_range_pct: f64,
    pub min_bars: usize,
}

impl Default for Vcp {
    fn default() -> Self {
        Self::detailed()
    }
}

impl Vcp {
    /// Three windows (30/20/10) measured against the low, final range < 5%.
    pub fn basic() -> Self {
        Self {
            windows: vec![30, 20, 10],
            range_base: RangeBase::Low,
            max_final_range_pct: 5.0,
            min_bars: 60,
        }
    }

    /// Four windows (60/40/25/15) measured against the high, final range < 8%.
    pub fn detailed() -> Self {
        Self {
            windows: vec![60, 40, 25, 15],
            range_base: RangeBase::High,
            max_final_range_pct: 8.0,
            min_bars: 120,
        }
    }

    fn required_bars(&self) -> usize {
        self.windows
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.min_bars)
    }

    /// `None` below the minimum history.
    pub fn analyze(&self, bars: &[Bar]) -> Option<VcpAnalysis> {
        if bars.len() < self.required_bars() || self.windows.is_empty() {
            return None;
        }

        let contractions: Option<Vec<f64>> = self
            .windows
            .iter()
            .map(|&w| {
                let window = bars.tail(w);
                let high = window.highest_high()?;
                let low = window.lowest_low()?;
                let base = match self.range_base {
                    RangeBase::High => high,
                    RangeBase::Low => low,
                };
                range_pct(high, low, base)
            })
            .collect();

        let Some(contractions) = contractions else {
            return Some(VcpAnalysis {
                contractions: Vec::new(),
                confirmed: false,
                quality: None,
            });
        };

        let contracting = contractions.windows(2).all(|p| p[0] > p[1]);
        let last = contractions[contractions.len() - 1];
        let quality = VcpQuality::classify(last);
        let confirmed = contractions.len() >= 2
            && contracting
            && last < self.max_final_range_pct
            && quality.is_some();

        Some(VcpAnalysis {
            contractions,
            confirmed,
            quality: if confirmed { quality } else { None },
        })
    }
}

impl Detector for Vcp {
    fn name(&self) -> &'static str {
        "vcp"
    }

    fn min_bars(&self) -> usize {
        self.required_bars()
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        let Some(a) = self.analyze(bars) else {
            return Detection::not_evaluated(self.name(), self.min_bars(), bars.len());
        };
        let ranges = a
            .contractions
            .iter()
            .map(|c| format!("{c:.1}%"))
            .collect::<Vec<_>>()
            .join(" > ");
        let label = match a.quality {
            Some(q) if a.confirmed => format!(
                "VCP {} ({} stages, {ranges})",
                q.as_str(),
                a.contractions.len()
            ),
            _ => format!("no contraction ({ranges})"),
        };
        let mut d = Detection::new(CriterionResult::new(
            self.name(),
            a.confirmed,
            a.final_range(),
            label,
        ))
        .with_quality(a.quality.map(VcpQuality::score));
        if a.confirmed {
            d = d.with_pattern(format!("VCP-{}", a.contractions.len()));
        }
        d
    }
}
