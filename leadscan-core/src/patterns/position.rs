//! Position of price within its 52-week range and against its averages.

use super::{Detection, Detector};
use crate::domain::{Bar, BarWindow, CriterionResult, TRADING_DAYS_PER_YEAR};
use crate::indicators::{Indicator, Sma};
use crate::issue::safe_ratio;
use crate::template::MA200_SLOPE_BARS;
use serde::{Deserialize, Serialize};

/// Close within `max_distance_pct` of the trailing-year high (all bars if
/// fewer than a year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearYearHigh {
    pub max_distance_pct: f64,
}

impl Default for NearYearHigh {
    fn default() -> Self {
        Self {
            max_distance_pct: 15.0,
        }
    }
}

impl Detector for NearYearHigh {
    fn name(&self) -> &'static str {
        "near_52w_high"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        let year = bars.tail(TRADING_DAYS_PER_YEAR);
        let distance = year
            .highest_high()
            .zip(bars.last_close())
            .and_then(|(high, close)| safe_ratio(high - close, high))
            .map(|r| r * 100.0);
        let Some(distance) = distance else {
            return Detection::not_evaluated(self.name(), 1, bars.len());
        };
        Detection::new(CriterionResult::new(
            self.name(),
            distance <= self.max_distance_pct,
            Some(distance),
            format!("{distance:.1}% below 52-week high"),
        ))
    }
}

/// Far enough off the 52-week low and close enough to the high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearPosition {
    pub min_gain_from_low_pct: f64,
    pub max_distance_from_high_pct: f64,
}

impl Default for YearPosition {
    fn default() -> Self {
        Self {
            min_gain_from_low_pct: 25.0,
            max_distance_from_high_pct: 25.0,
        }
    }
}

impl Detector for YearPosition {
    fn name(&self) -> &'static str {
        "52w_position"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        let year = bars.tail(TRADING_DAYS_PER_YEAR);
        let (Some(low), Some(high), Some(close)) =
            (year.lowest_low(), year.highest_high(), bars.last_close())
        else {
            return Detection::not_evaluated(self.name(), 1, bars.len());
        };
        // A zero low cannot anchor a gain; treat it as no gain.
        let gain = safe_ratio(close - low, low).map_or(0.0, |r| r * 100.0);
        let distance = safe_ratio(high - close, high).map(|r| r * 100.0);
        let passed = gain >= self.min_gain_from_low_pct
            && distance.is_some_and(|d| d <= self.max_distance_from_high_pct);
        Detection::new(CriterionResult::new(
            self.name(),
            passed,
            Some(gain),
            format!(
                "+{gain:.1}% from 52-week low, {:.1}% below high",
                distance.unwrap_or(f64::NAN)
            ),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaAlignmentAnalysis {
    pub close: f64,
    pub ma50: f64,
    pub ma150: f64,
    pub ma200: f64,
    pub ma200_rising: bool,
    /// 25 points per ordered pair and for a rising MA200.
    pub score: f64,
    pub aligned: bool,
}

/// close > MA50 > MA150 > MA200 with MA200 rising.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaAlignment;

impl MaAlignment {
    pub const MIN_BARS: usize = 200;
    pub const POINTS_PER_COMPONENT: f64 = 25.0;

    pub fn analyze(&self, bars: &[Bar]) -> Option<MaAlignmentAnalysis> {
        if bars.len() < Self::MIN_BARS {
            return None;
        }
        let close = bars.last_close()?;
        let ma50 = Sma::new(50).latest(bars)?;
        let ma150 = Sma::new(150).latest(bars)?;
        let sma200 = Sma::new(200);
        let ma200 = sma200.latest(bars)?;
        let ma200_rising = sma200
            .value_back(bars, MA200_SLOPE_BARS)
            .is_some_and(|past| ma200 > past);

        let components = [close > ma50, ma50 > ma150, ma150 > ma200, ma200_rising];
        let score = components.iter().filter(|c| **c).count() as f64 * Self::POINTS_PER_COMPONENT;
        Some(MaAlignmentAnalysis {
            close,
            ma50,
            ma150,
            ma200,
            ma200_rising,
            score,
            aligned: components.iter().all(|c| *c),
        })
    }
}

impl Detector for MaAlignment {
    fn name(&self) -> &'static str {
        "ma_alignment"
    }

    fn min_bars(&self) -> usize {
        Self::MIN_BARS
    }

    fn detect(&self, bars: &[Bar]) -> Detection {
        match self.analyze(bars) {
            Some(a) => Detection::new(CriterionResult::new(
                self.name(),
                a.aligned,
                Some(a.score),
                format!(
                    "close {:.2} / MA50 {:.2} / MA150 {:.2} / MA200 {:.2}{}",
                    a.close,
                    a.ma50,
                    a.ma150,
                    a.ma200,
                    if a.ma200_rising { " rising" } else { "" }
                ),
            ))
            .with_quality(Some(a.score)),
            None => Detection::not_evaluated(self.name(), Self::MIN_BARS, bars.len()),
        }
    }
}

/// Broad-market trend read from an index series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketDirection {
    pub evaluated: bool,
    /// Index above its MA50 and MA50 above MA200.
    pub healthy: bool,
    pub close: Option<f64>,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
}

/// Market direction at the last bar of an index series (needs 200 bars).
pub fn market_direction(index: &[Bar]) -> MarketDirection {
    let levels = (index.len() >= 200)
        .then(|| {
            Some((
                index.last_close()?,
                Sma::new(50).latest(index)?,
                Sma::new(200).latest(index)?,
            ))
        })
        .flatten();
    match levels {
        Some((close, ma50, ma200)) => MarketDirection {
            evaluated: true,
            healthy: close > ma50 && ma50 > ma200,
            close: Some(close),
            ma50: Some(ma50),
            ma200: Some(ma200),
        },
        None => MarketDirection {
            evaluated: false,
            healthy: false,
            close: None,
            ma50: None,
            ma200: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use crate::patterns::test_bars::{flat, hlc};

    #[test]
    fn near_high_uses_available_history() {
        let mut rows = flat(30, 100.0, 90.0, 95.0);
        rows.push((92.0, 86.0, 87.0)); // 13% below 100
        let d = NearYearHigh::default().detect(&hlc(&rows));
        assert!(d.passed());
        assert!((d.value().unwrap() - 13.0).abs() < 1e-9);
    }

    #[test]
    fn near_high_ignores_highs_older_than_a_year() {
        let mut rows = flat(10, 200.0, 190.0, 195.0);
        rows.extend(flat(252, 100.0, 95.0, 99.0));
        assert!(NearYearHigh::default().detect(&hlc(&rows)).passed());
    }

    #[test]
    fn year_position() {
        let mut rows = flat(100, 82.0, 80.0, 81.0);
        rows.extend(flat(100, 122.0, 110.0, 120.0));
        let d = YearPosition::default().detect(&hlc(&rows));
        // gain from 80: 50%; 1.6% below 122
        assert!(d.passed());
        assert!((d.value().unwrap() - 50.0).abs() < 1e-9);

        let mut rows = flat(100, 100.0, 90.0, 95.0);
        rows.push((101.0, 99.0, 100.0));
        assert!(!YearPosition::default().detect(&hlc(&rows)).passed());
    }

    #[test]
    fn alignment_full_score_in_uptrend() {
        let closes: Vec<f64> = (0..260).map(|i| 50.0 + i as f64).collect();
        let a = MaAlignment.analyze(&make_bars(&closes)).unwrap();
        assert!(a.aligned);
        assert_eq!(a.score, 100.0);
    }

    #[test]
    fn alignment_partial_score() {
        // rise then flat: MA50 = close, so close > MA50 fails
        let mut closes: Vec<f64> = (0..260).map(|i| 50.0 + i as f64).collect();
        for c in closes.iter_mut().skip(200) {
            *c = 249.0;
        }
        let a = MaAlignment.analyze(&make_bars(&closes)).unwrap();
        assert!(!a.aligned);
        assert_eq!(a.score, 75.0);
        assert!(MaAlignment.analyze(&make_bars(&closes[..199])).is_none());
    }

    #[test]
    fn market_direction_reads_index_trend() {
        let up: Vec<f64> = (0..250).map(|i| 1000.0 + i as f64).collect();
        let m = market_direction(&make_bars(&up));
        assert!(m.evaluated && m.healthy);

        let down: Vec<f64> = (0..250).map(|i| 2000.0 - i as f64).collect();
        let m = market_direction(&make_bars(&down));
        assert!(m.evaluated && !m.healthy);

        let m = market_direction(&make_bars(&up[..150]));
        assert!(!m.evaluated && !m.healthy);
    }
}
