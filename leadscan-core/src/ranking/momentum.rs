//! Multi-horizon price momentum.

use crate::domain::{Bar, BarWindow};
use crate::issue::safe_ratio;
use std::collections::BTreeMap;

/// Quarter boundaries in trading days: 3, 6, 9 and 12 months.
pub const HORIZONS: [usize; 4] = [63, 126, 189, 252];

/// Weight of each quarter's incremental return, most recent first.
pub const QUARTER_WEIGHTS: [f64; 4] = [0.4, 0.2, 0.2, 0.2];

/// Short-term horizons reported alongside the rating.
pub const RECENT_PERIODS: [usize; 3] = [5, 20, 60];

/// Percent change of close over the trailing `period` bars.
///
/// The base is the close `period - 1` bars before the last, so `period` bars
/// span the measurement. `None` with fewer than `period` bars or a zero base.
pub fn price_performance(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let current = bars.last_close()?;
    let base = bars.close_back(period - 1)?;
    safe_ratio(current - base, base).map(|r| r * 100.0)
}

/// Weighted momentum: 0.4 of the last quarter plus 0.2 of each earlier
/// quarter's incremental return. Requires a full year of bars.
pub fn weighted_momentum(bars: &[Bar]) -> Option<f64> {
    if bars.len() < HORIZONS[3] {
        return None;
    }
    let mut cumulative = [0.0; 4];
    for (slot, &h) in cumulative.iter_mut().zip(HORIZONS.iter()) {
        *slot = price_performance(bars, h)?;
    }
    let quarters = [
        cumulative[0],
        cumulative[1] - cumulative[0],
        cumulative[2] - cumulative[1],
        cumulative[3] - cumulative[2],
    ];
    Some(
        quarters
            .iter()
            .zip(QUARTER_WEIGHTS.iter())
            .map(|(q, w)| q * w)
            .sum(),
    )
}

/// Performance over each of `periods`, keyed "5D", "20D", ...
///
/// Periods the series is too short for are omitted.
pub fn recent_momentum(bars: &[Bar], periods: &[usize]) -> BTreeMap<String, f64> {
    periods
        .iter()
        .filter_map(|&p| price_performance(bars, p).map(|v| (format!("{p}D"), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn performance_spans_period_bars() {
        // 3 bars: base is the first close
        let bars = make_bars(&[100.0, 105.0, 120.0]);
        assert_approx(price_performance(&bars, 3).unwrap(), 20.0, 1e-10);
        assert_approx(price_performance(&bars, 2).unwrap(), 120.0 / 105.0 * 100.0 - 100.0, 1e-10);
        assert!(price_performance(&bars, 4).is_none());
        assert!(price_performance(&bars, 0).is_none());
    }

    #[test]
    fn zero_base_is_degenerate() {
        let bars = make_bars(&[0.0, 1.0]);
        assert!(price_performance(&bars, 2).is_none());
    }

    #[test]
    fn weighted_momentum_needs_full_year() {
        let bars = make_bars(&vec![100.0; 251]);
        assert!(weighted_momentum(&bars).is_none());
    }

    #[test]
    fn weighted_momentum_only_recent_move() {
        // flat year then +10% on the last bar: every horizon sees +10, so only
        // the first quarter contributes: 0.4 * 10 = 4
        let mut closes = vec![100.0; 252];
        closes[251] = 110.0;
        let bars = make_bars(&closes);
        assert_approx(weighted_momentum(&bars).unwrap(), 4.0, 1e-10);
    }

    #[test]
    fn weighted_momentum_quarter_increments() {
        // Base closes at the four horizons, newest last:
        // close[-252]=100, close[-189]=110, close[-126]=120, close[-63]=150, now 200
        let mut closes = vec![100.0; 252];
        for c in closes.iter_mut().skip(252 - 189) {
            *c = 110.0;
        }
        for c in closes.iter_mut().skip(252 - 126) {
            *c = 120.0;
        }
        for c in closes.iter_mut().skip(252 - 63) {
            *c = 150.0;
        }
        closes[251] = 200.0;
        let bars = make_bars(&closes);

        let p1 = (200.0 / 150.0 - 1.0) * 100.0;
        let p2 = (200.0 / 120.0 - 1.0) * 100.0;
        let p3 = (200.0 / 110.0 - 1.0) * 100.0;
        let p4 = 100.0;
        let expected = 0.4 * p1 + 0.2 * (p2 - p1) + 0.2 * (p3 - p2) + 0.2 * (p4 - p3);
        assert_approx(weighted_momentum(&bars).unwrap(), expected, 1e-9);
    }

    #[test]
    fn recent_momentum_skips_short_horizons() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let m = recent_momentum(&bars, &RECENT_PERIODS);
        assert!(m.contains_key("5D"));
        assert!(m.contains_key("20D"));
        assert!(!m.contains_key("60D"));
        assert_approx(m["5D"], (129.0 / 125.0 - 1.0) * 100.0, 1e-10);
    }
}
