//! Deterministic bar series for demos, tests and benchmarks.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::domain::Bar;

/// `n` weekday dates starting at `start` (or the next weekday after it).
pub fn trading_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(n)
        .collect()
}

pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or_default()
}

/// Bars on weekdays from [`default_start`], one per close, with a 1% band
/// and constant volume.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    trading_days(default_start(), closes.len())
        .into_iter()
        .zip(closes)
        .map(|(date, &c)| Bar::new(date, c, c * 1.01, c * 0.99, c, 1_000))
        .collect()
}

/// Geometric trend: `start * (1 + daily_pct / 100)^i`.
pub fn trend_bars(start: f64, daily_pct: f64, n: usize) -> Vec<Bar> {
    let step = 1.0 + daily_pct / 100.0;
    let closes: Vec<f64> = (0..n).map(|i| start * step.powi(i as i32)).collect();
    bars_from_closes(&closes)
}

/// A 300-bar market leader: a steady advance from 50 to 150 over 240 bars,
/// then a 60-bar base whose ranges contract (16 / 8 / 4 / 1.5 points)
/// closing at 152.5 just under its pivot.
pub fn leader_bars() -> Vec<Bar> {
    let closes: Vec<f64> = (0..240).map(|i| 50.0 + i as f64 * 100.0 / 239.0).collect();
    let base: [(usize, f64, f64, f64); 4] = [
        (20, 156.0, 140.0, 150.0),
        (15, 154.0, 146.0, 151.0),
        (10, 153.0, 149.0, 152.0),
        (15, 153.0, 151.5, 152.5),
    ];
    let mut bars = bars_from_closes(&closes);
    let dates = trading_days(default_start(), 300);
    for &(n, high, low, close) in &base {
        for _ in 0..n {
            let date = dates[bars.len()];
            bars.push(Bar::new(date, close, high, low, close, 1_000));
        }
    }
    bars
}

/// Bars on weekdays from [`default_start`] with explicit (high, low, close),
/// open = close and constant volume.
pub fn bars_from_hlc(rows: &[(f64, f64, f64)]) -> Vec<Bar> {
    trading_days(default_start(), rows.len())
        .into_iter()
        .zip(rows)
        .map(|(date, &(high, low, close))| Bar::new(date, close, high, low, close, 1_000))
        .collect()
}

/// 80 rows: flat at 100 through row 40, a run to 245 (high 250) at row 55,
/// then a flag with a 220 low and a final close of 240.
pub fn flag_rows() -> Vec<(f64, f64, f64)> {
    let mut rows = vec![(101.0, 99.0, 100.0); 41];
    for k in 0..14 {
        let c = 110.0 + k as f64 * 10.0;
        rows.push((c + 1.0, c - 1.0, c));
    }
    rows.push((250.0, 240.0, 245.0));
    rows.extend(vec![(245.0, 235.0, 240.0); 9]);
    rows.extend(vec![(238.0, 220.0, 230.0); 14]);
    rows.push((242.0, 225.0, 240.0));
    rows
}

/// A high-tight flag: 140% advance over 40 bars, 12% pullback from 250.
pub fn flag_bars() -> Vec<Bar> {
    bars_from_hlc(&flag_rows())
}

/// Overwrite volumes from the end; `volumes[last]` lands on the final bar.
pub fn with_tail_volumes(mut bars: Vec<Bar>, volumes: &[u64]) -> Vec<Bar> {
    let start = bars.len().saturating_sub(volumes.len());
    for (bar, &v) in bars[start..].iter_mut().zip(volumes) {
        bar.volume = v;
    }
    bars
}
