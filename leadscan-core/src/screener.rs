//! Leading-stock screener: high-RS names with expanding volume near their highs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bar, BarWindow, TRADING_DAYS_PER_YEAR};
use crate::issue::safe_ratio;
use crate::ranking::RankTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub min_rs: u8,
    /// Minimum volume surge, in percent.
    pub min_volume_surge: f64,
    /// Require the close to be within 15% of the 52-week high.
    pub near_high: bool,
    pub recent_bars: usize,
    pub baseline_bars: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            min_rs: 80,
            min_volume_surge: 20.0,
            near_high: true,
            recent_bars: 20,
            baseline_bars: 60,
        }
    }
}

const NEAR_HIGH_RATIO: f64 = 0.85;
const RETURN_BARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Potential {
    High,
    Moderate,
    Steady,
}

impl Potential {
    pub fn classify(rs: u8, volume_surge: f64, price_strength: Option<f64>) -> Self {
        if rs >= 90 && volume_surge >= 50.0 && price_strength.unwrap_or(0.0) >= 60.0 {
            Potential::High
        } else if rs >= 85 && volume_surge >= 30.0 {
            Potential::Moderate
        } else {
            Potential::Steady
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenHit {
    pub ticker: String,
    pub rs_rating: u8,
    pub momentum: f64,
    pub volume_surge: f64,
    pub price_strength: Option<f64>,
    pub volatility: Option<f64>,
    pub close: f64,
    pub high_52w: Option<f64>,
    pub potential: Potential,
}

/// Percent change of the mean volume of the last `recent` bars over the
/// mean of the `baseline - recent` bars before them.
pub fn volume_surge(bars: &[Bar], recent: usize, baseline: usize) -> Option<f64> {
    if bars.len() < baseline || recent >= baseline {
        return None;
    }
    let end = bars.len() - recent;
    let recent_avg = bars.tail(recent).mean_volume()?;
    let base_avg = bars[bars.len() - baseline..end].mean_volume()?;
    safe_ratio(recent_avg - base_avg, base_avg).map(|r| r * 100.0)
}

/// Close-to-close returns inside the last `n` return slots. A series of
/// exactly `n` bars has no return for its first slot and yields `n - 1`.
fn daily_returns(bars: &[Bar], n: usize) -> Option<Vec<f64>> {
    if bars.len() < n.max(3) {
        return None;
    }
    bars.tail(n + 1)
        .windows(2)
        .map(|w| safe_ratio(w[1].close - w[0].close, w[0].close))
        .collect()
}

/// Annualised volatility of the last 20 daily returns (sample std), in percent.
pub fn volatility(bars: &[Bar]) -> Option<f64> {
    let returns = daily_returns(bars, RETURN_BARS)?;
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt() * (TRADING_DAYS_PER_YEAR as f64).sqrt() * 100.0)
}

/// Share of up days among the last 20, in percent.
pub fn price_strength(bars: &[Bar]) -> Option<f64> {
    let returns = daily_returns(bars, RETURN_BARS)?;
    let up = returns.iter().filter(|r| **r > 0.0).count();
    Some(up as f64 / RETURN_BARS as f64 * 100.0)
}

fn near_year_high(bars: &[Bar]) -> Option<f64> {
    if bars.len() < TRADING_DAYS_PER_YEAR {
        return None;
    }
    bars.tail(TRADING_DAYS_PER_YEAR).highest_high()
}

/// Screen ranked tickers. `lookup` returns the bars (already truncated to
/// the ranking date) for a ticker; tickers without bars are skipped.
pub fn screen<'a, F>(table: &RankTable, lookup: F, config: &ScreenerConfig) -> Vec<ScreenHit>
where
    F: Fn(&str) -> Option<&'a [Bar]>,
{
    let mut hits: Vec<ScreenHit> = table
        .entries()
        .iter()
        .filter(|e| e.rating >= config.min_rs)
        .filter_map(|e| {
            let bars = lookup(&e.ticker)?;
            let surge = volume_surge(bars, config.recent_bars, config.baseline_bars)?;
            if surge < config.min_volume_surge {
                return None;
            }
            let close = bars.last_close()?;
            let high_52w = near_year_high(bars);
            if config.near_high && !high_52w.is_some_and(|h| h > 0.0 && close / h >= NEAR_HIGH_RATIO)
            {
                return None;
            }
            let strength = price_strength(bars);
            Some(ScreenHit {
                ticker: e.ticker.clone(),
                rs_rating: e.rating,
                momentum: e.momentum,
                volume_surge: surge,
                price_strength: strength,
                volatility: volatility(bars),
                close,
                high_52w,
                potential: Potential::classify(e.rating, surge, strength),
            })
        })
        .collect();
    hits.sort_by(|a, b| b.rs_rating.cmp(&a.rs_rating).then_with(|| a.ticker.cmp(&b.ticker)));
    debug!(candidates = table.len(), hits = hits.len(), "screen complete");
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{trend_bars, with_tail_volumes};
    use crate::indicators::assert_approx;
    use crate::ranking::RsRanker;

    #[test]
    fn volume_surge_against_preceding_window() {
        let bars = with_tail_volumes(trend_bars(100.0, 0.1, 60), &[1_500; 20]);
        assert_approx(volume_surge(&bars, 20, 60).unwrap(), 50.0, 1e-9);
        assert!(volume_surge(&bars[..59], 20, 60).is_none());

        let zero = with_tail_volumes(trend_bars(100.0, 0.1, 60), &[0; 60]);
        assert!(volume_surge(&zero, 20, 60).is_none());
    }

    #[test]
    fn strength_and_volatility_of_steady_rise() {
        let bars = trend_bars(100.0, 1.0, 30);
        assert_eq!(price_strength(&bars), Some(100.0));
        // constant returns have zero dispersion
        assert!(volatility(&bars).unwrap() < 1e-9);
        assert!(price_strength(&bars[..19]).is_none());
        assert!(volatility(&bars[..19]).is_none());
    }

    #[test]
    fn twenty_bars_are_enough_for_strength() {
        let bars = trend_bars(100.0, 1.0, 20);
        // 19 up days; the first slot has no prior close
        assert_approx(price_strength(&bars).unwrap(), 95.0, 1e-9);
        assert!(volatility(&bars).unwrap() < 1e-9);
    }

    #[test]
    fn potential_tiers() {
        assert_eq!(Potential::classify(95, 60.0, Some(65.0)), Potential::High);
        assert_eq!(Potential::classify(95, 60.0, Some(50.0)), Potential::Moderate);
        assert_eq!(Potential::classify(86, 30.0, None), Potential::Moderate);
        assert_eq!(Potential::classify(84, 90.0, Some(90.0)), Potential::Steady);
    }

    #[test]
    fn screen_filters_and_sorts() {
        let mut series = Vec::new();
        for (i, t) in ["AAA", "BBB", "CCC", "DDD", "EEE"].iter().enumerate() {
            let bars = trend_bars(50.0, 0.05 * (i + 1) as f64, 300);
            // only the two strongest see a volume surge
            let bars = if i >= 3 {
                with_tail_volumes(bars, &[2_000; 20])
            } else {
                bars
            };
            series.push((t.to_string(), bars));
        }
        let table = RsRanker::new().rank(series.iter().map(|(t, b)| (t.as_str(), b.as_slice())));
        let lookup = |t: &str| {
            series
                .iter()
                .find(|(name, _)| name == t)
                .map(|(_, b)| b.as_slice())
        };
        let config = ScreenerConfig {
            min_rs: 60,
            ..ScreenerConfig::default()
        };
        let hits = screen(&table, lookup, &config);
        let names: Vec<&str> = hits.iter().map(|h| h.ticker.as_str()).collect();
        assert_eq!(names, vec!["EEE", "DDD"]);
        assert_eq!(hits[0].rs_rating, 80);
        assert_eq!(hits[1].rs_rating, 60);
        assert_approx(hits[0].volume_surge, 100.0, 1e-9);
        assert_eq!(hits[0].potential, Potential::Steady);
    }
}
