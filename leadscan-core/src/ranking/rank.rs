//! Cross-sectional percentile ranking of weighted momentum.

use super::momentum::{weighted_momentum, HORIZONS};
use crate::domain::Bar;
use crate::issue::EngineIssue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Highest rating a ticker can receive.
pub const MAX_RATING: u8 = 99;

/// One ranked ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub ticker: String,
    pub momentum: f64,
    pub rating: u8,
}

/// Counts of ratings at the usual leadership cut-offs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSummary {
    pub ranked: usize,
    pub ineligible: usize,
    pub at_least_90: usize,
    pub at_least_80: usize,
    pub at_least_70: usize,
}

/// Output of one ranking pass.
///
/// Tickers without a full year of usable history are listed as ineligible
/// and have no rating; that is distinct from a rating of 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankTable {
    entries: Vec<RankEntry>,
    ratings: BTreeMap<String, u8>,
    ineligible: Vec<String>,
    issues: Vec<EngineIssue>,
}

impl RankTable {
    pub fn get(&self, ticker: &str) -> Option<u8> {
        self.ratings.get(ticker).copied()
    }

    /// Entries sorted by rating (then momentum) descending, ticker ascending on ties.
    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }

    /// The ticker → rating map handed to downstream consumers.
    pub fn ratings(&self) -> &BTreeMap<String, u8> {
        &self.ratings
    }

    pub fn ineligible(&self) -> &[String] {
        &self.ineligible
    }

    pub fn issues(&self) -> &[EngineIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> RankSummary {
        let count = |min: u8| self.entries.iter().filter(|e| e.rating >= min).count();
        RankSummary {
            ranked: self.entries.len(),
            ineligible: self.ineligible.len(),
            at_least_90: count(90),
            at_least_80: count(80),
            at_least_70: count(70),
        }
    }
}

/// Percentile of `momentum` within `sorted` (ascending): the share of values
/// strictly below it, floored and capped at 99.
///
/// Integer arithmetic keeps the floor exact (0.29 * 100 is 28.999... in f64).
pub fn percentile_rating(momentum: f64, sorted: &[f64]) -> u8 {
    if sorted.is_empty() {
        return 0;
    }
    let below = sorted.partition_point(|m| *m < momentum);
    let pct = below * 100 / sorted.len();
    pct.min(MAX_RATING as usize) as u8
}

/// Relative-strength ranker.
#[derive(Debug, Clone)]
pub struct RsRanker {
    min_bars: usize,
}

impl Default for RsRanker {
    fn default() -> Self {
        Self {
            min_bars: HORIZONS[3],
        }
    }
}

impl RsRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum usable bars for a ticker to be ranked.
    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    /// Rank one universe at one as-of date.
    ///
    /// Each member's bars must already be truncated to the as-of date.
    pub fn rank<'a, I>(&self, members: I) -> RankTable
    where
        I: IntoIterator<Item = (&'a str, &'a [Bar])>,
    {
        let mut table = RankTable::default();
        let mut scored: Vec<(String, f64)> = Vec::new();

        for (ticker, bars) in members {
            if bars.len() < self.min_bars {
                debug!(ticker, bars = bars.len(), "not ranked: short history");
                table.ineligible.push(ticker.to_string());
                continue;
            }
            match weighted_momentum(bars) {
                Some(m) => scored.push((ticker.to_string(), m)),
                None => {
                    table.issues.push(EngineIssue::NumericDegenerate {
                        context: format!("weighted momentum of {ticker}"),
                    });
                    table.ineligible.push(ticker.to_string());
                }
            }
        }

        if scored.len() <= 1 {
            warn!(ranked = scored.len(), "universe too small for a meaningful ranking");
            table.issues.push(EngineIssue::UniverseTooSmall {
                ranked: scored.len(),
            });
        }

        let mut sorted: Vec<f64> = scored.iter().map(|(_, m)| *m).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        table.entries = scored
            .into_iter()
            .map(|(ticker, momentum)| RankEntry {
                rating: percentile_rating(momentum, &sorted),
                ticker,
                momentum,
            })
            .collect();
        table.entries.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| b.momentum.partial_cmp(&a.momentum).unwrap_or(Ordering::Equal))
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        table.ratings = table
            .entries
            .iter()
            .map(|e| (e.ticker.clone(), e.rating))
            .collect();
        table.ineligible.sort();

        let s = table.summary();
        debug!(
            ranked = s.ranked,
            ineligible = s.ineligible,
            rs90 = s.at_least_90,
            rs80 = s.at_least_80,
            rs70 = s.at_least_70,
            "ranking pass complete"
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn sorted(v: &[f64]) -> Vec<f64> {
        let mut v = v.to_vec();
        v.sort_by(|a, b| a.total_cmp(b));
        v
    }

    #[test]
    fn five_ticker_example() {
        let momenta = [50.0, 40.0, 30.0, 20.0, 10.0];
        let s = sorted(&momenta);
        let ratings: Vec<u8> = momenta.iter().map(|m| percentile_rating(*m, &s)).collect();
        assert_eq!(ratings, vec![80, 60, 40, 20, 0]);
    }

    #[test]
    fn ties_share_the_lower_percentile() {
        let momenta = [10.0, 10.0, 5.0];
        let s = sorted(&momenta);
        assert_eq!(percentile_rating(10.0, &s), 33);
        assert_eq!(percentile_rating(5.0, &s), 0);
    }

    #[test]
    fn rating_is_capped_at_99() {
        let momenta: Vec<f64> = (0..200).map(|i| i as f64).collect();
        assert_eq!(percentile_rating(199.0, &momenta), 99);
        assert_eq!(percentile_rating(100.0, &momenta), 50);
    }

    #[test]
    fn floor_is_exact_for_awkward_fractions() {
        // 29 of 100 below: must be 29, not 28
        let momenta: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(percentile_rating(29.0, &momenta), 29);
    }

    fn year_series(last: f64) -> Vec<Bar> {
        let mut closes = vec![100.0; 252];
        closes[251] = last;
        make_bars(&closes)
    }

    #[test]
    fn ranker_excludes_short_histories() {
        let a = year_series(130.0);
        let b = year_series(110.0);
        let short = make_bars(&[100.0; 100]);
        let table = RsRanker::new().rank([
            ("AAA", a.as_slice()),
            ("BBB", b.as_slice()),
            ("NEW", short.as_slice()),
        ]);

        assert_eq!(table.get("AAA"), Some(50));
        assert_eq!(table.get("BBB"), Some(0));
        assert_eq!(table.get("NEW"), None);
        assert_eq!(table.ineligible(), &["NEW".to_string()]);
        assert_eq!(table.entries()[0].ticker, "AAA");
        assert!(table.issues().is_empty());
    }

    #[test]
    fn single_ticker_gets_zero() {
        let a = year_series(150.0);
        let table = RsRanker::new().rank([("SOLO", a.as_slice())]);
        assert_eq!(table.get("SOLO"), Some(0));
        assert_eq!(
            table.issues(),
            &[EngineIssue::UniverseTooSmall { ranked: 1 }]
        );
    }

    #[test]
    fn empty_universe_is_empty_table() {
        let table = RsRanker::new().rank(std::iter::empty::<(&str, &[Bar])>());
        assert!(table.is_empty());
        assert_eq!(table.summary().ranked, 0);
    }

    #[test]
    fn summary_counts_cutoffs() {
        let series: Vec<(String, Vec<Bar>)> = (0..10)
            .map(|i| (format!("T{i}"), year_series(100.0 + i as f64)))
            .collect();
        let table = RsRanker::new().rank(series.iter().map(|(t, b)| (t.as_str(), b.as_slice())));
        let s = table.summary();
        assert_eq!(s.ranked, 10);
        // ratings 0,10,...,90
        assert_eq!(s.at_least_90, 1);
        assert_eq!(s.at_least_80, 2);
        assert_eq!(s.at_least_70, 3);
    }
}
