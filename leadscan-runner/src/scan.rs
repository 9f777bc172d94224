//! Single-date scan: rank the universe, then evaluate every strategy.
//!
//! The ranking pass is the barrier; per-ticker evaluation after it reads
//! only that ticker's bars and one rating, so it runs in parallel.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use leadscan_core::patterns::{market_direction, MarketDirection};
use leadscan_core::screener::{screen, ScreenHit, ScreenerConfig};
use leadscan_core::{Bar, BarSeries, EngineIssue, EvalContext, RankTable, RsRanker, SignalResult, StrategyProfile};

/// Everything computed for one as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub as_of: NaiveDate,
    pub ranks: RankTable,
    pub market: Option<MarketDirection>,
    /// One result per (ticker, strategy), ordered by ticker then strategy.
    pub signals: Vec<SignalResult>,
    /// Tickers with no bars on or before the date.
    pub gaps: Vec<EngineIssue>,
}

impl ScanReport {
    /// Results with the entry flag set.
    pub fn entries(&self) -> impl Iterator<Item = &SignalResult> {
        self.signals.iter().filter(|s| s.entry)
    }

    pub fn signals_for<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a SignalResult> {
        self.signals.iter().filter(move |s| s.ticker == ticker)
    }
}

/// Split `universe` into the bars visible at `as_of` and the data gaps.
pub fn visible_at(
    universe: &BTreeMap<String, BarSeries>,
    as_of: NaiveDate,
) -> (Vec<(&str, &[Bar])>, Vec<EngineIssue>) {
    let mut members = Vec::with_capacity(universe.len());
    let mut gaps = Vec::new();
    for (ticker, series) in universe {
        let bars = series.as_of(as_of);
        if bars.is_empty() {
            debug!(ticker = %ticker, %as_of, "data gap");
            gaps.push(EngineIssue::DataGap {
                ticker: ticker.clone(),
                as_of,
            });
        } else {
            members.push((ticker.as_str(), bars));
        }
    }
    (members, gaps)
}

/// Rank the universe at `as_of` using only bars dated on or before it.
pub fn rank_at(ranker: &RsRanker, universe: &BTreeMap<String, BarSeries>, as_of: NaiveDate) -> RankTable {
    let (members, _) = visible_at(universe, as_of);
    ranker.rank(members)
}

/// Rank and screen the universe at `as_of`.
pub fn screen_at(
    ranker: &RsRanker,
    universe: &BTreeMap<String, BarSeries>,
    as_of: NaiveDate,
    config: &ScreenerConfig,
) -> (RankTable, Vec<ScreenHit>) {
    let ranks = rank_at(ranker, universe, as_of);
    let hits = screen(&ranks, |t| universe.get(t).map(|s| s.as_of(as_of)), config);
    (ranks, hits)
}

/// Rank the universe and evaluate every profile for every visible ticker.
pub fn scan_date(
    universe: &BTreeMap<String, BarSeries>,
    as_of: NaiveDate,
    profiles: &[StrategyProfile],
    benchmark: Option<&BarSeries>,
    ranker: &RsRanker,
    parallel: bool,
) -> ScanReport {
    let (members, gaps) = visible_at(universe, as_of);
    if !gaps.is_empty() {
        warn!(%as_of, gaps = gaps.len(), "tickers without data left out of this date");
    }

    // Ordering barrier: every momentum is gathered before any rating exists.
    let ranks = ranker.rank(members.iter().copied());

    let market = benchmark.map(|b| market_direction(b.as_of(as_of)));
    if let Some(m) = market.filter(|m| m.evaluated && !m.healthy) {
        debug!(%as_of, close = ?m.close, "benchmark below trend");
    }

    let evaluate = |(ticker, bars): &(&str, &[Bar])| -> Vec<SignalResult> {
        let ctx = EvalContext {
            rs_rating: ranks.get(ticker),
            market,
        };
        profiles
            .iter()
            .map(|p| p.evaluate(ticker, as_of, bars, &ctx))
            .collect()
    };

    let signals: Vec<SignalResult> = if parallel {
        members.par_iter().flat_map_iter(evaluate).collect()
    } else {
        members.iter().flat_map(evaluate).collect()
    };

    ScanReport {
        as_of,
        ranks,
        market,
        signals,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscan_core::fixtures::{leader_bars, trend_bars};
    use leadscan_core::strategy::presets;

    fn universe() -> BTreeMap<String, BarSeries> {
        let mut u = BTreeMap::new();
        u.insert("LEAD".to_string(), BarSeries::new("LEAD", leader_bars()).unwrap());
        for (i, pct) in [0.1, 0.05, -0.05, -0.1].iter().enumerate() {
            let t = format!("T{i}");
            u.insert(t.clone(), BarSeries::new(t, trend_bars(100.0, *pct, 300)).unwrap());
        }
        u
    }

    fn last_date(u: &BTreeMap<String, BarSeries>) -> NaiveDate {
        u["LEAD"].last_date().unwrap()
    }

    #[test]
    fn leader_ranks_on_top_and_every_profile_runs() {
        let u = universe();
        let as_of = last_date(&u);
        let report = scan_date(&u, as_of, &presets::all(), None, &RsRanker::new(), true);

        assert_eq!(report.ranks.len(), 5);
        assert_eq!(report.ranks.get("LEAD"), Some(80));
        assert_eq!(report.signals.len(), 5 * presets::STRATEGY_IDS.len());
        assert!(report.gaps.is_empty());
        assert!(report.market.is_none());
        assert!(report.signals_for("LEAD").all(|s| s.rs_rating == Some(80)));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let u = universe();
        let as_of = last_date(&u);
        let ranker = RsRanker::new();
        let par = scan_date(&u, as_of, &presets::all(), None, &ranker, true);
        let seq = scan_date(&u, as_of, &presets::all(), None, &ranker, false);
        assert_eq!(par, seq);
    }

    #[test]
    fn tickers_without_history_are_gaps() {
        let mut u = universe();
        // Listed only after the scan date.
        let late: Vec<Bar> = trend_bars(100.0, 0.1, 320).split_off(300);
        u.insert("LATE".to_string(), BarSeries::new("LATE", late).unwrap());
        let report = scan_date(&u, last_date(&u), &presets::all(), None, &RsRanker::new(), false);
        assert_eq!(report.gaps.len(), 1);
        assert!(report.signals_for("LATE").next().is_none());
        assert!(report.ranks.get("LATE").is_none());
    }

    #[test]
    fn weak_benchmark_warns_without_changing_scores() {
        let u = universe();
        let as_of = last_date(&u);
        let index = BarSeries::new("IDX", trend_bars(100.0, -0.1, 300)).unwrap();
        let ranker = RsRanker::new();

        let plain = scan_date(&u, as_of, &presets::all(), None, &ranker, false);
        let weak = scan_date(&u, as_of, &presets::all(), Some(&index), &ranker, false);

        assert!(weak.market.is_some_and(|m| m.evaluated && !m.healthy));
        for (a, b) in plain.signals.iter().zip(&weak.signals) {
            assert_eq!(a.score, b.score);
            assert_eq!(a.entry, b.entry);
        }
        assert!(weak
            .signals
            .iter()
            .filter(|s| !s.is_insufficient())
            .all(|s| s.warnings.iter().any(|w| w.starts_with("market in correction"))));
    }

    #[test]
    fn rank_at_ignores_later_bars() {
        let u = universe();
        let cut = u["LEAD"].bars()[270].date;
        let truncated: BTreeMap<String, BarSeries> =
            u.iter().map(|(t, s)| (t.clone(), s.truncated(cut))).collect();
        let ranker = RsRanker::new();
        assert_eq!(rank_at(&ranker, &u, cut), rank_at(&ranker, &truncated, cut));
    }
}
