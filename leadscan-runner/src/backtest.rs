//! Point-in-time backtest driver.
//!
//! For each as-of date D the driver truncates every series to bars dated
//! on or before D, ranks the truncated universe, and evaluates every
//! strategy with the fresh rating. Dates are independent of each other, so
//! they run in parallel; each worker derives its own truncation and ranking.
//!
//! Forward returns are filled in only after every date has been processed.
//! They use the final available close and are for reporting only; no signal
//! ever sees a bar after its as-of date.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use leadscan_core::issue::safe_ratio;
use leadscan_core::{BarSeries, BarWindow, EngineIssue, RsRanker, SignalResult, StrategyProfile};

use crate::scan::{scan_date, ScanReport};

/// One strategy's verdict inside a [`BacktestRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub score: f64,
    pub entry: bool,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub pattern: Option<String>,
}

impl From<&SignalResult> for StrategyOutcome {
    fn from(s: &SignalResult) -> Self {
        Self {
            score: s.score,
            entry: s.entry,
            entry_price: s.entry_price,
            stop_loss: s.stop_loss,
            pattern: s.pattern.clone(),
        }
    }
}

/// One row of the longitudinal table: a ticker at an as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub rs_rating: Option<u8>,
    /// Close of the last bar on or before `as_of`.
    pub price: f64,
    pub strategies: BTreeMap<String, StrategyOutcome>,
    /// Final available close, filled after all dates are processed.
    pub latest_price: Option<f64>,
    /// `(latest_price - price) / price`, in percent.
    pub return_pct: Option<f64>,
}

impl BacktestRecord {
    pub fn entered(&self, strategy: &str) -> bool {
        self.strategies.get(strategy).is_some_and(|o| o.entry)
    }
}

/// Aggregates over the longitudinal table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub dates: usize,
    pub records: usize,
    pub tickers_analysed: usize,
    pub mean_rs_rating: Option<f64>,
    /// Entry signals per strategy id.
    pub entries: BTreeMap<String, usize>,
    pub mean_return_pct: Option<f64>,
    /// Mean forward return of the rows each strategy entered.
    pub mean_entry_return_pct: BTreeMap<String, f64>,
}

impl BacktestSummary {
    pub fn from_records(records: &[BacktestRecord], dates: usize) -> Self {
        fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
            let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            (n > 0).then(|| sum / n as f64)
        }

        let mut tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
        tickers.sort_unstable();
        tickers.dedup();

        let mut entries: BTreeMap<String, usize> = BTreeMap::new();
        let mut entry_returns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records {
            for (id, outcome) in &record.strategies {
                let count = entries.entry(id.clone()).or_default();
                if outcome.entry {
                    *count += 1;
                    if let Some(r) = record.return_pct {
                        entry_returns.entry(id.clone()).or_default().push(r);
                    }
                }
            }
        }

        Self {
            dates,
            records: records.len(),
            tickers_analysed: tickers.len(),
            mean_rs_rating: mean(records.iter().filter_map(|r| r.rs_rating).map(f64::from)),
            entries,
            mean_return_pct: mean(records.iter().filter_map(|r| r.return_pct)),
            mean_entry_return_pct: entry_returns
                .into_iter()
                .filter_map(|(id, v)| mean(v.into_iter()).map(|m| (id, m)))
                .collect(),
        }
    }
}

/// Everything a backtest produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutput {
    /// Ordered by as-of date, then ticker.
    pub records: Vec<BacktestRecord>,
    pub summary: BacktestSummary,
    /// Issues collected across dates (data gaps, small universes).
    pub issues: Vec<EngineIssue>,
    /// Dates requested but skipped because the run was cancelled.
    pub cancelled_dates: usize,
}

impl BacktestOutput {
    pub fn was_cancelled(&self) -> bool {
        self.cancelled_dates > 0
    }
}

/// Replays a set of strategies over a universe at many as-of dates.
#[derive(Debug, Clone)]
pub struct BacktestDriver {
    profiles: Vec<StrategyProfile>,
    ranker: RsRanker,
    benchmark: Option<BarSeries>,
    parallel: bool,
    cancel: Arc<AtomicBool>,
}

impl BacktestDriver {
    pub fn new(profiles: Vec<StrategyProfile>) -> Self {
        Self {
            profiles,
            ranker: RsRanker::new(),
            benchmark: None,
            parallel: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set whether to run dates (and tickers within a date) in parallel.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_benchmark(mut self, benchmark: Option<BarSeries>) -> Self {
        self.benchmark = benchmark;
        self
    }

    /// Share a cancellation flag; once set, no further dates are started.
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn profiles(&self) -> &[StrategyProfile] {
        &self.profiles
    }

    /// Run every date. Dates are sorted and de-duplicated first.
    pub fn run(&self, universe: &BTreeMap<String, BarSeries>, dates: &[NaiveDate]) -> BacktestOutput {
        let mut dates = dates.to_vec();
        dates.sort();
        dates.dedup();

        info!(
            dates = dates.len(),
            tickers = universe.len(),
            strategies = self.profiles.len(),
            "backtest started"
        );

        let run_date = |as_of: &NaiveDate| -> Option<ScanReport> {
            if self.cancel.load(Ordering::Relaxed) {
                return None;
            }
            let report = scan_date(
                universe,
                *as_of,
                &self.profiles,
                self.benchmark.as_ref(),
                &self.ranker,
                self.parallel,
            );
            debug!(
                %as_of,
                ranked = report.ranks.len(),
                entries = report.entries().count(),
                "date complete"
            );
            Some(report)
        };

        let reports: Vec<Option<ScanReport>> = if self.parallel {
            dates.par_iter().map(run_date).collect()
        } else {
            dates.iter().map(run_date).collect()
        };

        let cancelled_dates = reports.iter().filter(|r| r.is_none()).count();
        if cancelled_dates > 0 {
            warn!(
                cancelled_dates,
                completed = reports.len() - cancelled_dates,
                "backtest cancelled; returning completed dates"
            );
        }

        let mut records = Vec::new();
        let mut issues = Vec::new();
        let mut completed = 0;
        for report in reports.into_iter().flatten() {
            completed += 1;
            issues.extend(report.gaps.iter().cloned());
            issues.extend(report.ranks.issues().iter().cloned());
            records.extend(records_for(&report, universe));
        }

        fill_forward_returns(&mut records, universe);
        let summary = BacktestSummary::from_records(&records, completed);
        info!(
            records = summary.records,
            tickers = summary.tickers_analysed,
            "backtest complete"
        );

        BacktestOutput {
            records,
            summary,
            issues,
            cancelled_dates,
        }
    }
}

/// Collapse one date's signals into one record per ticker.
fn records_for(report: &ScanReport, universe: &BTreeMap<String, BarSeries>) -> Vec<BacktestRecord> {
    let mut by_ticker: BTreeMap<&str, BTreeMap<String, StrategyOutcome>> = BTreeMap::new();
    for signal in &report.signals {
        by_ticker
            .entry(signal.ticker.as_str())
            .or_default()
            .insert(signal.strategy.clone(), StrategyOutcome::from(signal));
    }

    by_ticker
        .into_iter()
        .filter_map(|(ticker, strategies)| {
            let price = universe.get(ticker)?.as_of(report.as_of).last_close()?;
            Some(BacktestRecord {
                ticker: ticker.to_string(),
                as_of: report.as_of,
                rs_rating: report.ranks.get(ticker),
                price,
                strategies,
                latest_price: None,
                return_pct: None,
            })
        })
        .collect()
}

/// Report-time lookback: the final close of each ticker against the
/// close at each row's as-of date.
fn fill_forward_returns(records: &mut [BacktestRecord], universe: &BTreeMap<String, BarSeries>) {
    for record in records {
        let Some(latest) = universe
            .get(&record.ticker)
            .and_then(|s| s.bars().last_close())
        else {
            continue;
        };
        record.latest_price = Some(latest);
        record.return_pct = safe_ratio(latest - record.price, record.price).map(|r| r * 100.0);
    }
}
