//! Run orchestration: config → provider → loaded data → scan or backtest.
//!
//! Entry points:
//! - `run_backtest()`: loads data through the configured provider, then replays
//!   the configured schedule. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data and an optional cancel token.
//! - `run_scan()`: one as-of date over the same loaded data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use leadscan_core::data::DataSource;
use leadscan_core::RsRanker;

use crate::backtest::{BacktestDriver, BacktestOutput};
use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{load_universe, open_provider, LoadError, LoadOptions, LoadedData, SkippedTicker};
use crate::scan::{scan_date, ScanReport};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("no as-of dates between {start} and {end}")]
    NoAsOfDates { start: NaiveDate, end: NaiveDate },
}

/// Where a run's data came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub run_id: RunId,
    pub dataset_hash: String,
    pub source: DataSource,
    /// Synthetic results are never mixed with real ones.
    pub has_synthetic: bool,
    pub skipped: Vec<SkippedTicker>,
}

impl Provenance {
    fn new(config: &BacktestConfig, data: &LoadedData) -> Result<Self, RunError> {
        Ok(Self {
            run_id: config.run_id()?,
            dataset_hash: data.dataset_hash.clone(),
            source: data.source,
            has_synthetic: data.has_synthetic,
            skipped: data.skipped.clone(),
        })
    }
}

/// Complete result of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub provenance: Provenance,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub strategies: Vec<String>,
    pub as_of_dates: Vec<NaiveDate>,
    #[serde(flatten)]
    pub output: BacktestOutput,
}

/// Result of a single-date scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub provenance: Provenance,
    #[serde(flatten)]
    pub report: ScanReport,
}

/// Load the configured universe through the configured provider.
pub fn load_data(config: &BacktestConfig) -> Result<LoadedData, RunError> {
    config.validate()?;
    let provider = open_provider(config)?;
    Ok(load_universe(provider.as_ref(), &LoadOptions::from_config(config))?)
}

/// Load data and replay the configured schedule.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let data = load_data(config)?;
    run_backtest_from_data(config, &data, None)
}

/// Replay the configured schedule over pre-loaded data.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    data: &LoadedData,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<BacktestResult, RunError> {
    let profiles = config.profiles()?;
    let dates = config
        .run
        .schedule
        .resolve(config.run.start, config.run.end, &data.sessions());
    if dates.is_empty() {
        return Err(RunError::NoAsOfDates {
            start: config.run.start,
            end: config.run.end,
        });
    }

    let mut driver = BacktestDriver::new(profiles)
        .with_parallelism(config.execution.parallel)
        .with_benchmark(data.benchmark.clone());
    if let Some(token) = cancel {
        driver = driver.with_cancel_token(token);
    }

    let output = driver.run(&data.series, &dates);
    let provenance = Provenance::new(config, data)?;
    info!(run_id = %provenance.run_id, synthetic = provenance.has_synthetic, "run recorded");

    Ok(BacktestResult {
        provenance,
        start: config.run.start,
        end: config.run.end,
        strategies: driver.profiles().iter().map(|p| p.id.clone()).collect(),
        as_of_dates: dates,
        output,
    })
}

/// Scan one date (default: the configured end date).
pub fn run_scan(config: &BacktestConfig, as_of: Option<NaiveDate>) -> Result<ScanResult, RunError> {
    let data = load_data(config)?;
    run_scan_from_data(config, &data, as_of.unwrap_or(config.run.end))
}

pub fn run_scan_from_data(
    config: &BacktestConfig,
    data: &LoadedData,
    as_of: NaiveDate,
) -> Result<ScanResult, RunError> {
    let profiles = config.profiles()?;
    let report = scan_date(
        &data.series,
        as_of,
        &profiles,
        data.benchmark.as_ref(),
        &RsRanker::new(),
        config.execution.parallel,
    );
    Ok(ScanResult {
        provenance: Provenance::new(config, data)?,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config() -> BacktestConfig {
        let mut c = BacktestConfig::synthetic(&["AAA", "BBB", "CCC"], d(2024, 3, 1), d(2024, 3, 29));
        c.benchmark = Some("IDX".into());
        c
    }

    #[test]
    fn synthetic_backtest_is_tagged() {
        let result = run_backtest(&config()).unwrap();
        assert!(result.provenance.has_synthetic);
        assert_eq!(result.as_of_dates.len(), 5);
        assert_eq!(result.output.records.len(), 15);
        assert_eq!(result.strategies.len(), 5);
    }

    #[test]
    fn runs_are_reproducible() {
        let a = run_backtest(&config()).unwrap();
        let b = run_backtest(&config()).unwrap();
        assert_eq!(a.provenance, b.provenance);
        assert_eq!(a.output, b.output);
    }

    #[test]
    fn empty_schedule_is_an_error() {
        let mut c = config();
        c.run.start = d(2024, 3, 26);
        c.run.end = d(2024, 3, 28);
        let err = run_backtest(&c).unwrap_err();
        assert!(matches!(err, RunError::NoAsOfDates { .. }));
    }

    #[test]
    fn pre_cancelled_run_is_empty() {
        let c = config();
        let data = load_data(&c).unwrap();
        let token = Arc::new(AtomicBool::new(true));
        let result = run_backtest_from_data(&c, &data, Some(token.clone())).unwrap();
        assert!(token.load(Ordering::Relaxed));
        assert!(result.output.records.is_empty());
        assert_eq!(result.output.cancelled_dates, 5);
    }

    #[test]
    fn scan_defaults_to_end_date() {
        let result = run_scan(&config(), None).unwrap();
        assert_eq!(result.report.as_of, d(2024, 3, 29));
        assert_eq!(result.report.signals.len(), 15);
        assert!(result.report.market.is_some());
    }
}
