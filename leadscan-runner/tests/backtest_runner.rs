//! End-to-end backtests through a config file and a CSV data directory.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use leadscan_core::data::{DataSource, Universe};
use leadscan_core::fixtures::{leader_bars, trend_bars};
use leadscan_core::Bar;
use leadscan_runner::data_loader::write_dataset;
use leadscan_runner::{run_backtest, run_scan, BacktestConfig, RunError, Schedule};

const CONFIG: &str = r#"
strategies = ["minervini_advanced", "ryan_complete", "oneil"]

[run]
start = "2023-12-01"
end = "2024-02-23"

[data]
dir = "bars"
"#;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn dataset(cut: Option<NaiveDate>) -> BTreeMap<String, Vec<Bar>> {
    let mut bars = BTreeMap::new();
    bars.insert("LEAD".to_string(), leader_bars());
    bars.insert("UP".to_string(), trend_bars(100.0, 0.1, 300));
    bars.insert("FLAT".to_string(), trend_bars(100.0, 0.0, 300));
    bars.insert("DOWN".to_string(), trend_bars(100.0, -0.1, 300));
    if let Some(cut) = cut {
        for series in bars.values_mut() {
            series.retain(|b| b.date <= cut);
        }
    }
    bars
}

/// Writes `backtest.toml` and `bars/` into `dir`; returns the config path.
fn write_workspace(dir: &Path, cut: Option<NaiveDate>) -> PathBuf {
    let bars = dataset(cut);
    let universe = Universe::from_tickers(bars.keys().cloned());
    write_dataset(&dir.join("bars"), &universe, &bars).unwrap();
    let path = dir.join("backtest.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

#[test]
fn config_file_drives_a_full_backtest() {
    let tmp = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_workspace(tmp.path(), None)).unwrap();
    assert_eq!(config.data.dir, Some(tmp.path().join("bars")));
    assert_eq!(config.run.schedule, Schedule::default());

    let result = run_backtest(&config).unwrap();
    // Fridays from 2023-12-01 through 2024-02-23.
    assert_eq!(result.as_of_dates.len(), 13);
    assert_eq!(result.output.records.len(), 13 * 4);
    assert_eq!(result.provenance.source, DataSource::CsvImport);
    assert!(!result.provenance.has_synthetic);
    assert_eq!(
        result.output.summary.entries.keys().collect::<Vec<_>>(),
        vec!["minervini_advanced", "oneil", "ryan_complete"]
    );

    // A year of history is needed before anyone is ranked.
    let first = &result.output.records[0];
    assert_eq!(first.as_of, d(2023, 12, 1));
    assert!(first.rs_rating.is_none());
    let last = result.output.records.last().unwrap();
    assert_eq!(last.as_of, d(2024, 2, 23));
    assert!(last.rs_rating.is_some());
}

#[test]
fn leader_is_top_ranked_at_the_end() {
    let tmp = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_workspace(tmp.path(), None)).unwrap();
    let result = run_backtest(&config).unwrap();

    let lead = result
        .output
        .records
        .iter()
        .find(|r| r.ticker == "LEAD" && r.as_of == d(2024, 2, 23))
        .unwrap();
    assert_eq!(lead.rs_rating, Some(75));
    assert_eq!(lead.price, 152.5);
    assert_eq!(lead.return_pct, Some(0.0));
}

#[test]
fn truncated_data_reproduces_earlier_records() {
    let cut = d(2024, 1, 26);
    let full_dir = tempfile::tempdir().unwrap();
    let cut_dir = tempfile::tempdir().unwrap();
    let full = run_backtest(
        &BacktestConfig::from_file(&write_workspace(full_dir.path(), None)).unwrap(),
    )
    .unwrap();
    let truncated = run_backtest(
        &BacktestConfig::from_file(&write_workspace(cut_dir.path(), Some(cut))).unwrap(),
    )
    .unwrap();

    assert_ne!(full.provenance.dataset_hash, truncated.provenance.dataset_hash);

    let upto = |records: &[leadscan_runner::BacktestRecord]| -> Vec<_> {
        records
            .iter()
            .filter(|r| r.as_of <= cut)
            .map(|r| (r.ticker.clone(), r.as_of, r.rs_rating, r.price, r.strategies.clone()))
            .collect()
    };
    let a = upto(&full.output.records);
    assert!(!a.is_empty());
    assert_eq!(a, upto(&truncated.output.records));
}

#[test]
fn scan_matches_the_backtest_row() {
    let tmp = tempfile::tempdir().unwrap();
    let config = BacktestConfig::from_file(&write_workspace(tmp.path(), None)).unwrap();
    let as_of = d(2024, 2, 9);

    let scan = run_scan(&config, Some(as_of)).unwrap();
    let backtest = run_backtest(&config).unwrap();

    for signal in &scan.report.signals {
        let row = backtest
            .output
            .records
            .iter()
            .find(|r| r.ticker == signal.ticker && r.as_of == as_of)
            .unwrap();
        let outcome = &row.strategies[&signal.strategy];
        assert_eq!(outcome.score, signal.score);
        assert_eq!(outcome.entry, signal.entry);
        assert_eq!(row.rs_rating, signal.rs_rating);
    }
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = BacktestConfig::from_file(&write_workspace(tmp.path(), None)).unwrap();
    let parallel = run_backtest(&config).unwrap();
    config.execution.parallel = false;
    let sequential = run_backtest(&config).unwrap();
    assert_eq!(parallel.output, sequential.output);
}

#[test]
fn missing_data_dir_is_a_load_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("backtest.toml");
    std::fs::write(&path, CONFIG).unwrap();
    let config = BacktestConfig::from_file(&path).unwrap();
    let err = run_backtest(&config).unwrap_err();
    assert!(matches!(err, RunError::Data(_)));
}
