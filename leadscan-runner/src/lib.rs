//! Leadscan Runner — configuration, data loading, scans and point-in-time backtests.
//!
//! This crate builds on `leadscan-core` to provide:
//! - TOML configuration with content-addressed run ids
//! - Data loading from a CSV directory or deterministic synthetic data
//! - As-of schedules (weekly, last session of each week, daily)
//! - Single-date scans and the multi-date backtest driver

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod runner;
pub mod scan;
pub mod schedule;

pub use backtest::{BacktestDriver, BacktestOutput, BacktestRecord, BacktestSummary, StrategyOutcome};
pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{
    generate_synthetic_bars, load_universe, open_provider, CsvDirectoryProvider, LoadError,
    LoadOptions, LoadedData, SyntheticProvider,
};
pub use runner::{
    load_data, run_backtest, run_backtest_from_data, run_scan, run_scan_from_data, BacktestResult,
    Provenance, RunError, ScanResult,
};
pub use scan::{rank_at, scan_date, screen_at, ScanReport};
pub use schedule::{last_session_per_week, weekly_as_of_dates, Schedule};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn providers_are_send_sync() {
        assert_send::<CsvDirectoryProvider>();
        assert_sync::<CsvDirectoryProvider>();
        assert_send::<SyntheticProvider>();
        assert_sync::<SyntheticProvider>();
    }

    #[test]
    fn driver_is_send_sync() {
        assert_send::<BacktestDriver>();
        assert_sync::<BacktestDriver>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }
}
