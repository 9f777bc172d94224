//! Domain types: bars, validated series, criterion results.

pub mod bar;
pub mod criterion;
pub mod series;

pub use bar::Bar;
pub use criterion::CriterionResult;
pub use series::{BarError, BarSeries, BarWindow};

/// Ticker identifier.
pub type Ticker = String;

/// Trading days in a year, used for all 52-week statistics.
pub const TRADING_DAYS_PER_YEAR: usize = 252;
