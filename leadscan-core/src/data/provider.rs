//! Data provider trait and structured error types.
//!
//! The engine never performs I/O itself; a `DataProvider` supplies the
//! universe listed at a date and the bars for each ticker. Implementations
//! live here (in-memory) and in the runner (CSV directory, synthetic).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use super::universe::{Listing, Universe, UniverseFilter};
use crate::domain::{Bar, BarError, BarSeries};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error(transparent)]
    InvalidBars(#[from] BarError),

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CsvImport,
    Synthetic,
    Memory,
}

pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    /// Listings eligible at `as_of` after `filter`.
    fn get_universe(
        &self,
        as_of: NaiveDate,
        filter: &UniverseFilter,
    ) -> Result<Vec<Listing>, DataError>;

    /// Ordered daily bars for `ticker` with `start <= date <= end`.
    fn get_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Bar>, DataError>;

    /// Bars validated into a [`BarSeries`].
    fn get_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, DataError> {
        let bars = self.get_bars(ticker, start, end)?;
        Ok(BarSeries::new(ticker, bars)?)
    }
}

/// Listings with their price replaced by the last close on or before
/// `as_of`, when bars are known.
pub fn price_listings<'a>(
    listings: impl IntoIterator<Item = &'a Listing>,
    as_of: NaiveDate,
    close_on: impl Fn(&str, NaiveDate) -> Option<f64>,
) -> Vec<Listing> {
    listings
        .into_iter()
        .map(|l| {
            let mut l = l.clone();
            if let Some(close) = close_on(&l.ticker, as_of) {
                l.price = close;
            }
            l
        })
        .collect()
}

/// Provider over bars already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    universe: Universe,
    bars: BTreeMap<String, Vec<Bar>>,
}

impl InMemoryProvider {
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            bars: BTreeMap::new(),
        }
    }

    /// Insert bars, adding a bare listing when the ticker is not yet listed.
    pub fn insert(&mut self, ticker: impl Into<String>, bars: Vec<Bar>) {
        let ticker = ticker.into();
        if self.universe.get(&ticker).is_none() {
            self.universe.listings.push(Listing::new(ticker.clone(), 0.0, 0.0));
        }
        self.bars.insert(ticker, bars);
    }

    pub fn with_series(mut self, ticker: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(ticker, bars);
        self
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }
}

impl DataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn source(&self) -> DataSource {
        DataSource::Memory
    }

    fn get_universe(
        &self,
        as_of: NaiveDate,
        filter: &UniverseFilter,
    ) -> Result<Vec<Listing>, DataError> {
        let priced = price_listings(&self.universe.listings, as_of, |t, d| {
            let bars = self.bars.get(t)?;
            bars[..bars.partition_point(|b| b.date <= d)]
                .last()
                .map(|b| b.close)
        });
        Ok(filter.apply(priced))
    }

    fn get_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let bars = self
            .bars
            .get(ticker)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{bars_from_closes, trading_days, default_start};

    fn provider() -> InMemoryProvider {
        let mut universe = Universe::default();
        universe.listings.push(Listing::new("BIG", 5.0e10, 1.0));
        universe.listings.push(Listing::new("SMALL", 1.0e8, 1.0));
        InMemoryProvider::new(universe)
            .with_series("BIG", bars_from_closes(&[10.0, 11.0, 12.0, 13.0]))
            .with_series("SMALL", bars_from_closes(&[2.0, 2.0, 2.0, 2.0]))
    }

    #[test]
    fn bars_are_range_filtered() {
        let p = provider();
        let days = trading_days(default_start(), 4);
        let bars = p.get_bars("BIG", days[1], days[2]).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 11.0);
        assert!(matches!(
            p.get_bars("NONE", days[0], days[3]),
            Err(DataError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn universe_priced_at_as_of() {
        let p = provider();
        let days = trading_days(default_start(), 4);
        let filter = UniverseFilter {
            min_price: Some(11.5),
            ..UniverseFilter::default()
        };
        assert!(p.get_universe(days[1], &filter).unwrap().is_empty());
        let listed = p.get_universe(days[2], &filter).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].ticker, "BIG");
        assert_eq!(listed[0].price, 12.0);
    }

    #[test]
    fn series_validation_surfaces_bar_errors() {
        let mut bars = bars_from_closes(&[10.0, 11.0]);
        bars.swap(0, 1);
        let p = InMemoryProvider::default().with_series("BAD", bars);
        let days = trading_days(default_start(), 2);
        assert!(matches!(
            p.get_series("BAD", days[0], days[1]),
            Err(DataError::InvalidBars(BarError::UnorderedDates { .. }))
        ));
    }
}
