//! BarSeries — validated, date-ordered bars for one ticker.
//!
//! Every consumer in the engine reads bars through a slice. Point-in-time
//! evaluation hands out the prefix `bars[..k]` whose last date is on or before
//! the as-of date, so nothing downstream can reach a later bar.

use super::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing a [`BarSeries`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{ticker}: bar dates must be strictly increasing ({prev} followed by {next})")]
    UnorderedDates {
        ticker: String,
        prev: NaiveDate,
        next: NaiveDate,
    },

    #[error("{ticker}: negative {field} on {date}")]
    NegativeField {
        ticker: String,
        date: NaiveDate,
        field: &'static str,
    },

    #[error("{ticker}: non-finite price on {date}")]
    NonFinite { ticker: String, date: NaiveDate },
}

/// Ordered daily bars for a single ticker.
///
/// Invariants (checked by [`BarSeries::new`]): dates strictly increasing,
/// prices finite and non-negative. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    ticker: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Result<Self, BarError> {
        let ticker = ticker.into();
        for bar in &bars {
            if bar.is_void() {
                return Err(BarError::NonFinite {
                    ticker,
                    date: bar.date,
                });
            }
            if let Some(field) = bar.negative_field() {
                return Err(BarError::NegativeField {
                    ticker,
                    date: bar.date,
                    field,
                });
            }
        }
        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(BarError::UnorderedDates {
                ticker,
                prev: pair[0].date,
                next: pair[1].date,
            });
        }
        Ok(Self { ticker, bars })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Bars dated on or before `as_of`.
    pub fn as_of(&self, as_of: NaiveDate) -> &[Bar] {
        let end = self.bars.partition_point(|b| b.date <= as_of);
        &self.bars[..end]
    }

    /// Owned copy truncated at `as_of` (inclusive).
    pub fn truncated(&self, as_of: NaiveDate) -> BarSeries {
        BarSeries {
            ticker: self.ticker.clone(),
            bars: self.as_of(as_of).to_vec(),
        }
    }

    /// The bar dated exactly `date`, if the ticker traded that day.
    pub fn bar_on(&self, date: NaiveDate) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &self.bars[i])
    }
}

/// Trailing-window helpers over a bar slice.
///
/// All lookbacks count back from the last element; "the last `n` bars"
/// includes the current one.
pub trait BarWindow {
    /// The last `n` bars, or all of them if fewer.
    fn tail(&self, n: usize) -> &[Bar];

    /// Close `k` bars before the last (`k = 0` is the last close).
    fn close_back(&self, k: usize) -> Option<f64>;

    fn last_close(&self) -> Option<f64> {
        self.close_back(0)
    }

    fn highest_high(&self) -> Option<f64>;

    fn lowest_low(&self) -> Option<f64>;

    fn mean_close(&self) -> Option<f64>;

    fn mean_volume(&self) -> Option<f64>;
}

impl BarWindow for [Bar] {
    fn tail(&self, n: usize) -> &[Bar] {
        &self[self.len().saturating_sub(n)..]
    }

    fn close_back(&self, k: usize) -> Option<f64> {
        self.len()
            .checked_sub(k + 1)
            .and_then(|i| self.get(i))
            .map(|b| b.close)
    }

    fn highest_high(&self) -> Option<f64> {
        self.iter().map(|b| b.high).reduce(f64::max)
    }

    fn lowest_low(&self) -> Option<f64> {
        self.iter().map(|b| b.low).reduce(f64::min)
    }

    fn mean_close(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().map(|b| b.close).sum::<f64>() / self.len() as f64)
    }

    fn mean_volume(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().map(|b| b.volume as f64).sum::<f64>() / self.len() as f64)
    }
}
