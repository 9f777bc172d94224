//! Simple Moving Average (SMA).
//!
//! Rolling mean of closes (or volumes) over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::Bar;

/// Which bar field an average is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Close,
    Volume,
}

impl PriceSource {
    fn read(self, bar: &Bar) -> f64 {
        match self {
            PriceSource::Close => bar.close,
            PriceSource::Volume => bar.volume as f64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: PriceSource,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source: PriceSource::Close,
            name: format!("sma_{period}"),
        }
    }

    /// Average daily volume over `period` bars.
    pub fn volume(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source: PriceSource::Volume,
            name: format!("volume_sma_{period}"),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let value = |i: usize| self.source.read(&bars[i]);

        let mut sum: f64 = (0..self.period).map(value).sum();
        result[self.period - 1] = sum / self.period as f64;

        for i in self.period..n {
            let leaving = value(i - self.period);
            let entering = value(i);
            if leaving.is_nan() || entering.is_nan() || sum.is_nan() {
                // Re-sum so a NaN that left the window stops poisoning the total.
                sum = (i + 1 - self.period..=i).map(value).sum();
            } else {
                sum = sum - leaving + entering;
            }
            result[i] = sum / self.period as f64;
        }

        result
    }
}
