//! Universe configuration: listed tickers with market cap and price, plus
//! the filter that narrows them to the tickers ranked on a date.
//!
//! Stored as TOML:
//!
//! ```toml
//! [[listing]]
//! ticker = "NVDA"
//! name = "NVIDIA"
//! market_cap = 2.9e12
//! price = 880.0
//! sector = "Technology"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use super::DataError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub sector: Option<String>,
}

impl Listing {
    pub fn new(ticker: impl Into<String>, market_cap: f64, price: f64) -> Self {
        let ticker = ticker.into();
        Self {
            name: ticker.clone(),
            ticker,
            market_cap,
            price,
            sector: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseFilter {
    pub min_market_cap: Option<f64>,
    pub min_price: Option<f64>,
    /// Keep only the largest listings by market cap.
    pub top_n_by_market_cap: Option<usize>,
}

impl UniverseFilter {
    /// Filtered listings, largest market cap first.
    pub fn apply(&self, listings: impl IntoIterator<Item = Listing>) -> Vec<Listing> {
        let mut kept: Vec<Listing> = listings
            .into_iter()
            .filter(|l| self.min_market_cap.map_or(true, |m| l.market_cap >= m))
            .filter(|l| self.min_price.map_or(true, |m| l.price >= m))
            .collect();
        kept.sort_by(|a, b| {
            b.market_cap
                .total_cmp(&a.market_cap)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        if let Some(n) = self.top_n_by_market_cap {
            kept.truncate(n);
        }
        kept
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    #[serde(default, rename = "listing")]
    pub listings: Vec<Listing>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        let universe: Self = toml::from_str(content).map_err(|e| DataError::Parse {
            what: "universe TOML".into(),
            reason: e.to_string(),
        })?;
        let mut seen = BTreeSet::new();
        if let Some(dup) = universe
            .listings
            .iter()
            .find(|l| !seen.insert(l.ticker.as_str()))
        {
            return Err(DataError::Parse {
                what: "universe TOML".into(),
                reason: format!("duplicate ticker {}", dup.ticker),
            });
        }
        Ok(universe)
    }

    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self).map_err(|e| DataError::Other(format!("serialize universe: {e}")))
    }

    /// Universe of bare tickers with no market data.
    pub fn from_tickers<I, S>(tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            listings: tickers
                .into_iter()
                .map(|t| Listing::new(t, 0.0, 0.0))
                .collect(),
        }
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.listings.iter().map(|l| l.ticker.as_str()).collect()
    }

    pub fn get(&self, ticker: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.ticker == ticker)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[listing]]
        ticker = "AAA"
        name = "Alpha"
        market_cap = 5.0e9
        price = 40.0
        sector = "Technology"

        [[listing]]
        ticker = "BBB"
        market_cap = 8.0e8
        price = 12.0

        [[listing]]
        ticker = "CCC"
        market_cap = 2.0e10
        price = 3.0
    "#;

    #[test]
    fn parses_listings() {
        let u = Universe::from_toml(SAMPLE).unwrap();
        assert_eq!(u.tickers(), vec!["AAA", "BBB", "CCC"]);
        assert_eq!(u.get("AAA").unwrap().sector.as_deref(), Some("Technology"));
        assert_eq!(u.get("BBB").unwrap().name, "");
    }

    #[test]
    fn filter_by_cap_price_and_top_n() {
        let u = Universe::from_toml(SAMPLE).unwrap();
        let all = UniverseFilter::default().apply(u.listings.clone());
        let order: Vec<&str> = all.iter().map(|l| l.ticker.as_str()).collect();
        assert_eq!(order, vec!["CCC", "AAA", "BBB"]);

        let f = UniverseFilter {
            min_market_cap: Some(1.0e9),
            min_price: Some(5.0),
            top_n_by_market_cap: None,
        };
        let kept = f.apply(u.listings.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].ticker, "AAA");

        let top = UniverseFilter {
            top_n_by_market_cap: Some(2),
            ..UniverseFilter::default()
        };
        assert_eq!(top.apply(u.listings).len(), 2);
    }

    #[test]
    fn duplicate_tickers_rejected() {
        let src = "[[listing]]\nticker = \"A\"\n[[listing]]\nticker = \"A\"\n";
        assert!(matches!(
            Universe::from_toml(src),
            Err(DataError::Parse { .. })
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::from_toml(SAMPLE).unwrap();
        let back = Universe::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(u, back);
    }
}
