//! Bar loading and data resolution for the runner.
//!
//! Two providers ship with the runner:
//! - [`CsvDirectoryProvider`]: one `<TICKER>.csv` per ticker plus an optional
//!   `universe.toml` in the same directory
//! - [`SyntheticProvider`]: deterministic random walks, for demos and tests
//!
//! [`load_universe`] pulls every listed ticker through a provider. A ticker
//! that fails to load is skipped and logged; it never aborts the batch.
//! Synthetic data is tagged so results built on it are never mistaken for
//! real ones.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use leadscan_core::data::{
    price_listings, DataError, DataProvider, DataSource, Listing, Universe, UniverseFilter,
};
use leadscan_core::{Bar, BarSeries};

use crate::config::BacktestConfig;

/// Name of the universe file inside a data directory.
pub const UNIVERSE_FILE: &str = "universe.toml";

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("universe is empty after filtering")]
    EmptyUniverse,

    #[error("none of the {requested} listed tickers could be loaded")]
    NoUsableData { requested: usize },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start date for bars (history before the first as-of date included).
    pub start: NaiveDate,
    /// End date for bars; the universe is listed as of this date.
    pub end: NaiveDate,
    pub filter: UniverseFilter,
    /// Index ticker loaded alongside the universe but not ranked with it.
    pub benchmark: Option<String>,
}

impl LoadOptions {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            start: config.history_start(),
            end: config.run.end,
            filter: config.universe.filter.clone(),
            benchmark: config.benchmark.clone(),
        }
    }
}

/// A ticker left out of the loaded universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: String,
}

/// Result of loading bars, including data source provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: BTreeMap<String, BarSeries>,
    pub listings: Vec<Listing>,
    pub benchmark: Option<BarSeries>,
    pub source: DataSource,
    /// Dataset hash for fingerprinting (BLAKE3 over all bar data).
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub skipped: Vec<SkippedTicker>,
}

impl LoadedData {
    /// Every date on which at least one ticker traded, ascending.
    pub fn sessions(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .series
            .values()
            .flat_map(|s| s.bars().iter().map(|b| b.date))
            .collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

/// Load every listed ticker through `provider`.
pub fn load_universe(provider: &dyn DataProvider, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let listings = provider.get_universe(opts.end, &opts.filter)?;
    if listings.is_empty() {
        return Err(LoadError::EmptyUniverse);
    }

    let mut series = BTreeMap::new();
    let mut skipped = Vec::new();
    for listing in &listings {
        match provider.get_series(&listing.ticker, opts.start, opts.end) {
            Ok(s) if s.is_empty() => {
                warn!(ticker = %listing.ticker, "no bars in requested range");
                skipped.push(SkippedTicker {
                    ticker: listing.ticker.clone(),
                    reason: "no bars in requested range".into(),
                });
            }
            Ok(s) => {
                series.insert(listing.ticker.clone(), s);
            }
            Err(e) => {
                warn!(ticker = %listing.ticker, error = %e, "skipping ticker");
                skipped.push(SkippedTicker {
                    ticker: listing.ticker.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    if series.is_empty() {
        return Err(LoadError::NoUsableData {
            requested: listings.len(),
        });
    }

    let benchmark = opts.benchmark.as_deref().and_then(|ticker| {
        provider
            .get_series(ticker, opts.start, opts.end)
            .map_err(|e| warn!(ticker, error = %e, "benchmark unavailable"))
            .ok()
            .filter(|s| !s.is_empty())
    });

    let source = provider.source();
    let dataset_hash = compute_dataset_hash(&series);
    info!(
        provider = provider.name(),
        loaded = series.len(),
        skipped = skipped.len(),
        "universe loaded"
    );

    Ok(LoadedData {
        series,
        listings,
        benchmark,
        source,
        dataset_hash,
        has_synthetic: source == DataSource::Synthetic,
        skipped,
    })
}

/// Build the provider a config asks for.
pub fn open_provider(config: &BacktestConfig) -> Result<Box<dyn DataProvider>, LoadError> {
    let universe = match &config.universe.file {
        Some(path) => Some(Universe::from_file(path)?),
        None if !config.universe.tickers.is_empty() => {
            Some(Universe::from_tickers(&config.universe.tickers))
        }
        None => None,
    };

    if config.data.synthetic {
        warn!("using synthetic data; results will be tagged as synthetic");
        let universe = universe.unwrap_or_default();
        let mut provider = SyntheticProvider::new(universe, config.history_start(), config.run.end);
        if let Some(benchmark) = &config.benchmark {
            provider = provider.with_extra(benchmark);
        }
        return Ok(Box::new(provider));
    }

    let dir = config.data.dir.as_deref().ok_or_else(|| {
        DataError::Other("data.dir is required unless data.synthetic is set".into())
    })?;
    let mut provider = CsvDirectoryProvider::open(dir)?;
    if let Some(universe) = universe {
        provider = provider.with_universe(universe);
    }
    Ok(Box::new(provider))
}

/// Compute a deterministic BLAKE3 hash over all bar data.
///
/// The hash covers dates and all OHLCV values in ticker order.
fn compute_dataset_hash(series: &BTreeMap<String, BarSeries>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (ticker, s) in series {
        hasher.update(ticker.as_bytes());
        for bar in s.bars() {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

// ─── CSV directory ──────────────────────────────────────────────────

/// One row of a `<TICKER>.csv` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    /// Some exports write volume as a float.
    volume: f64,
}

impl From<&Bar> for CsvRow {
    fn from(b: &Bar) -> Self {
        Self {
            date: b.date,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume as f64,
        }
    }
}

impl CsvRow {
    fn into_bar(self) -> Result<Bar, String> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(format!("invalid volume {} on {}", self.volume, self.date));
        }
        Ok(Bar::new(
            self.date,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume.round() as u64,
        ))
    }
}

fn csv_error(path: &Path, e: csv::Error) -> DataError {
    DataError::Parse {
        what: path.display().to_string(),
        reason: e.to_string(),
    }
}

/// Read a `date,open,high,low,close,volume` file, sorted by date.
pub fn read_bars_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let mut bars = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|e| csv_error(path, e))?;
        let bar = row.into_bar().map_err(|reason| DataError::Parse {
            what: path.display().to_string(),
            reason,
        })?;
        bars.push(bar);
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    for bar in bars {
        writer
            .serialize(CsvRow::from(bar))
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a universe and its bars as a directory [`CsvDirectoryProvider`] can open.
pub fn write_dataset(
    dir: &Path,
    universe: &Universe,
    bars: &BTreeMap<String, Vec<Bar>>,
) -> Result<(), DataError> {
    std::fs::create_dir_all(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for (ticker, bars) in bars {
        write_bars_csv(&dir.join(format!("{ticker}.csv")), bars)?;
    }
    let path = dir.join(UNIVERSE_FILE);
    std::fs::write(&path, universe.to_toml()?).map_err(|source| DataError::Io { path, source })
}

/// Reads bars from `<dir>/<TICKER>.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
    universe: Universe,
    /// Dated closes per listed ticker, read on the first universe request.
    closes: OnceLock<BTreeMap<String, Vec<(NaiveDate, f64)>>>,
}

impl CsvDirectoryProvider {
    /// Open a data directory. The universe comes from `universe.toml` when
    /// present, otherwise from the CSV file names.
    pub fn open(dir: &Path) -> Result<Self, DataError> {
        let universe_path = dir.join(UNIVERSE_FILE);
        let universe = if universe_path.exists() {
            Universe::from_file(&universe_path)?
        } else {
            Universe::from_tickers(csv_stems(dir)?)
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            universe,
            closes: OnceLock::new(),
        })
    }

    pub fn with_universe(mut self, universe: Universe) -> Self {
        self.universe = universe;
        self.closes = OnceLock::new();
        self
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }

    fn closes(&self) -> &BTreeMap<String, Vec<(NaiveDate, f64)>> {
        self.closes.get_or_init(|| {
            self.universe
                .listings
                .iter()
                .filter_map(|l| match read_bars_csv(&self.path_for(&l.ticker)) {
                    Ok(bars) => Some((
                        l.ticker.clone(),
                        bars.iter().map(|b| (b.date, b.close)).collect(),
                    )),
                    Err(e) => {
                        debug!(ticker = %l.ticker, error = %e, "no closes for listing");
                        None
                    }
                })
                .collect()
        })
    }
}

fn csv_stems(dir: &Path) -> Result<Vec<String>, DataError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DataError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut stems: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect();
    stems.sort();
    Ok(stems)
}

impl DataProvider for CsvDirectoryProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn get_universe(
        &self,
        as_of: NaiveDate,
        filter: &UniverseFilter,
    ) -> Result<Vec<Listing>, DataError> {
        let closes = self.closes();
        let priced = price_listings(&self.universe.listings, as_of, |ticker, d| {
            let series = closes.get(ticker)?;
            series[..series.partition_point(|(date, _)| *date <= d)]
                .last()
                .map(|&(_, close)| close)
        });
        Ok(filter.apply(priced))
    }

    fn get_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        let mut bars = read_bars_csv(&path)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Deterministic random-walk data over a fixed date range.
///
/// Every ticker's walk depends only on its name and the range, so repeated
/// runs see identical bars.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    universe: Universe,
    bars: BTreeMap<String, Vec<Bar>>,
    start: NaiveDate,
    end: NaiveDate,
}

impl SyntheticProvider {
    pub fn new(universe: Universe, start: NaiveDate, end: NaiveDate) -> Self {
        let mut universe = universe;
        let bars = universe
            .listings
            .iter()
            .map(|l| (l.ticker.clone(), generate_synthetic_bars(&l.ticker, start, end)))
            .collect();
        for listing in &mut universe.listings {
            if listing.market_cap <= 0.0 {
                listing.market_cap = synthetic_market_cap(&listing.ticker);
            }
        }
        Self {
            universe,
            bars,
            start,
            end,
        }
    }

    pub fn from_tickers(tickers: &[&str], start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Universe::from_tickers(tickers.iter().copied()), start, end)
    }

    /// Generate bars for a ticker that is not part of the universe (a benchmark).
    pub fn with_extra(mut self, ticker: &str) -> Self {
        let (start, end) = (self.start, self.end);
        self.bars
            .entry(ticker.to_string())
            .or_insert_with(|| generate_synthetic_bars(ticker, start, end));
        self
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// All generated bars, keyed by ticker.
    pub fn bars(&self) -> &BTreeMap<String, Vec<Bar>> {
        &self.bars
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
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
            .cloned()
            .collect())
    }
}

fn ticker_rng(ticker: &str) -> rand::rngs::StdRng {
    use rand::SeedableRng;

    // Deterministic seed from the ticker name
    let seed_bytes = blake3::hash(ticker.as_bytes());
    rand::rngs::StdRng::from_seed(*seed_bytes.as_bytes())
}

fn synthetic_market_cap(ticker: &str) -> f64 {
    use rand::Rng;

    let mut rng = ticker_rng(&format!("{ticker}/market_cap"));
    rng.gen_range(1.0e9..5.0e11_f64).round()
}

/// Generate synthetic bars for testing/development.
///
/// A random walk with a per-ticker drift, so a synthetic universe has a
/// spread of leaders and laggards. Weekends are skipped.
pub fn generate_synthetic_bars(ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    use rand::Rng;

    let mut rng = ticker_rng(ticker);
    let drift: f64 = rng.gen_range(-0.0008..0.0025);
    let mut price: f64 = rng.gen_range(20.0..200.0);

    let mut bars = Vec::new();
    let mut current = start;
    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = drift + rng.gen_range(-0.025..0.025);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar::new(current, open, high, low, close, volume));

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscan_core::data::InMemoryProvider;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn opts() -> LoadOptions {
        LoadOptions {
            start: d(2024, 1, 1),
            end: d(2024, 3, 29),
            filter: UniverseFilter::default(),
            benchmark: None,
        }
    }

    #[test]
    fn synthetic_bars_are_deterministic() {
        let a = generate_synthetic_bars("AAA", d(2024, 1, 1), d(2024, 3, 1));
        let b = generate_synthetic_bars("AAA", d(2024, 1, 1), d(2024, 3, 1));
        let c = generate_synthetic_bars("BBB", d(2024, 1, 1), d(2024, 3, 1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|bar| bar.is_sane()));
    }

    #[test]
    fn synthetic_bars_skip_weekends() {
        let bars = generate_synthetic_bars("AAA", d(2024, 1, 1), d(2024, 1, 31));
        assert_eq!(bars.len(), 23);
        assert!(bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)));
    }

    #[test]
    fn load_skips_missing_tickers() {
        let bars = generate_synthetic_bars("AAA", d(2024, 1, 1), d(2024, 3, 29));
        let mut universe = Universe::from_tickers(["AAA", "GONE"]);
        universe.listings[0].market_cap = 1.0e9;
        let provider = InMemoryProvider::new(universe).with_series("AAA", bars);

        let loaded = load_universe(&provider, &opts()).unwrap();
        assert_eq!(loaded.series.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].ticker, "GONE");
        assert!(!loaded.has_synthetic);
        assert_eq!(loaded.dataset_hash.len(), 64);
    }

    #[test]
    fn load_fails_when_nothing_loads() {
        let provider = InMemoryProvider::new(Universe::from_tickers(["GONE"]));
        let err = load_universe(&provider, &opts()).unwrap_err();
        assert!(matches!(err, LoadError::NoUsableData { requested: 1 }));
    }

    #[test]
    fn empty_universe_is_an_error() {
        let provider = InMemoryProvider::default();
        let err = load_universe(&provider, &opts()).unwrap_err();
        assert!(matches!(err, LoadError::EmptyUniverse));
    }

    #[test]
    fn synthetic_load_is_tagged_and_hash_stable() {
        let provider = SyntheticProvider::from_tickers(&["AAA", "BBB"], d(2024, 1, 1), d(2024, 3, 29))
            .with_extra("SPY");
        let mut o = opts();
        o.benchmark = Some("SPY".into());

        let first = load_universe(&provider, &o).unwrap();
        let second = load_universe(&provider, &o).unwrap();
        assert!(first.has_synthetic);
        assert_eq!(first.source, DataSource::Synthetic);
        assert_eq!(first.dataset_hash, second.dataset_hash);
        assert!(first.benchmark.is_some());
        assert!(!first.series.contains_key("SPY"));
        assert!(first.listings.iter().all(|l| l.market_cap > 0.0));
    }

    #[test]
    fn sessions_are_the_union_of_dates() {
        let provider =
            SyntheticProvider::from_tickers(&["AAA", "BBB"], d(2024, 1, 1), d(2024, 1, 12));
        let loaded = load_universe(&provider, &opts()).unwrap();
        assert_eq!(loaded.sessions().len(), 10);
    }
}
