//! Serializable backtest configuration.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use leadscan_core::data::UniverseFilter;
use leadscan_core::strategy::presets::{self, STRATEGY_IDS};
use leadscan_core::strategy::{ProfileError, StrategyProfile};

use crate::schedule::Schedule;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Calendar days of history loaded before the first as-of date, enough for
/// a full year of ranking horizons plus the 200-bar moving averages.
pub const DEFAULT_WARMUP_DAYS: i64 = 420;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("start date {start} is after end date {end}")]
    InvalidDates { start: NaiveDate, end: NaiveDate },

    #[error("no strategies configured")]
    NoStrategies,

    #[error("no data source: set data.dir or data.synthetic")]
    NoDataSource,

    #[error(transparent)]
    Strategy(#[from] ProfileError),
}

/// Full configuration of a backtest or scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub run: RunSection,

    #[serde(default)]
    pub universe: UniverseSection,

    #[serde(default)]
    pub data: DataSection,

    /// Strategy ids, resolved against `profiles` first, then the built-in presets.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,

    /// Additional strategy profiles declared inline.
    #[serde(default, rename = "profile")]
    pub profiles: Vec<StrategyProfile>,

    #[serde(default)]
    pub execution: ExecutionSection,

    /// Index ticker for the market-direction filter.
    #[serde(default)]
    pub benchmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// First as-of date (inclusive).
    pub start: NaiveDate,
    /// Last as-of date (inclusive).
    pub end: NaiveDate,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default = "default_warmup_days")]
    pub warmup_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniverseSection {
    /// Universe TOML; defaults to the data directory's `universe.toml`.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Explicit tickers, used when no universe file is given.
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub filter: UniverseFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    /// Directory of `<TICKER>.csv` files.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Generate deterministic synthetic bars instead of reading files.
    #[serde(default)]
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSection {
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self { parallel: true }
    }
}

fn default_strategies() -> Vec<String> {
    STRATEGY_IDS.iter().map(|s| s.to_string()).collect()
}

fn default_warmup_days() -> i64 {
    DEFAULT_WARMUP_DAYS
}

fn default_parallel() -> bool {
    true
}

impl BacktestConfig {
    /// A config over explicit tickers with synthetic data and all presets.
    pub fn synthetic(tickers: &[&str], start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            run: RunSection {
                start,
                end,
                schedule: Schedule::default(),
                warmup_days: DEFAULT_WARMUP_DAYS,
            },
            universe: UniverseSection {
                file: None,
                tickers: tickers.iter().map(|t| t.to_string()).collect(),
                filter: UniverseFilter::default(),
            },
            data: DataSection {
                dir: None,
                synthetic: true,
            },
            strategies: default_strategies(),
            profiles: Vec::new(),
            execution: ExecutionSection::default(),
            benchmark: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        // Relative paths are taken from the config file's directory.
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.data.dir, &mut self.universe.file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.start > self.run.end {
            return Err(ConfigError::InvalidDates {
                start: self.run.start,
                end: self.run.end,
            });
        }
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        if self.data.dir.is_none() && !self.data.synthetic {
            return Err(ConfigError::NoDataSource);
        }
        self.profiles()?;
        Ok(())
    }

    /// Resolve `strategies` into profiles, in configured order.
    pub fn profiles(&self) -> Result<Vec<StrategyProfile>, ConfigError> {
        let mut out = Vec::with_capacity(self.strategies.len());
        for id in &self.strategies {
            let profile = match self.profiles.iter().find(|p| &p.id == id) {
                Some(custom) => {
                    custom.validate()?;
                    custom.clone()
                }
                None => presets::by_name(id)?,
            };
            out.push(profile);
        }
        Ok(out)
    }

    /// First date of history to load.
    pub fn history_start(&self) -> NaiveDate {
        self.run.start - Duration::days(self.run.warmup_days.max(0))
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        let hash = blake3::hash(json.as_bytes());
        Ok(hash.to_hex().to_string())
    }
}
