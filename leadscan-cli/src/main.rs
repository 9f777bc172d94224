//! Leadscan CLI — ranking, scans, screens and point-in-time backtests.
//!
//! Commands:
//! - `rank` — RS ratings of the configured universe at one date
//! - `scan` — every configured strategy for every ticker at one date
//! - `screen` — leading-stock screen at one date
//! - `backtest` — replay the configured schedule and print the longitudinal table
//! - `synthetic` — write a deterministic synthetic CSV data directory
//! - `strategies` — list the built-in strategy profiles, or print one as TOML
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadscan_core::data::Universe;
use leadscan_core::screener::ScreenerConfig;
use leadscan_core::strategy::presets;
use leadscan_core::RsRanker;
use leadscan_runner::data_loader::write_dataset;
use leadscan_runner::{
    load_data, rank_at, run_backtest, run_scan_from_data, screen_at, BacktestConfig,
    SyntheticProvider,
};

#[derive(Parser)]
#[command(
    name = "leadscan",
    about = "Leadscan CLI — point-in-time momentum leader scoring"
)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the universe by relative strength at one date.
    Rank {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// As-of date (YYYY-MM-DD). Defaults to the config's end date.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Evaluate every configured strategy at one date.
    Scan {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// As-of date (YYYY-MM-DD). Defaults to the config's end date.
        #[arg(long)]
        as_of: Option<String>,

        /// Print only results with the entry flag set.
        #[arg(long, default_value_t = false)]
        entries_only: bool,
    },
    /// Screen for high-RS names with expanding volume near their highs.
    Screen {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// As-of date (YYYY-MM-DD). Defaults to the config's end date.
        #[arg(long)]
        as_of: Option<String>,

        #[arg(long, default_value_t = 80)]
        min_rs: u8,

        /// Minimum volume surge, in percent.
        #[arg(long, default_value_t = 20.0)]
        min_volume_surge: f64,

        /// Do not require the close to be near its 52-week high.
        #[arg(long, default_value_t = false)]
        anywhere: bool,
    },
    /// Run a point-in-time backtest from a TOML config file.
    Backtest {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Run dates one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Print only the summary.
        #[arg(long, default_value_t = false)]
        summary_only: bool,

        /// Write the JSON result here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a synthetic CSV data directory.
    Synthetic {
        /// Output directory.
        #[arg(long)]
        out: PathBuf,

        /// Tickers to generate.
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long, default_value = "2022-01-03")]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-12-31")]
        end: String,
    },
    /// List built-in strategies, or print one as TOML.
    Strategies {
        /// Strategy id to print.
        id: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Rank { config, as_of } => run_rank(&config, as_of.as_deref()),
        Commands::Scan {
            config,
            as_of,
            entries_only,
        } => run_scan_cmd(&config, as_of.as_deref(), entries_only),
        Commands::Screen {
            config,
            as_of,
            min_rs,
            min_volume_surge,
            anywhere,
        } => {
            let screener = ScreenerConfig {
                min_rs,
                min_volume_surge,
                near_high: !anywhere,
                ..ScreenerConfig::default()
            };
            run_screen(&config, as_of.as_deref(), &screener)
        }
        Commands::Backtest {
            config,
            sequential,
            summary_only,
            output,
        } => run_backtest_cmd(&config, sequential, summary_only, output.as_deref()),
        Commands::Synthetic {
            out,
            tickers,
            start,
            end,
        } => run_synthetic(&out, &tickers, &start, &end),
        Commands::Strategies { id } => run_strategies(id.as_deref()),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "leadscan_core=debug,leadscan_runner=debug,leadscan_cli=debug"
    } else {
        "warn,leadscan_runner=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn as_of_or_end(config: &BacktestConfig, as_of: Option<&str>) -> Result<NaiveDate> {
    Ok(as_of.map(parse_date).transpose()?.unwrap_or(config.run.end))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_rank(config_path: &Path, as_of: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let as_of = as_of_or_end(&config, as_of)?;
    let data = load_data(&config)?;

    let table = rank_at(&RsRanker::new(), &data.series, as_of);
    let summary = table.summary();
    info!(
        %as_of,
        ranked = summary.ranked,
        rs90 = summary.at_least_90,
        rs80 = summary.at_least_80,
        "ranked"
    );

    #[derive(Serialize)]
    struct RankOutput<'a> {
        as_of: NaiveDate,
        synthetic: bool,
        summary: leadscan_core::ranking::RankSummary,
        ratings: &'a leadscan_core::RankTable,
    }
    print_json(&RankOutput {
        as_of,
        synthetic: data.has_synthetic,
        summary,
        ratings: &table,
    })
}

fn run_scan_cmd(config_path: &Path, as_of: Option<&str>, entries_only: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let as_of = as_of_or_end(&config, as_of)?;
    let data = load_data(&config)?;

    let mut result = run_scan_from_data(&config, &data, as_of)?;
    if entries_only {
        result.report.signals.retain(|s| s.entry);
    }
    info!(
        %as_of,
        signals = result.report.signals.len(),
        entries = result.report.entries().count(),
        "scan complete"
    );
    print_json(&result)
}

fn run_screen(config_path: &Path, as_of: Option<&str>, screener: &ScreenerConfig) -> Result<()> {
    let config = load_config(config_path)?;
    let as_of = as_of_or_end(&config, as_of)?;
    let data = load_data(&config)?;

    let (ranks, hits) = screen_at(&RsRanker::new(), &data.series, as_of, screener);
    info!(%as_of, ranked = ranks.len(), hits = hits.len(), "screen complete");

    #[derive(Serialize)]
    struct ScreenOutput<'a> {
        as_of: NaiveDate,
        synthetic: bool,
        hits: &'a [leadscan_core::screener::ScreenHit],
    }
    print_json(&ScreenOutput {
        as_of,
        synthetic: data.has_synthetic,
        hits: &hits,
    })
}

fn run_backtest_cmd(
    config_path: &Path,
    sequential: bool,
    summary_only: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if sequential {
        config.execution.parallel = false;
    }

    let result = run_backtest(&config)?;
    if result.provenance.has_synthetic {
        eprintln!("WARNING: results are based on synthetic data");
    }

    let json = if summary_only {
        serde_json::to_string_pretty(&result.output.summary)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), run_id = %result.provenance.run_id, "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_synthetic(out: &Path, tickers: &[String], start: &str, end: &str) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if start > end {
        bail!("--start {start} is after --end {end}");
    }

    let provider = SyntheticProvider::new(Universe::from_tickers(tickers), start, end);
    write_dataset(out, provider.universe(), provider.bars())?;

    println!(
        "Wrote {} synthetic tickers ({start} to {end}) to {}",
        tickers.len(),
        out.display()
    );
    Ok(())
}

fn run_strategies(id: Option<&str>) -> Result<()> {
    match id {
        Some(id) => {
            let profile = presets::by_name(id)?;
            print!("{}", toml::to_string_pretty(&profile)?);
        }
        None => {
            for profile in presets::all() {
                println!(
                    "{:<20} {:<32} threshold {:>5} / max {:>5}",
                    profile.id,
                    profile.name,
                    profile.threshold,
                    profile.max_score()
                );
            }
        }
    }
    Ok(())
}
