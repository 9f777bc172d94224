//! Relative-strength ranking.
//!
//! Two passes per as-of date: every eligible ticker's weighted momentum is
//! gathered first (the ordering barrier), then each is converted into a 0-99
//! percentile against the full distribution.

pub mod momentum;
pub mod rank;

pub use momentum::{
    price_performance, recent_momentum, weighted_momentum, HORIZONS, RECENT_PERIODS,
};
pub use rank::{percentile_rating, RankEntry, RankSummary, RankTable, RsRanker};
