//! Leadscan Core — point-in-time scoring engine for momentum leaders.
//!
//! This crate contains the pure computation:
//! - Bar series with as-of truncation
//! - Relative-strength ranking across a universe
//! - The eight-point trend template
//! - Pattern detectors (VCP, high-tight flag, bases, volume, pivots)
//! - Data-driven strategy profiles and their evaluator
//! - Leading-stock screener
//! - The data-provider contract

pub mod data;
pub mod domain;
pub mod fixtures;
pub mod indicators;
pub mod issue;
pub mod patterns;
pub mod ranking;
pub mod screener;
pub mod strategy;
pub mod template;

pub use domain::{Bar, BarError, BarSeries, BarWindow, CriterionResult};
pub use issue::EngineIssue;
pub use ranking::{RankTable, RsRanker};
pub use strategy::{EvalContext, SignalResult, StrategyProfile};
