//! Strategy aggregation.
//!
//! [`StrategyProfile`] describes a strategy as data; [`StrategyProfile::evaluate`]
//! runs it for one ticker at one date and returns a [`SignalResult`].

pub mod evaluator;
pub mod presets;
pub mod pricing;
pub mod profile;
pub mod result;

pub use evaluator::EvalContext;
pub use pricing::{Anchor, EntryRule, PriceLevels, PriceRules, StopRule, STOP_CLAMP_RATIO};
pub use profile::{
    Award, Check, DecisionLabels, Gate, MissPolicy, ProfileError, RsTier, ScoringRule,
    StrategyProfile, ValueTier,
};
pub use result::{Outcome, SignalResult};
