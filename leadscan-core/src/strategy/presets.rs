//! Built-in strategy profiles.

use super::pricing::{EntryRule, PriceRules, StopRule};
use super::profile::{
    Award, Check, DecisionLabels, Gate, ProfileError, RsTier, ScoringRule, StrategyProfile,
    ValueTier,
};
use crate::patterns::{
    BaseQuality, CupWithHandle, FlatBase, HighTightFlag, NearYearHigh, PivotProximity,
    PivotVolume, Vcp, VolumeBreakout, VolumeDryUp, YearPosition,
};
use crate::template::TemplateVariant;

pub const ONEIL: &str = "oneil";
pub const MINERVINI_BASIC: &str = "minervini_basic";
pub const MINERVINI_ADVANCED: &str = "minervini_advanced";
pub const RYAN_CLASSIC: &str = "ryan_classic";
pub const RYAN_COMPLETE: &str = "ryan_complete";

pub const STRATEGY_IDS: [&str; 5] = [
    ONEIL,
    MINERVINI_BASIC,
    MINERVINI_ADVANCED,
    RYAN_CLASSIC,
    RYAN_COMPLETE,
];

fn rs_gate(tiers: &[(u8, f64)]) -> Gate {
    Gate::RsRating {
        tiers: tiers
            .iter()
            .map(|&(min, points)| RsTier { min, points })
            .collect(),
    }
}

fn pivot(lookback: usize) -> Check {
    Check::PivotProximity(PivotProximity::new(lookback))
}

/// CAN SLIM style: RS >= 80, cup or flat base, breakout volume, near highs.
pub fn oneil() -> StrategyProfile {
    StrategyProfile {
        id: ONEIL.into(),
        name: "O'Neil CAN SLIM".into(),
        min_bars: 60,
        gates: vec![rs_gate(&[(80, 20.0)])],
        rules: vec![
            ScoringRule::fixed(Check::CupWithHandle(CupWithHandle::default()), 30.0).anchored(0.93),
            ScoringRule::fixed(Check::FlatBase(FlatBase::default()), 25.0).anchored(0.93),
            ScoringRule::fixed(Check::VolumeBreakout(VolumeBreakout::default()), 25.0),
            ScoringRule::fixed(Check::NearYearHigh(NearYearHigh::default()), 20.0),
        ],
        threshold: 70.0,
        pricing: PriceRules::new(
            EntryRule::FirstAnchor { fallback_ratio: 1.02 },
            StopRule::Anchor { fallback_ratio: 0.93 },
        ),
        labels: None,
    }
}

/// Stage 2 first, then RS, a simple VCP and a ten-bar pivot.
///
/// Scored on the stacked template (MA50 > MA150 third, MA50 above both
/// longer averages fifth); the advanced profile keeps the classic ordering.
pub fn minervini_basic() -> StrategyProfile {
    StrategyProfile {
        id: MINERVINI_BASIC.into(),
        name: "Minervini SEPA".into(),
        min_bars: 200,
        gates: vec![
            Gate::TrendTemplate {
                variant: TemplateVariant::Stacked,
                points: 40.0,
            },
            rs_gate(&[(90, 30.0), (80, 20.0)]),
        ],
        rules: vec![
            ScoringRule::fixed(Check::Vcp(Vcp::basic()), 30.0),
            ScoringRule::fixed(pivot(10), 20.0),
        ],
        threshold: 80.0,
        pricing: PriceRules::new(
            EntryRule::Pivot { lookback: 10 },
            StopRule::SwingLowOrMa {
                swing_bars: 10,
                ma_period: 50,
                max_risk_pct: 8.0,
            },
        ),
        labels: None,
    }
}

/// Classic 8-point template, finer RS ladder, four-stage VCP scored by tier.
pub fn minervini_advanced() -> StrategyProfile {
    StrategyProfile {
        id: MINERVINI_ADVANCED.into(),
        name: "Minervini VCP".into(),
        min_bars: 200,
        gates: vec![
            Gate::TrendTemplate {
                variant: TemplateVariant::Classic,
                points: 40.0,
            },
            rs_gate(&[(95, 30.0), (90, 25.0), (80, 15.0)]),
        ],
        rules: vec![
            ScoringRule::fixed(Check::Vcp(Vcp::detailed()), 0.0)
                .with_award(Award::QualityFraction { divisor: 3.0 }),
            ScoringRule::fixed(pivot(15), 20.0),
        ],
        threshold: 90.0,
        pricing: PriceRules::new(
            EntryRule::Pivot { lookback: 15 },
            StopRule::MaOrPivot {
                ma_period: 50,
                pivot_ratio: 0.92,
            },
        ),
        labels: None,
    }
}

/// High-tight flags and tight bases with dry-up volume.
pub fn ryan_classic() -> StrategyProfile {
    StrategyProfile {
        id: RYAN_CLASSIC.into(),
        name: "David Ryan".into(),
        min_bars: 60,
        gates: vec![rs_gate(&[(95, 30.0), (90, 20.0)])],
        rules: vec![
            ScoringRule::fixed(Check::HighTightFlag(HighTightFlag::default()), 50.0)
                .anchored(0.93),
            ScoringRule::fixed(Check::BaseQuality(BaseQuality::default()), 25.0),
            ScoringRule::fixed(Check::VolumeDryUp(VolumeDryUp::preceding()), 15.0),
            ScoringRule::fixed(pivot(10), 20.0).anchored(0.925),
            ScoringRule::fixed(
                Check::VolumeBreakout(
                    VolumeBreakout::default()
                        .with_min_ratio(1.4)
                        .with_excessive_above(2.0),
                ),
                15.0,
            ),
        ],
        threshold: 85.0,
        pricing: PriceRules::new(
            EntryRule::FirstAnchor { fallback_ratio: 1.02 },
            StopRule::Anchor {
                fallback_ratio: 0.925,
            },
        ),
        labels: None,
    }
}

/// RS >= 90 and full MA alignment, then position, VCP, dry-up and pivot volume.
pub fn ryan_complete() -> StrategyProfile {
    StrategyProfile {
        id: RYAN_COMPLETE.into(),
        name: "David Ryan complete".into(),
        min_bars: 200,
        gates: vec![rs_gate(&[(95, 25.0), (90, 20.0)]), Gate::MaAlignment],
        rules: vec![
            ScoringRule::fixed(Check::YearPosition(YearPosition::default()), 15.0).warn_on_miss(),
            ScoringRule::fixed(Check::Vcp(Vcp::detailed()), 20.0),
            ScoringRule::fixed(Check::VolumeDryUp(VolumeDryUp::trailing()), 15.0),
            ScoringRule::fixed(pivot(30), 20.0),
            ScoringRule::fixed(Check::PivotVolume(PivotVolume::default()), 0.0).with_award(
                Award::Tiered {
                    tiers: vec![
                        ValueTier { min: 1.5, points: 25.0 },
                        ValueTier { min: 1.3, points: 15.0 },
                    ],
                },
            ),
        ],
        threshold: 100.0,
        pricing: PriceRules::new(
            EntryRule::Pivot { lookback: 30 },
            StopRule::BelowEntry { ratio: 0.93 },
        )
        .with_add_ons(vec![1.02, 1.03]),
        labels: Some(DecisionLabels { strong: 120.0 }),
    }
}

/// Look up a built-in profile by id.
pub fn by_name(id: &str) -> Result<StrategyProfile, ProfileError> {
    match id {
        ONEIL => Ok(oneil()),
        MINERVINI_BASIC => Ok(minervini_basic()),
        MINERVINI_ADVANCED => Ok(minervini_advanced()),
        RYAN_CLASSIC => Ok(ryan_classic()),
        RYAN_COMPLETE => Ok(ryan_complete()),
        other => Err(ProfileError::UnknownStrategy(other.to_string())),
    }
}

pub fn all() -> Vec<StrategyProfile> {
    vec![
        oneil(),
        minervini_basic(),
        minervini_advanced(),
        ryan_classic(),
        ryan_complete(),
    ]
}
