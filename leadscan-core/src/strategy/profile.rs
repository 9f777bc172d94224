//! Strategy profiles.
//!
//! A profile is data, not control flow: an ordered list of mandatory
//! gates, a list of scoring rules (detector + award), an entry threshold and
//! a price-rule selection. Every built-in strategy is one of these values
//! (see [`super::presets`]); further strategies can be declared in TOML.

use serde::{Deserialize, Serialize};

use super::pricing::PriceRules;
use crate::patterns::{
    BaseQuality, CupWithHandle, Detection, Detector, FlatBase, HighTightFlag, NearYearHigh,
    PivotProximity, PivotVolume, Vcp, VolumeBreakout, VolumeDryUp, YearPosition,
};
use crate::template::TemplateVariant;

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("failed to parse strategy profile: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid strategy profile {id}: {reason}")]
    Invalid { id: String, reason: String },
}

// ─── Gates ───────────────────────────────────────────────────────────

/// One rung of an RS-rating ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsTier {
    pub min: u8,
    pub points: f64,
}

/// A mandatory check evaluated before scoring; the first failure ends the
/// evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Gate {
    /// Passes at the highest tier the rating reaches; fails below the lowest.
    RsRating { tiers: Vec<RsTier> },
    /// Stage-2 template pass, awarding `points`.
    TrendTemplate {
        variant: TemplateVariant,
        points: f64,
    },
    /// Full MA alignment, awarding the alignment score.
    MaAlignment,
}

impl Gate {
    pub fn name(&self) -> &'static str {
        match self {
            Gate::RsRating { .. } => "rs_rating",
            Gate::TrendTemplate { .. } => "trend_template",
            Gate::MaAlignment => "ma_alignment",
        }
    }
}

// ─── Scoring rules ───────────────────────────────────────────────────

/// Detector selection for a scoring rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "detector", rename_all = "snake_case")]
pub enum Check {
    Vcp(Vcp),
    HighTightFlag(HighTightFlag),
    BaseQuality(BaseQuality),
    CupWithHandle(CupWithHandle),
    FlatBase(FlatBase),
    VolumeDryUp(VolumeDryUp),
    VolumeBreakout(VolumeBreakout),
    PivotProximity(PivotProximity),
    PivotVolume(PivotVolume),
    NearYearHigh(NearYearHigh),
    YearPosition(YearPosition),
}

impl Check {
    pub fn detector(&self) -> &dyn Detector {
        match self {
            Check::Vcp(d) => d,
            Check::HighTightFlag(d) => d,
            Check::BaseQuality(d) => d,
            Check::CupWithHandle(d) => d,
            Check::FlatBase(d) => d,
            Check::VolumeDryUp(d) => d,
            Check::VolumeBreakout(d) => d,
            Check::PivotProximity(d) => d,
            Check::PivotVolume(d) => d,
            Check::NearYearHigh(d) => d,
            Check::YearPosition(d) => d,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueTier {
    pub min: f64,
    pub points: f64,
}

/// Points a passing detection earns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Award {
    Fixed { points: f64 },
    /// `floor(quality / divisor)`, e.g. a VCP tier score divided by three.
    QualityFraction { divisor: f64 },
    /// Points of the highest tier the measured value reaches.
    Tiered { tiers: Vec<ValueTier> },
}

impl Award {
    pub fn points(&self, detection: &Detection) -> f64 {
        match self {
            Award::Fixed { points } => *points,
            Award::QualityFraction { divisor } => detection
                .quality
                .and_then(|q| crate::issue::safe_ratio(q, *divisor))
                .map_or(0.0, f64::floor),
            Award::Tiered { tiers } => detection
                .value()
                .and_then(|v| {
                    tiers
                        .iter()
                        .filter(|t| v >= t.min)
                        .max_by(|a, b| a.min.total_cmp(&b.min))
                })
                .map_or(0.0, |t| t.points),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissPolicy {
    #[default]
    Ignore,
    /// A failed check is surfaced as a warning.
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub check: Check,
    pub award: Award,
    /// When set and the detection carries a pivot, the first such rule to
    /// fire anchors entry at the pivot and the stop at `pivot * anchor_stop`.
    #[serde(default)]
    pub anchor_stop: Option<f64>,
    #[serde(default)]
    pub on_miss: MissPolicy,
}

impl ScoringRule {
    pub fn fixed(check: Check, points: f64) -> Self {
        Self {
            check,
            award: Award::Fixed { points },
            anchor_stop: None,
            on_miss: MissPolicy::Ignore,
        }
    }

    pub fn with_award(mut self, award: Award) -> Self {
        self.award = award;
        self
    }

    pub fn anchored(mut self, stop_ratio: f64) -> Self {
        self.anchor_stop = Some(stop_ratio);
        self
    }

    pub fn warn_on_miss(mut self) -> Self {
        self.on_miss = MissPolicy::Warn;
        self
    }
}

// ─── Profile ─────────────────────────────────────────────────────────

/// Scored decisions at or above `strong` read "strong entry", at or above
/// the profile threshold "entry", otherwise "watch".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionLabels {
    pub strong: f64,
}

impl DecisionLabels {
    pub fn label(&self, score: f64, threshold: f64) -> &'static str {
        if score >= self.strong {
            "strong entry"
        } else if score >= threshold {
            "entry"
        } else {
            "watch"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub id: String,
    pub name: String,
    /// Shorter series yield an "insufficient data" result.
    pub min_bars: usize,
    pub gates: Vec<Gate>,
    pub rules: Vec<ScoringRule>,
    pub threshold: f64,
    pub pricing: PriceRules,
    #[serde(default)]
    pub labels: Option<DecisionLabels>,
}

impl StrategyProfile {
    pub fn from_toml(s: &str) -> Result<Self, ProfileError> {
        let profile: Self = toml::from_str(s)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |reason: &str| ProfileError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        };
        if self.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if self.min_bars == 0 {
            return Err(invalid("min_bars must be >= 1"));
        }
        if !self.threshold.is_finite() {
            return Err(invalid("threshold must be finite"));
        }
        for gate in &self.gates {
            if let Gate::RsRating { tiers } = gate {
                if tiers.is_empty() {
                    return Err(invalid("rs_rating gate needs at least one tier"));
                }
            }
        }
        for rule in &self.rules {
            if let Award::QualityFraction { divisor } = rule.award {
                if divisor <= 0.0 {
                    return Err(invalid("quality divisor must be positive"));
                }
            }
        }
        self.pricing.validate().map_err(|r| invalid(&r))
    }

    /// Largest score the profile can award; scores are not clamped to it.
    pub fn max_score(&self) -> f64 {
        let gates: f64 = self
            .gates
            .iter()
            .map(|g| match g {
                Gate::RsRating { tiers } => tiers.iter().map(|t| t.points).fold(0.0, f64::max),
                Gate::TrendTemplate { points, .. } => *points,
                Gate::MaAlignment => 100.0,
            })
            .sum();
        let rules: f64 = self
            .rules
            .iter()
            .map(|r| match &r.award {
                Award::Fixed { points } => *points,
                Award::QualityFraction { divisor } => (100.0 / divisor).floor(),
                Award::Tiered { tiers } => tiers.iter().map(|t| t.points).fold(0.0, f64::max),
            })
            .sum();
        gates + rules
    }
}
