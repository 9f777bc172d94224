//! Trend template: eight moving-average and 52-week-range checks.
//!
//! Two variants exist and are kept as distinct check lists. `Classic` orders
//! the averages MA150 > MA200 at position 3 and checks MA50 > MA150 at 5;
//! `Stacked` checks MA50 > MA150 at 3 and MA50 above both longer averages at 5.

use crate::domain::{Bar, BarWindow, CriterionResult, TRADING_DAYS_PER_YEAR};
use crate::indicators::{Indicator, Sma};
use crate::issue::safe_ratio;
use serde::{Deserialize, Serialize};

/// Bars needed before the template is evaluated.
pub const TEMPLATE_MIN_BARS: usize = 200;

/// How far back the 200-bar average is re-measured to decide it is rising.
pub const MA200_SLOPE_BARS: usize = 20;

/// Points per passed check.
pub const POINTS_PER_CHECK: f64 = 12.5;

/// Score needed for a stage-2 uptrend (7 of 8).
pub const STAGE2_MIN_SCORE: f64 = 87.5;

const MIN_GAIN_FROM_LOW_PCT: f64 = 30.0;
const MAX_DISTANCE_FROM_HIGH_PCT: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCheck {
    CloseAboveMa150,
    CloseAboveMa200,
    Ma150AboveMa200,
    Ma50AboveMa150,
    Ma200Rising,
    Ma50AboveMa150And200,
    CloseAboveMa50,
    AboveYearLow,
    NearYearHigh,
}

impl TemplateCheck {
    pub fn name(self) -> &'static str {
        match self {
            TemplateCheck::CloseAboveMa150 => "close_above_ma150",
            TemplateCheck::CloseAboveMa200 => "close_above_ma200",
            TemplateCheck::Ma150AboveMa200 => "ma150_above_ma200",
            TemplateCheck::Ma50AboveMa150 => "ma50_above_ma150",
            TemplateCheck::Ma200Rising => "ma200_rising",
            TemplateCheck::Ma50AboveMa150And200 => "ma50_above_ma150_and_ma200",
            TemplateCheck::CloseAboveMa50 => "close_above_ma50",
            TemplateCheck::AboveYearLow => "30pct_above_52w_low",
            TemplateCheck::NearYearHigh => "within_25pct_of_52w_high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TemplateCheck::CloseAboveMa150 => "close > MA150",
            TemplateCheck::CloseAboveMa200 => "close > MA200",
            TemplateCheck::Ma150AboveMa200 => "MA150 > MA200",
            TemplateCheck::Ma50AboveMa150 => "MA50 > MA150",
            TemplateCheck::Ma200Rising => "MA200 rising",
            TemplateCheck::Ma50AboveMa150And200 => "MA50 > MA150 and MA200",
            TemplateCheck::CloseAboveMa50 => "close > MA50",
            TemplateCheck::AboveYearLow => "close >= 52-week low +30%",
            TemplateCheck::NearYearHigh => "close within 25% of 52-week high",
        }
    }

    /// Outcome and the measured value it was decided on.
    fn decide(self, s: &TemplateSnapshot) -> (bool, Option<f64>) {
        match self {
            TemplateCheck::CloseAboveMa150 => (s.close > s.ma150, Some(s.close - s.ma150)),
            TemplateCheck::CloseAboveMa200 => (s.close > s.ma200, Some(s.close - s.ma200)),
            TemplateCheck::Ma150AboveMa200 => (s.ma150 > s.ma200, Some(s.ma150 - s.ma200)),
            TemplateCheck::Ma50AboveMa150 => (s.ma50 > s.ma150, Some(s.ma50 - s.ma150)),
            TemplateCheck::Ma200Rising => match s.ma200_past {
                Some(past) => (s.ma200 > past, Some(s.ma200 - past)),
                None => (false, None),
            },
            TemplateCheck::Ma50AboveMa150And200 => (
                s.ma50 > s.ma150 && s.ma50 > s.ma200,
                Some(s.ma50 - s.ma150.max(s.ma200)),
            ),
            TemplateCheck::CloseAboveMa50 => (s.close > s.ma50, Some(s.close - s.ma50)),
            TemplateCheck::AboveYearLow => match s.gain_from_low_pct() {
                Some(gain) => (gain >= MIN_GAIN_FROM_LOW_PCT, Some(gain)),
                None => (false, None),
            },
            TemplateCheck::NearYearHigh => match s.distance_from_high_pct() {
                Some(dist) => (dist <= MAX_DISTANCE_FROM_HIGH_PCT, Some(dist)),
                None => (false, None),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateVariant {
    /// MA150 > MA200 third, MA50 > MA150 fifth.
    Classic,
    /// MA50 > MA150 third, MA50 above both longer averages fifth.
    Stacked,
}

impl TemplateVariant {
    pub fn checks(self) -> [TemplateCheck; 8] {
        use TemplateCheck::*;
        match self {
            TemplateVariant::Classic => [
                CloseAboveMa150,
                CloseAboveMa200,
                Ma150AboveMa200,
                Ma200Rising,
                Ma50AboveMa150,
                CloseAboveMa50,
                AboveYearLow,
                NearYearHigh,
            ],
            TemplateVariant::Stacked => [
                CloseAboveMa150,
                CloseAboveMa200,
                Ma50AboveMa150,
                Ma200Rising,
                Ma50AboveMa150And200,
                CloseAboveMa50,
                AboveYearLow,
                NearYearHigh,
            ],
        }
    }
}

/// Price and average levels at the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemplateSnapshot {
    pub close: f64,
    pub ma50: f64,
    pub ma150: f64,
    pub ma200: f64,
    /// 200-bar average as of 20 bars ago; absent with fewer than 220 bars.
    pub ma200_past: Option<f64>,
    pub high_52w: f64,
    pub low_52w: f64,
}

impl TemplateSnapshot {
    /// Levels at the last bar, or `None` below [`TEMPLATE_MIN_BARS`].
    pub fn capture(bars: &[Bar]) -> Option<Self> {
        if bars.len() < TEMPLATE_MIN_BARS {
            return None;
        }
        let ma200 = Sma::new(200);
        let year = bars.tail(TRADING_DAYS_PER_YEAR);
        Some(Self {
            close: bars.last_close()?,
            ma50: Sma::new(50).latest(bars)?,
            ma150: Sma::new(150).latest(bars)?,
            ma200: ma200.latest(bars)?,
            ma200_past: ma200.value_back(bars, MA200_SLOPE_BARS),
            high_52w: year.highest_high()?,
            low_52w: year.lowest_low()?,
        })
    }

    /// Percent above the 52-week low; `None` for a zero low.
    pub fn gain_from_low_pct(&self) -> Option<f64> {
        safe_ratio(self.close - self.low_52w, self.low_52w).map(|r| r * 100.0)
    }

    /// Percent below the 52-week high; `None` for a zero high.
    pub fn distance_from_high_pct(&self) -> Option<f64> {
        safe_ratio(self.high_52w - self.close, self.high_52w).map(|r| r * 100.0)
    }
}

/// Template outcome for one ticker at one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResult {
    pub variant: TemplateVariant,
    pub evaluated: bool,
    pub checks_passed: u8,
    pub score: f64,
    pub stage2: bool,
    pub checks: Vec<CriterionResult>,
    pub snapshot: Option<TemplateSnapshot>,
}

impl TemplateResult {
    pub fn passed(&self, check: TemplateCheck) -> bool {
        self.checks
            .iter()
            .any(|c| c.name == check.name() && c.passed)
    }
}

/// Evaluate the template on bars already truncated to the as-of date.
pub fn evaluate_template(bars: &[Bar], variant: TemplateVariant) -> TemplateResult {
    let Some(snapshot) = TemplateSnapshot::capture(bars) else {
        return TemplateResult {
            variant,
            evaluated: false,
            checks_passed: 0,
            score: 0.0,
            stage2: false,
            checks: variant
                .checks()
                .iter()
                .map(|c| CriterionResult::not_evaluated(c.name(), TEMPLATE_MIN_BARS, bars.len()))
                .collect(),
            snapshot: None,
        };
    };

    let checks: Vec<CriterionResult> = variant
        .checks()
        .iter()
        .map(|&check| {
            let (passed, value) = check.decide(&snapshot);
            CriterionResult::new(check.name(), passed, value, check.label())
        })
        .collect();
    let checks_passed = checks.iter().filter(|c| c.passed).count() as u8;
    let score = checks_passed as f64 * POINTS_PER_CHECK;

    TemplateResult {
        variant,
        evaluated: true,
        checks_passed,
        score,
        stage2: score >= STAGE2_MIN_SCORE,
        checks,
        snapshot: Some(snapshot),
    }
}
