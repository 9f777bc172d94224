//! As-of date schedules for backtests.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// How the as-of dates of a backtest are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Every given weekday in the range, traded or not.
    Weekly { weekday: Weekday },
    /// The last trading session of each ISO week present in the data.
    LastSessionOfWeek,
    /// Every trading session in the range.
    Daily,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Weekly {
            weekday: Weekday::Fri,
        }
    }
}

impl Schedule {
    /// Resolve to ascending as-of dates within `[start, end]`.
    ///
    /// `sessions` is the set of dates any ticker traded; the calendar-based
    /// weekly schedule ignores it.
    pub fn resolve(&self, start: NaiveDate, end: NaiveDate, sessions: &[NaiveDate]) -> Vec<NaiveDate> {
        let mut in_range: Vec<NaiveDate> = sessions
            .iter()
            .copied()
            .filter(|d| *d >= start && *d <= end)
            .collect();
        in_range.sort();
        in_range.dedup();

        match self {
            Schedule::Weekly { weekday } => weekly_as_of_dates(start, end, *weekday),
            Schedule::LastSessionOfWeek => last_session_per_week(&in_range),
            Schedule::Daily => in_range,
        }
    }
}

/// Every `weekday` between `start` and `end`, both inclusive.
pub fn weekly_as_of_dates(start: NaiveDate, end: NaiveDate, weekday: Weekday) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let offset = (7 + weekday.num_days_from_monday() as i64
        - start.weekday().num_days_from_monday() as i64)
        % 7;
    let mut current = start + Duration::days(offset);
    let mut dates = Vec::new();
    while current <= end {
        dates.push(current);
        current += Duration::days(7);
    }
    dates
}

/// Last date of each ISO week in `dates`, ascending.
pub fn last_session_per_week(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut sorted = dates.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut out: Vec<NaiveDate> = Vec::new();
    for date in sorted {
        let week = date.iso_week();
        match out.last_mut() {
            Some(last) if last.iso_week() == week => *last = date,
            _ => out.push(date),
        }
    }
    out
}
