//! Property tests for as-of schedules.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;

use leadscan_runner::{last_session_per_week, weekly_as_of_dates};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn weekday(i: u8) -> Weekday {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ][i as usize % 5]
}

proptest! {
    #[test]
    fn weekly_dates_are_in_range_and_a_week_apart(
        offset in 0i64..2000,
        span in 0i64..400,
        wd in 0u8..5,
    ) {
        let start = base() + Duration::days(offset);
        let end = start + Duration::days(span);
        let dates = weekly_as_of_dates(start, end, weekday(wd));

        prop_assert!(dates.iter().all(|d| *d >= start && *d <= end));
        prop_assert!(dates.iter().all(|d| d.weekday() == weekday(wd)));
        prop_assert!(dates.windows(2).all(|w| w[1] - w[0] == Duration::days(7)));
        // Every full week in the range contains exactly one match.
        prop_assert!(dates.len() as i64 >= (span + 1) / 7);
    }

    #[test]
    fn last_sessions_are_one_per_week(days in proptest::collection::vec(0i64..1500, 0..200)) {
        let dates: Vec<NaiveDate> = days.iter().map(|d| base() + Duration::days(*d)).collect();
        let last = last_session_per_week(&dates);

        prop_assert!(last.iter().all(|d| dates.contains(d)));
        prop_assert!(last.windows(2).all(|w| w[0] < w[1] && w[0].iso_week() != w[1].iso_week()));
        for d in &dates {
            let chosen = last.iter().find(|l| l.iso_week() == d.iso_week());
            prop_assert!(chosen.is_some_and(|c| c >= d));
        }
    }
}
