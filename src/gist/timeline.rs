//! Whole-unit "time since last commit" decomposition.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Years, months and days elapsed since a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub years: i32,
    pub months: i32,
    pub days: i64,
}

/// Inclusive, greedy whole-unit difference between `start` and `end`.
///
/// `end` is advanced by one day, then the largest `years`, `months` and
/// `days` are found in that order such that
/// `start + years + months + days < end`.  A `start` at or after the
/// inclusive end yields an all-zero timeline.
pub fn diff(start: DateTime<Utc>, end: DateTime<Utc>) -> Timeline {
    let end = end + Duration::days(1);
    if start >= end {
        return Timeline::default();
    }
    let before = |y: i32, m: i32, d: i64| add_date(start, y, m, d).is_some_and(|t| t < end);

    let mut years = 0;
    while before(years, 0, 0) {
        years += 1;
    }
    years -= 1;

    let mut months = 0;
    while before(years, months, 0) {
        months += 1;
    }
    months -= 1;

    let mut days = 0;
    while before(years, months, days) {
        days += 1;
    }
    days -= 1;

    Timeline {
        years,
        months,
        days,
    }
}

/// Calendar addition that carries overflowing days into the next month
/// (Jan 31 + 1 month = Mar 3, or Mar 2 in a leap year) and keeps the time of day.
fn add_date(t: DateTime<Utc>, years: i32, months: i32, days: i64) -> Option<DateTime<Utc>> {
    let month0 = t.month0() as i32 + months;
    let year = t.year().checked_add(years)?.checked_add(month0.div_euclid(12))?;
    let month = month0.rem_euclid(12) as u32 + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_signed(Duration::days(i64::from(t.day()) - 1 + days))?;
    Some(date.and_time(t.time()).and_utc())
}
