//! Gregorian calendar arithmetic used by the expansion stages.
//!
//! Everything here is total: an unrepresentable date yields `None` and the
//! caller drops the candidate (RFC 5545 §3.3.10: invalid dates are ignored).

use chrono::{Datelike, Days, NaiveDate};

use crate::rfc::ical::core::Weekday;

/// Returns whether `year` is a leap year.
pub(crate) fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Returns the number of days in a month.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Returns the number of days in a year.
pub(crate) fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// ## Summary
/// Resolves a signed 1-based ordinal against a list of `len` entries.
///
/// `1` is the first entry and `-1` the last. Returns the 0-based index, or
/// `None` when the ordinal falls outside the list.
pub(crate) fn resolve_ordinal(ordinal: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if ordinal > 0 {
        ordinal - 1
    } else {
        len + ordinal
    };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// Returns the day `day` (signed, `-1` is the last day) of a month.
pub(crate) fn month_day(year: i32, month: u32, day: i8) -> Option<NaiveDate> {
    let len = usize::try_from(days_in_month(year, month)).ok()?;
    let index = resolve_ordinal(i64::from(day), len)?;
    NaiveDate::from_ymd_opt(year, month, u32::try_from(index).ok()? + 1)
}

/// Returns the day `day` (signed, `-1` is December 31st) of a year.
pub(crate) fn year_day(year: i32, day: i16) -> Option<NaiveDate> {
    let len = usize::try_from(days_in_year(year)).ok()?;
    let index = resolve_ordinal(i64::from(day), len)?;
    NaiveDate::from_yo_opt(year, u32::try_from(index).ok()? + 1)
}

/// Returns whether `date` is selected by a signed day-of-month list.
pub(crate) fn matches_month_day(date: NaiveDate, days: &[i8]) -> bool {
    let day = i64::from(date.day());
    let from_end = day - i64::from(days_in_month(date.year(), date.month())) - 1;
    days.iter()
        .any(|d| i64::from(*d) == day || i64::from(*d) == from_end)
}

/// Returns whether `date` is selected by a signed day-of-year list.
pub(crate) fn matches_year_day(date: NaiveDate, days: &[i16]) -> bool {
    let day = i64::from(date.ordinal());
    let from_end = day - i64::from(days_in_year(date.year())) - 1;
    days.iter()
        .any(|d| i64::from(*d) == day || i64::from(*d) == from_end)
}

/// Returns the start of the week containing `date`, weeks beginning on `wkst`.
pub(crate) fn week_start(date: NaiveDate, wkst: Weekday) -> Option<NaiveDate> {
    let offset = (date.weekday().num_days_from_monday() + 7
        - wkst.to_chrono().num_days_from_monday())
        % 7;
    date.checked_sub_days(Days::new(u64::from(offset)))
}

/// ## Summary
/// Returns the first day of week 1 of `year`.
///
/// Week 1 is the first week (starting on `wkst`) that contains at least four
/// days of the year (RFC 5545 §3.3.10, BYWEEKNO).
pub(crate) fn first_week_start(year: i32, wkst: Weekday) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let start = week_start(jan1, wkst)?;
    if (jan1 - start).num_days() >= 4 {
        start.checked_add_days(Days::new(7))
    } else {
        Some(start)
    }
}

/// Position of a date in the week numbering of its week-year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WeekNumber {
    /// Year the week is counted in; differs from the calendar year at the edges.
    pub(crate) week_year: i32,
    /// 1-based week number.
    pub(crate) week: i64,
    /// Number of weeks in `week_year` (52 or 53).
    pub(crate) weeks_in_year: i64,
}

/// Returns the week number of `date` for weeks beginning on `wkst`.
pub(crate) fn week_number(date: NaiveDate, wkst: Weekday) -> Option<WeekNumber> {
    let year = date.year();
    let next = first_week_start(year.checked_add(1)?, wkst)?;
    let (week_year, start, end) = if date >= next {
        let after = first_week_start(year.checked_add(2)?, wkst)?;
        (year + 1, next, after)
    } else {
        let this = first_week_start(year, wkst)?;
        if date >= this {
            (year, this, next)
        } else {
            let prev = first_week_start(year.checked_sub(1)?, wkst)?;
            (year - 1, prev, this)
        }
    };

    Some(WeekNumber {
        week_year,
        week: (date - start).num_days() / 7 + 1,
        weeks_in_year: (end - start).num_days() / 7,
    })
}

/// Returns whether `date` is selected by a signed week-number list.
pub(crate) fn matches_week_number(date: NaiveDate, wkst: Weekday, weeks: &[i8]) -> bool {
    let Some(number) = week_number(date, wkst) else {
        return false;
    };
    let from_end = number.week - number.weeks_in_year - 1;
    weeks
        .iter()
        .any(|w| i64::from(*w) == number.week || i64::from(*w) == from_end)
}

/// Iterates the days from `first` through `last`, inclusive.
pub(crate) fn days_between(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    first.iter_days().take_while(move |day| *day <= last)
}

/// ## Summary
/// Returns the days in `first..=last` falling on `weekday`, optionally
/// narrowed to the `ordinal`-th one (`-1` is the last).
pub(crate) fn weekdays_between(
    first: NaiveDate,
    last: NaiveDate,
    weekday: Weekday,
    ordinal: Option<i8>,
) -> Vec<NaiveDate> {
    let target = weekday.to_chrono();
    let Some(offset) = (0..7u64).find(|n| {
        first
            .checked_add_days(Days::new(*n))
            .is_some_and(|d| d.weekday() == target)
    }) else {
        return Vec::new();
    };

    let matching: Vec<NaiveDate> = first
        .checked_add_days(Days::new(offset))
        .into_iter()
        .flat_map(|start| start.iter_weeks())
        .take_while(|day| *day <= last)
        .collect();

    match ordinal {
        None => matching,
        Some(n) => resolve_ordinal(i64::from(n), matching.len())
            .and_then(|index| matching.get(index).copied())
            .into_iter()
            .collect(),
    }
}
