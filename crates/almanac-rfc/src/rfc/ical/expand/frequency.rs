//! Base period sequence of a recurrence rule (FREQ and INTERVAL).

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use super::calendar;
use crate::rfc::ical::core::{Frequency, Weekday};

/// Calendar unit a candidate value is expressed at.
///
/// Ordered from coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Granularity {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl Granularity {
    pub(crate) const fn of(freq: Frequency) -> Self {
        match freq {
            Frequency::Yearly => Self::Year,
            Frequency::Monthly => Self::Month,
            Frequency::Weekly => Self::Week,
            Frequency::Daily => Self::Day,
            Frequency::Hourly => Self::Hour,
            Frequency::Minutely => Self::Minute,
            Frequency::Secondly => Self::Second,
        }
    }

    /// Returns whether values at this granularity still span several days.
    pub(crate) fn is_coarser_than_day(self) -> bool {
        self < Self::Day
    }
}

/// A value inside the constraint chain.
///
/// `at` is the start of the unit named by `granularity`: January 1st for a
/// year, the 1st for a month, the week start for a week, midnight for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Candidate {
    pub(crate) at: NaiveDateTime,
    pub(crate) granularity: Granularity,
}

impl Candidate {
    pub(crate) const fn new(at: NaiveDateTime, granularity: Granularity) -> Self {
        Self { at, granularity }
    }

    pub(crate) fn day(date: NaiveDate) -> Self {
        Self::new(date.and_time(NaiveTime::MIN), Granularity::Day)
    }

    /// First and last day covered by this candidate.
    pub(crate) fn day_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.at.date();
        let last = match self.granularity {
            Granularity::Year => NaiveDate::from_ymd_opt(first.year(), 12, 31)?,
            Granularity::Month => NaiveDate::from_ymd_opt(
                first.year(),
                first.month(),
                calendar::days_in_month(first.year(), first.month()),
            )?,
            Granularity::Week => first.checked_add_days(Days::new(6))?,
            Granularity::Day | Granularity::Hour | Granularity::Minute | Granularity::Second => {
                first
            }
        };
        Some((first, last))
    }

    /// Every day covered by this candidate as a day candidate.
    pub(crate) fn days(&self) -> Vec<Self> {
        self.day_span()
            .map(|(first, last)| calendar::days_between(first, last).map(Self::day).collect())
            .unwrap_or_default()
    }
}

/// ## Summary
/// Lazily steps through the periods of a rule: one candidate per
/// `interval` units of `freq`, starting with the period containing the anchor.
///
/// The stream is addressable by period index so generation can resume at an
/// arbitrary period. Stepping past the representable date range ends it.
#[derive(Debug, Clone)]
pub(crate) struct FrequencyStream {
    freq: Frequency,
    interval: u32,
    /// Start of the period containing the anchor.
    base: NaiveDateTime,
    cursor: u64,
}

impl FrequencyStream {
    pub(crate) fn new(freq: Frequency, interval: u32, anchor: NaiveDateTime, wkst: Weekday) -> Option<Self> {
        let date = anchor.date();
        let base = match freq {
            Frequency::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_time(NaiveTime::MIN),
            Frequency::Monthly => {
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_time(NaiveTime::MIN)
            }
            Frequency::Weekly => calendar::week_start(date, wkst)?.and_time(NaiveTime::MIN),
            Frequency::Daily => date.and_time(NaiveTime::MIN),
            Frequency::Hourly => date.and_hms_opt(anchor.hour(), 0, 0)?,
            Frequency::Minutely => date.and_hms_opt(anchor.hour(), anchor.minute(), 0)?,
            Frequency::Secondly => {
                date.and_hms_opt(anchor.hour(), anchor.minute(), anchor.second())?
            }
        };
        Some(Self {
            freq,
            interval,
            base,
            cursor: 0,
        })
    }

    pub(crate) const fn granularity(&self) -> Granularity {
        Granularity::of(self.freq)
    }

    /// Index of the next period [`Iterator::next`] returns.
    pub(crate) const fn position(&self) -> u64 {
        self.cursor
    }

    pub(crate) fn seek(&mut self, index: u64) {
        self.cursor = index;
    }

    /// Returns the period with the given index, or `None` when it is not
    /// representable.
    pub(crate) fn period(&self, index: u64) -> Option<Candidate> {
        let steps = i64::try_from(index)
            .ok()?
            .checked_mul(i64::from(self.interval))?;
        let at = match self.freq {
            Frequency::Yearly => {
                let year = i64::from(self.base.year()).checked_add(steps)?;
                NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, 1, 1)?.and_time(NaiveTime::MIN)
            }
            Frequency::Monthly => {
                let months = i64::from(self.base.year())
                    .checked_mul(12)?
                    .checked_add(i64::from(self.base.month0()))?
                    .checked_add(steps)?;
                let year = i32::try_from(months.div_euclid(12)).ok()?;
                let month = u32::try_from(months.rem_euclid(12)).ok()? + 1;
                NaiveDate::from_ymd_opt(year, month, 1)?.and_time(NaiveTime::MIN)
            }
            Frequency::Weekly => self
                .base
                .checked_add_days(Days::new(u64::try_from(steps.checked_mul(7)?).ok()?))?,
            Frequency::Daily => self.base.checked_add_days(Days::new(u64::try_from(steps).ok()?))?,
            Frequency::Hourly => self.base.checked_add_signed(TimeDelta::try_hours(steps)?)?,
            Frequency::Minutely => self.base.checked_add_signed(TimeDelta::try_minutes(steps)?)?,
            Frequency::Secondly => self.base.checked_add_signed(TimeDelta::try_seconds(steps)?)?,
        };
        Some(Candidate::new(at, self.granularity()))
    }

    /// ## Summary
    /// Returns the index of the last period starting at or before `at`.
    ///
    /// Returns 0 when `at` precedes the first period.
    pub(crate) fn index_at_or_before(&self, at: NaiveDateTime) -> u64 {
        if at <= self.base {
            return 0;
        }
        let units = match self.freq {
            Frequency::Yearly => i64::from(at.year()) - i64::from(self.base.year()),
            Frequency::Monthly => {
                (i64::from(at.year()) - i64::from(self.base.year())) * 12
                    + i64::from(at.month0())
                    - i64::from(self.base.month0())
            }
            Frequency::Weekly => (at.date() - self.base.date()).num_days() / 7,
            Frequency::Daily => (at.date() - self.base.date()).num_days(),
            Frequency::Hourly => (at - self.base).num_hours(),
            Frequency::Minutely => (at - self.base).num_minutes(),
            Frequency::Secondly => (at - self.base).num_seconds(),
        };
        u64::try_from(units / i64::from(self.interval)).unwrap_or(0)
    }

    /// Returns the index of the first period starting at or after `at`.
    pub(crate) fn index_at_or_after(&self, at: NaiveDateTime) -> u64 {
        let index = self.index_at_or_before(at);
        match self.period(index) {
            Some(period) if period.at < at => index.saturating_add(1),
            _ => index,
        }
    }
}

impl Iterator for FrequencyStream {
    type Item = (u64, Candidate);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor;
        let period = self.period(index)?;
        self.cursor = index.checked_add(1)?;
        Some((index, period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn starts(stream: FrequencyStream, n: usize) -> Vec<NaiveDateTime> {
        stream.take(n).map(|(_, c)| c.at).collect()
    }

    #[test]
    fn monthly_steps_from_month_start() {
        let stream =
            FrequencyStream::new(Frequency::Monthly, 5, at(2020, 1, 31, 9, 0, 0), Weekday::Monday)
                .unwrap();
        assert_eq!(stream.granularity(), Granularity::Month);
        assert_eq!(
            starts(stream, 4),
            vec![
                at(2020, 1, 1, 0, 0, 0),
                at(2020, 6, 1, 0, 0, 0),
                at(2020, 11, 1, 0, 0, 0),
                at(2021, 4, 1, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn weekly_periods_align_to_week_start() {
        // 2020-01-08 is a Wednesday
        let anchor = at(2020, 1, 8, 10, 0, 0);
        let monday = FrequencyStream::new(Frequency::Weekly, 2, anchor, Weekday::Monday).unwrap();
        assert_eq!(
            starts(monday, 2),
            vec![at(2020, 1, 6, 0, 0, 0), at(2020, 1, 20, 0, 0, 0)]
        );
        let sunday = FrequencyStream::new(Frequency::Weekly, 1, anchor, Weekday::Sunday).unwrap();
        assert_eq!(starts(sunday, 1), vec![at(2020, 1, 5, 0, 0, 0)]);
    }

    #[test]
    fn sub_daily_periods_truncate_the_anchor() {
        let anchor = at(2020, 1, 1, 22, 45, 30);
        let hourly = FrequencyStream::new(Frequency::Hourly, 3, anchor, Weekday::Monday).unwrap();
        assert_eq!(
            starts(hourly, 2),
            vec![at(2020, 1, 1, 22, 0, 0), at(2020, 1, 2, 1, 0, 0)]
        );
        let minutely =
            FrequencyStream::new(Frequency::Minutely, 1, anchor, Weekday::Monday).unwrap();
        assert_eq!(starts(minutely, 1), vec![at(2020, 1, 1, 22, 45, 0)]);
    }

    #[test]
    fn index_lookup_brackets_a_value() {
        let stream =
            FrequencyStream::new(Frequency::Daily, 3, at(2020, 1, 1, 0, 0, 0), Weekday::Monday)
                .unwrap();
        let target = at(2020, 1, 8, 12, 0, 0);
        assert_eq!(stream.index_at_or_before(target), 2);
        assert_eq!(stream.period(2).unwrap().at, at(2020, 1, 7, 0, 0, 0));
        assert_eq!(stream.index_at_or_after(target), 3);
        assert_eq!(stream.index_at_or_before(at(2019, 1, 1, 0, 0, 0)), 0);

        let yearly =
            FrequencyStream::new(Frequency::Yearly, 4, at(2020, 2, 29, 0, 0, 0), Weekday::Monday)
                .unwrap();
        assert_eq!(yearly.index_at_or_before(at(2031, 6, 1, 0, 0, 0)), 2);
        assert_eq!(yearly.index_at_or_after(at(2024, 1, 1, 0, 0, 0)), 1);
    }

    #[test]
    fn stream_ends_past_representable_range() {
        let mut stream =
            FrequencyStream::new(Frequency::Yearly, 100_000, at(2020, 1, 1, 0, 0, 0), Weekday::Monday)
                .unwrap();
        assert!(stream.next().is_some());
        assert!(stream.nth(10).is_none());
    }

    #[test]
    fn candidate_day_spans() {
        let month = Candidate::new(at(2024, 2, 1, 0, 0, 0), Granularity::Month);
        assert_eq!(month.days().len(), 29);
        let week = Candidate::new(at(2024, 12, 30, 0, 0, 0), Granularity::Week);
        assert_eq!(week.days().len(), 7);
        assert!(Granularity::Week.is_coarser_than_day());
        assert!(!Granularity::Hour.is_coarser_than_day());
    }
}
