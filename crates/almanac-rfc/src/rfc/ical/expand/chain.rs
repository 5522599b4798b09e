//! BYxxx constraint pipeline (RFC 5545 §3.3.10).
//!
//! Each rule part is one [`Stage`]. A stage either expands a candidate into
//! finer candidates (BYMONTH under YEARLY yields one candidate per month) or
//! limits candidates that are already fine enough (BYDAY under DAILY keeps
//! matching weekdays). Stages run in [`ByRuleKind::EXPANSION_ORDER`] over one
//! period at a time, and every stage output is sorted and de-duplicated
//! before the next stage sees it.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::calendar;
use super::frequency::{Candidate, Granularity};
use crate::rfc::ical::core::{ByRule, ByRuleKind, Frequency, RecurrenceRule, Weekday, WeekdayNum};

/// One BYxxx rule part applied to a batch of candidates.
pub(crate) trait Stage: fmt::Debug + Send + Sync {
    fn kind(&self) -> ByRuleKind;

    /// Whether candidates at `granularity` are expanded rather than limited.
    fn expands(&self, granularity: Granularity) -> bool;

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate>;

    fn admits(&self, candidate: &Candidate) -> bool;

    fn apply(&self, batch: Vec<Candidate>) -> Vec<Candidate> {
        let mut out = Vec::with_capacity(batch.len());
        for candidate in batch {
            if self.expands(candidate.granularity) {
                out.extend(self.expand(&candidate));
            } else if self.admits(&candidate) {
                out.push(candidate);
            }
        }
        out
    }
}

#[derive(Debug)]
struct ByMonth {
    months: Vec<u8>,
}

impl ByMonth {
    fn contains(&self, date: NaiveDate) -> bool {
        self.months.iter().any(|m| u32::from(*m) == date.month())
    }
}

impl Stage for ByMonth {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::Month
    }

    fn expands(&self, granularity: Granularity) -> bool {
        matches!(granularity, Granularity::Year | Granularity::Week)
    }

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        match candidate.granularity {
            Granularity::Year => {
                let year = candidate.at.year();
                self.months
                    .iter()
                    .filter_map(|m| NaiveDate::from_ymd_opt(year, u32::from(*m), 1))
                    .map(|first| Candidate::new(first.and_time(NaiveTime::MIN), Granularity::Month))
                    .collect()
            }
            _ => candidate
                .days()
                .into_iter()
                .filter(|day| self.contains(day.at.date()))
                .collect(),
        }
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        self.contains(candidate.at.date())
    }
}

#[derive(Debug)]
struct ByWeekNo {
    weeks: Vec<i8>,
    wkst: Weekday,
}

impl Stage for ByWeekNo {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::WeekNo
    }

    fn expands(&self, granularity: Granularity) -> bool {
        granularity.is_coarser_than_day()
    }

    /// Only days inside the period are produced, so a year period yields the
    /// part of week 1 or of the last week that falls within that year.
    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        candidate
            .days()
            .into_iter()
            .filter(|day| self.admits(day))
            .collect()
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        calendar::matches_week_number(candidate.at.date(), self.wkst, &self.weeks)
    }
}

#[derive(Debug)]
struct ByYearDay {
    days: Vec<i16>,
}

impl Stage for ByYearDay {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::YearDay
    }

    fn expands(&self, granularity: Granularity) -> bool {
        granularity.is_coarser_than_day()
    }

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        match candidate.granularity {
            Granularity::Year => {
                let year = candidate.at.year();
                self.days
                    .iter()
                    .filter_map(|d| calendar::year_day(year, *d))
                    .map(Candidate::day)
                    .collect()
            }
            _ => candidate
                .days()
                .into_iter()
                .filter(|day| self.admits(day))
                .collect(),
        }
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        calendar::matches_year_day(candidate.at.date(), &self.days)
    }
}

#[derive(Debug)]
struct ByMonthDay {
    days: Vec<i8>,
}

impl Stage for ByMonthDay {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::MonthDay
    }

    fn expands(&self, granularity: Granularity) -> bool {
        granularity.is_coarser_than_day()
    }

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        let year = candidate.at.year();
        match candidate.granularity {
            Granularity::Year => (1..=12)
                .flat_map(|month| {
                    self.days
                        .iter()
                        .filter_map(move |d| calendar::month_day(year, month, *d))
                })
                .map(Candidate::day)
                .collect(),
            Granularity::Month => self
                .days
                .iter()
                .filter_map(|d| calendar::month_day(year, candidate.at.month(), *d))
                .map(Candidate::day)
                .collect(),
            _ => candidate
                .days()
                .into_iter()
                .filter(|day| self.admits(day))
                .collect(),
        }
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        calendar::matches_month_day(candidate.at.date(), &self.days)
    }
}

#[derive(Debug)]
struct ByDay {
    days: Vec<WeekdayNum>,
    /// Period an ordinal counts within when limiting day candidates.
    ordinal_scope: Granularity,
}

impl ByDay {
    fn admits_date(&self, date: NaiveDate) -> bool {
        let weekday = Weekday::from_chrono(date.weekday());
        self.days
            .iter()
            .filter(|day| day.weekday == weekday)
            .any(|day| match day.ordinal {
                None => true,
                Some(n) => {
                    let first = match self.ordinal_scope {
                        Granularity::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
                        _ => NaiveDate::from_ymd_opt(date.year(), 1, 1),
                    };
                    first
                        .map(|first| Candidate::new(first.and_time(NaiveTime::MIN), self.ordinal_scope))
                        .and_then(|scope| scope.day_span())
                        .is_some_and(|(first, last)| {
                            calendar::weekdays_between(first, last, weekday, Some(n)) == [date]
                        })
                }
            })
    }
}

impl Stage for ByDay {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::Day
    }

    fn expands(&self, granularity: Granularity) -> bool {
        granularity.is_coarser_than_day()
    }

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        match candidate.granularity {
            Granularity::Year | Granularity::Month => {
                let Some((first, last)) = candidate.day_span() else {
                    return Vec::new();
                };
                self.days
                    .iter()
                    .flat_map(|day| calendar::weekdays_between(first, last, day.weekday, day.ordinal))
                    .map(Candidate::day)
                    .collect()
            }
            _ => candidate
                .days()
                .into_iter()
                .filter(|day| {
                    let weekday = Weekday::from_chrono(day.at.weekday());
                    self.days.iter().any(|d| d.weekday == weekday)
                })
                .collect(),
        }
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        self.admits_date(candidate.at.date())
    }
}

#[derive(Debug)]
struct ByHour {
    hours: Vec<u8>,
}

impl Stage for ByHour {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::Hour
    }

    fn expands(&self, granularity: Granularity) -> bool {
        granularity < Granularity::Hour
    }

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        let date = candidate.at.date();
        self.hours
            .iter()
            .filter_map(|h| date.and_hms_opt(u32::from(*h), 0, 0))
            .map(|at| Candidate::new(at, Granularity::Hour))
            .collect()
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        self.hours.iter().any(|h| u32::from(*h) == candidate.at.hour())
    }
}

#[derive(Debug)]
struct ByMinute {
    minutes: Vec<u8>,
}

impl Stage for ByMinute {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::Minute
    }

    fn expands(&self, granularity: Granularity) -> bool {
        granularity < Granularity::Minute
    }

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        let at = candidate.at;
        self.minutes
            .iter()
            .filter_map(|m| at.date().and_hms_opt(at.hour(), u32::from(*m), 0))
            .map(|at| Candidate::new(at, Granularity::Minute))
            .collect()
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        self.minutes
            .iter()
            .any(|m| u32::from(*m) == candidate.at.minute())
    }
}

#[derive(Debug)]
struct BySecond {
    seconds: Vec<u8>,
}

impl Stage for BySecond {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::Second
    }

    fn expands(&self, granularity: Granularity) -> bool {
        granularity < Granularity::Second
    }

    /// Second 60 has no wall-clock representation and is dropped.
    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        let at = candidate.at;
        self.seconds
            .iter()
            .filter_map(|s| {
                at.date()
                    .and_hms_opt(at.hour(), at.minute(), u32::from(*s))
            })
            .map(|at| Candidate::new(at, Granularity::Second))
            .collect()
    }

    fn admits(&self, candidate: &Candidate) -> bool {
        self.seconds
            .iter()
            .any(|s| u32::from(*s) == candidate.at.second())
    }
}

/// Selects by position within the whole period, so it never limits or
/// expands single candidates.
#[derive(Debug)]
struct BySetPos {
    positions: Vec<i16>,
}

impl Stage for BySetPos {
    fn kind(&self) -> ByRuleKind {
        ByRuleKind::SetPos
    }

    fn expands(&self, _granularity: Granularity) -> bool {
        false
    }

    fn expand(&self, candidate: &Candidate) -> Vec<Candidate> {
        vec![*candidate]
    }

    fn admits(&self, _candidate: &Candidate) -> bool {
        true
    }

    fn apply(&self, batch: Vec<Candidate>) -> Vec<Candidate> {
        let mut selected: Vec<Candidate> = self
            .positions
            .iter()
            .filter_map(|pos| calendar::resolve_ordinal(i64::from(*pos), batch.len()))
            .filter_map(|index| batch.get(index).copied())
            .collect();
        selected.sort_unstable();
        selected.dedup();
        selected
    }
}

/// ## Summary
/// Fills in the rule parts RFC 5545 derives from DTSTART.
///
/// A rule without any day-selecting part repeats on the anchor's day
/// (YEARLY: month and day, MONTHLY: day of month, WEEKLY: weekday), and a
/// DATE-TIME rule repeats at the anchor's time for every unit coarser than
/// the frequency. Returns the parts in expansion order.
pub(crate) fn normalize(rule: &RecurrenceRule, anchor: NaiveDateTime, date_only: bool) -> Vec<ByRule> {
    let mut parts = rule.by_rules().to_vec();
    let has = |parts: &[ByRule], kind: ByRuleKind| parts.iter().any(|p| p.kind() == kind);

    let selects_days = [
        ByRuleKind::WeekNo,
        ByRuleKind::YearDay,
        ByRuleKind::MonthDay,
        ByRuleKind::Day,
    ]
    .into_iter()
    .any(|kind| has(&parts, kind));

    let date = anchor.date();
    let month = u8::try_from(date.month()).ok();
    let day = i8::try_from(date.day()).ok();

    if !selects_days {
        match rule.frequency() {
            Frequency::Yearly => {
                if !has(&parts, ByRuleKind::Month) {
                    parts.extend(month.map(|m| ByRule::Month(vec![m])));
                }
                parts.extend(day.map(|d| ByRule::MonthDay(vec![d])));
            }
            Frequency::Monthly => parts.extend(day.map(|d| ByRule::MonthDay(vec![d]))),
            Frequency::Weekly => parts.push(ByRule::Day(vec![WeekdayNum::every(
                Weekday::from_chrono(date.weekday()),
            )])),
            _ => {}
        }
    }

    if !date_only {
        let granularity = Granularity::of(rule.frequency());
        let time_parts = [
            (Granularity::Hour, ByRuleKind::Hour, anchor.hour()),
            (Granularity::Minute, ByRuleKind::Minute, anchor.minute()),
            (Granularity::Second, ByRuleKind::Second, anchor.second()),
        ];
        for (unit, kind, value) in time_parts {
            if granularity >= unit || has(&parts, kind) {
                continue;
            }
            let Ok(value) = u8::try_from(value) else {
                continue;
            };
            parts.push(match kind {
                ByRuleKind::Hour => ByRule::Hour(vec![value]),
                ByRuleKind::Minute => ByRule::Minute(vec![value]),
                _ => ByRule::Second(vec![value]),
            });
        }
    }

    parts.sort_by_key(|part| part.kind().expansion_rank());
    parts
}

/// The compiled BYxxx pipeline of one rule and anchor.
#[derive(Debug)]
pub(crate) struct ConstraintChain {
    date_stages: Vec<Box<dyn Stage>>,
    time_stages: Vec<Box<dyn Stage>>,
    set_pos: Option<BySetPos>,
    barren: bool,
}

impl ConstraintChain {
    pub(crate) fn compile(rule: &RecurrenceRule, anchor: NaiveDateTime, date_only: bool) -> Self {
        let parts = normalize(rule, anchor, date_only);
        let ordinal_scope = if rule.frequency() == Frequency::Monthly
            || parts.iter().any(|p| p.kind() == ByRuleKind::Month)
        {
            Granularity::Month
        } else {
            Granularity::Year
        };

        let mut chain = Self {
            date_stages: Vec::new(),
            time_stages: Vec::new(),
            set_pos: None,
            barren: false,
        };

        for part in parts {
            match part {
                ByRule::Month(months) => chain.date_stages.push(Box::new(ByMonth { months })),
                ByRule::WeekNo(weeks) => chain.date_stages.push(Box::new(ByWeekNo {
                    weeks,
                    wkst: rule.week_start(),
                })),
                ByRule::YearDay(days) => chain.date_stages.push(Box::new(ByYearDay { days })),
                ByRule::MonthDay(days) => chain.date_stages.push(Box::new(ByMonthDay { days })),
                ByRule::Day(days) => chain.date_stages.push(Box::new(ByDay {
                    days,
                    ordinal_scope,
                })),
                ByRule::Hour(hours) => chain.time_stages.push(Box::new(ByHour { hours })),
                ByRule::Minute(minutes) => chain.time_stages.push(Box::new(ByMinute { minutes })),
                ByRule::Second(seconds) => {
                    chain.barren |= seconds.iter().all(|s| *s >= 60);
                    chain.time_stages.push(Box::new(BySecond { seconds }));
                }
                ByRule::SetPos(positions) => chain.set_pos = Some(BySetPos { positions }),
            }
        }

        tracing::trace!(
            stages = ?chain.stage_kinds(),
            barren = chain.barren,
            "Compiled constraint chain"
        );
        chain
    }

    /// Rule parts in the order they run.
    pub(crate) fn stage_kinds(&self) -> Vec<ByRuleKind> {
        self.date_stages
            .iter()
            .chain(&self.time_stages)
            .map(|stage| stage.kind())
            .chain(self.set_pos.as_ref().map(|stage| stage.kind()))
            .collect()
    }

    /// Whether no period can ever produce a value.
    pub(crate) const fn is_barren(&self) -> bool {
        self.barren
    }

    /// Whether the day-level parts accept `date`.
    pub(crate) fn admits_day(&self, date: NaiveDate) -> bool {
        let day = Candidate::day(date);
        self.date_stages.iter().all(|stage| stage.admits(&day))
    }

    /// ## Summary
    /// Expands one frequency period into its sorted, de-duplicated values.
    pub(crate) fn expand(&self, period: Candidate) -> Vec<NaiveDateTime> {
        let mut batch = vec![period];
        for stage in &self.date_stages {
            batch = run_stage(stage.as_ref(), batch);
        }

        if batch.iter().any(|c| c.granularity.is_coarser_than_day()) {
            batch = batch
                .into_iter()
                .flat_map(|c| {
                    if c.granularity.is_coarser_than_day() {
                        c.days()
                    } else {
                        vec![c]
                    }
                })
                .collect();
            batch.sort_unstable();
            batch.dedup();
        }

        for stage in &self.time_stages {
            batch = run_stage(stage.as_ref(), batch);
        }

        if let Some(set_pos) = &self.set_pos {
            batch = set_pos.apply(batch);
        }

        batch.into_iter().map(|c| c.at).collect()
    }
}

fn run_stage(stage: &dyn Stage, batch: Vec<Candidate>) -> Vec<Candidate> {
    if batch.is_empty() {
        return batch;
    }
    let mut out = stage.apply(batch);
    out.sort_unstable();
    out.dedup();
    out
}
