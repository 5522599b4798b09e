//! Compiled rules and their bounded, resumable value sequences.
//!
//! A [`RulePlan`] is a rule checked against its anchor: UNTIL converted into
//! the anchor's frame, the BYxxx chain normalised and compiled. A
//! [`RuleSequence`] pulls periods from the frequency stream one at a time,
//! expands each through the chain and applies COUNT and UNTIL.
//!
//! Zoned values leave the sequence in canonical wall-clock form: a value
//! generated inside a DST gap is moved past the gap before it is bounded,
//! counted or compared.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{Datelike, NaiveDateTime, NaiveTime, TimeDelta};

use super::cache::{self, RecurrenceCache, RuleCursor};
use super::chain::ConstraintChain;
use super::frequency::FrequencyStream;
use crate::rfc::ical::core::{
    Frequency, RecurrenceError, RecurrenceResult, RecurrenceRule, Temporal, TemporalKind, Zone,
};

/// The Gregorian calendar repeats every 400 years, so a rule idle for
/// `400 × INTERVAL` years never produces again.
const IDLE_YEARS: i64 = 400;

/// Days a DST gap can move a value forward.
const GAP_REACH_DAYS: i64 = 1;

/// A rule compiled against one anchor.
#[derive(Debug)]
pub(crate) struct RulePlan {
    freq: Frequency,
    interval: u32,
    kind: TemporalKind,
    anchor: NaiveDateTime,
    count: Option<u32>,
    until: Option<NaiveDateTime>,
    stream: FrequencyStream,
    chain: ConstraintChain,
}

impl RulePlan {
    /// ## Summary
    /// Checks `rule` against `anchor` and compiles it.
    ///
    /// ## Errors
    /// Returns `MalformedRule` when a DATE anchor is combined with a
    /// sub-daily frequency or a time-of-day part, and `TypeMismatch` when
    /// UNTIL is of a different variant than the anchor.
    pub(crate) fn compile(rule: &RecurrenceRule, anchor: &Temporal) -> RecurrenceResult<Self> {
        let kind = anchor.kind();
        let date_only = kind == TemporalKind::Date;

        if date_only {
            if rule.frequency().is_sub_daily() {
                return Err(RecurrenceError::malformed(
                    "FREQ",
                    format!("{} requires a DATE-TIME anchor", rule.frequency()),
                ));
            }
            if let Some(part) = rule.by_rules().iter().find(|p| p.kind().is_time_part()) {
                return Err(RecurrenceError::malformed(
                    part.kind().as_str(),
                    "requires a DATE-TIME anchor",
                ));
            }
        }

        let until = rule
            .until()
            .map(|until| {
                kind.localize(until).ok_or(RecurrenceError::TypeMismatch {
                    role: "UNTIL",
                    expected: kind,
                    found: until.kind(),
                })
            })
            .transpose()?;

        let local = anchor.local();
        let stream = FrequencyStream::new(rule.frequency(), rule.interval(), local, rule.week_start())
            .ok_or_else(|| {
                RecurrenceError::malformed("FREQ", "anchor period is outside the supported date range")
            })?;

        Ok(Self {
            freq: rule.frequency(),
            interval: rule.interval(),
            kind,
            anchor: local,
            count: rule.count(),
            until,
            stream,
            chain: ConstraintChain::compile(rule, local, date_only),
        })
    }

    pub(crate) const fn is_count_bounded(&self) -> bool {
        self.count.is_some()
    }

    /// Whether canonical values can lie ahead of the wall-clock they were
    /// generated from.
    const fn has_gaps(&self) -> bool {
        matches!(self.kind, TemporalKind::Zoned(Zone::Named(_)))
    }

    #[cfg(test)]
    pub(crate) fn stage_kinds(&self) -> Vec<crate::rfc::ical::core::ByRuleKind> {
        self.chain.stage_kinds()
    }
}

/// ## Summary
/// Lazily produces the rule's values at or after `floor`, in ascending order.
///
/// Values before the anchor are dropped and not counted. COUNT always counts
/// from the anchor, so a COUNT rule resumes only from checkpoints (which
/// carry the number of values emitted before them); other rules also seek
/// arithmetically to the period before the one containing `floor`.
///
/// Canonical values wait in `pending`, sorted and deduplicated, until the
/// generated wall-clock has caught up with them. Canonicalization never
/// moves a value backwards, so nothing generated later can sort before them.
#[derive(Debug)]
pub(crate) struct RuleSequence<'a> {
    plan: &'a RulePlan,
    stream: FrequencyStream,
    floor: NaiveDateTime,
    emitted: u64,
    pending: VecDeque<NaiveDateTime>,
    /// Last generated wall-clock value, before canonicalization.
    generated: Option<NaiveDateTime>,
    /// Year of the last period that produced a value.
    idle_since: Option<i32>,
    done: bool,
    cache: &'a Mutex<RecurrenceCache>,
    checkpoint_interval: u64,
}

impl<'a> RuleSequence<'a> {
    pub(crate) fn new(
        plan: &'a RulePlan,
        floor: NaiveDateTime,
        cache: &'a Mutex<RecurrenceCache>,
        checkpoint_interval: u32,
    ) -> Self {
        let mut resume = RuleCursor::START;
        if !plan.is_count_bounded() {
            let reach = if plan.has_gaps() {
                floor
                    .checked_sub_signed(TimeDelta::days(GAP_REACH_DAYS))
                    .unwrap_or(floor)
            } else {
                floor
            };
            resume.period = plan.stream.index_at_or_before(reach).saturating_sub(1);
        }
        if let Some((key, checkpoint)) = cache::lock(cache).closest(floor)
            && checkpoint.period > resume.period
        {
            tracing::trace!(key = %key, period = checkpoint.period, "Resuming from checkpoint");
            resume = checkpoint;
        }
        tracing::trace!(
            floor = %floor,
            period = resume.period,
            emitted = resume.emitted,
            "Starting rule sequence"
        );

        let mut stream = plan.stream.clone();
        stream.seek(resume.period);

        let done = plan.chain.is_barren()
            || plan.count.is_some_and(|count| resume.emitted >= u64::from(count));
        if plan.chain.is_barren() {
            tracing::warn!("Rule can never produce a value");
        }

        Self {
            plan,
            stream,
            floor,
            emitted: resume.emitted,
            pending: VecDeque::new(),
            generated: None,
            idle_since: None,
            done,
            cache,
            checkpoint_interval: u64::from(checkpoint_interval.max(1)),
        }
    }

    /// Expands the next period into `pending`.
    fn advance(&mut self) {
        let Some((index, period)) = self.stream.next() else {
            tracing::trace!("Frequency stream left the representable range");
            self.done = true;
            return;
        };

        if self.plan.until.is_some_and(|until| period.at > until) {
            self.done = true;
            return;
        }

        // a held value could belong after this period's values
        if index > 0 && index % self.checkpoint_interval == 0 && self.pending.is_empty() {
            cache::lock(self.cache).record(
                period.at,
                RuleCursor {
                    period: index,
                    emitted: self.emitted,
                },
            );
        }

        let idle_since = *self.idle_since.get_or_insert(period.at.year());

        let produced = if self.plan.freq.is_sub_daily() && !self.plan.chain.admits_day(period.at.date()) {
            self.skip_day(period.at);
            false
        } else {
            self.take_period(period.at, self.plan.chain.expand(period))
        };

        if produced {
            self.idle_since = Some(period.at.year());
        } else if i64::from(period.at.year()) - i64::from(idle_since)
            > IDLE_YEARS * i64::from(self.plan.interval)
        {
            tracing::warn!(
                since = idle_since,
                until = period.at.year(),
                "Rule stopped producing occurrences; ending sequence"
            );
            self.done = true;
        }
    }

    /// Moves a sub-daily stream past the rest of a day the rule rejects.
    fn skip_day(&mut self, at: NaiveDateTime) {
        let Some(next_day) = at.date().succ_opt() else {
            self.done = true;
            return;
        };
        let next = self
            .stream
            .index_at_or_after(next_day.and_time(NaiveTime::MIN));
        if next > self.stream.position() {
            self.stream.seek(next);
        }
    }

    fn take_period(&mut self, period_start: NaiveDateTime, values: Vec<NaiveDateTime>) -> bool {
        let mut produced = false;
        for generated in values {
            if generated < self.plan.anchor {
                continue;
            }
            if self.plan.until.is_some_and(|until| generated > until) {
                self.done = true;
                break;
            }
            self.generated = Some(generated);

            let value = self.plan.kind.canonical(generated);
            if self.plan.until.is_some_and(|until| value > until) {
                continue;
            }
            let Err(slot) = self.pending.binary_search(&value) else {
                tracing::trace!(value = %value, "Generated value repeats an instant");
                continue;
            };
            produced = true;
            self.emitted += 1;
            self.pending.insert(slot, value);
            if self
                .plan
                .count
                .is_some_and(|count| self.emitted >= u64::from(count))
            {
                tracing::trace!(period = %period_start, emitted = self.emitted, "COUNT reached");
                self.done = true;
                break;
            }
        }
        produced
    }

    /// The first pending value, once nothing generated later can precede it.
    fn settled(&mut self) -> Option<NaiveDateTime> {
        let front = *self.pending.front()?;
        let settled = self.done || self.generated.is_some_and(|generated| front <= generated);
        if settled {
            self.pending.pop_front()
        } else {
            None
        }
    }
}

impl Iterator for RuleSequence<'_> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.settled() {
                if value >= self.floor {
                    return Some(value);
                }
                continue;
            }
            if self.done {
                return None;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rfc::ical::core::{ByRule, ByRuleKind, Weekday, WeekdayNum};
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn day(y: i32, mo: u32, d: u32) -> NaiveDateTime {
        at(y, mo, d, 0, 0, 0)
    }

    fn plan(rule: RecurrenceRule, anchor: Temporal) -> RulePlan {
        RulePlan::compile(&rule, &anchor).unwrap()
    }

    fn values(plan: &RulePlan, floor: NaiveDateTime, limit: usize) -> Vec<NaiveDateTime> {
        let cache = Mutex::new(RecurrenceCache::new(64));
        RuleSequence::new(plan, floor, &cache, 4).take(limit).collect()
    }

    #[test]
    fn daily_count_from_anchor() {
        let plan = plan(
            RecurrenceRule::daily().with_count(5).build().unwrap(),
            Temporal::ymd(2020, 1, 1).unwrap(),
        );
        let all = values(&plan, day(2020, 1, 1), 100);
        assert_eq!(all.len(), 5);
        assert_eq!(all.first(), Some(&day(2020, 1, 1)));
        assert_eq!(all.last(), Some(&day(2020, 1, 5)));
    }

    #[test]
    fn count_is_measured_from_the_anchor_not_the_floor() {
        let plan = plan(
            RecurrenceRule::daily().with_count(10).build().unwrap(),
            Temporal::ymd(2020, 1, 1).unwrap(),
        );
        assert_eq!(
            values(&plan, day(2020, 1, 8), 100),
            vec![day(2020, 1, 8), day(2020, 1, 9), day(2020, 1, 10)]
        );
    }

    #[test]
    fn values_before_the_anchor_are_not_counted() {
        let plan = plan(
            RecurrenceRule::monthly()
                .with_by_monthday(vec![1, 15, 20])
                .with_count(3)
                .build()
                .unwrap(),
            Temporal::ymd(2020, 1, 10).unwrap(),
        );
        assert_eq!(
            values(&plan, day(2020, 1, 1), 100),
            vec![day(2020, 1, 15), day(2020, 1, 20), day(2020, 2, 1)]
        );
    }

    #[test]
    fn until_is_inclusive() {
        let plan = plan(
            RecurrenceRule::weekly()
                .with_by_day(vec![
                    WeekdayNum::every(Weekday::Tuesday),
                    WeekdayNum::every(Weekday::Thursday),
                ])
                .with_until(Temporal::ymd(2020, 1, 16).unwrap())
                .build()
                .unwrap(),
            Temporal::ymd(2020, 1, 7).unwrap(),
        );
        assert_eq!(
            values(&plan, day(2020, 1, 7), 100),
            vec![day(2020, 1, 7), day(2020, 1, 9), day(2020, 1, 14), day(2020, 1, 16)]
        );
    }

    #[test]
    fn until_in_another_zone_is_converted() {
        let berlin = crate::rfc::ical::core::Zone::from_tzid("Europe/Berlin").unwrap();
        let plan = plan(
            RecurrenceRule::daily()
                .with_until(Temporal::utc_ymd_hms(2020, 1, 3, 8, 0, 0).unwrap())
                .build()
                .unwrap(),
            Temporal::zoned_ymd_hms(2020, 1, 1, 9, 0, 0, berlin).unwrap(),
        );
        // 08:00Z is 09:00 in Berlin, so the third day is included
        assert_eq!(values(&plan, at(2020, 1, 1, 0, 0, 0), 100).len(), 3);
    }

    #[test]
    fn anchor_checks() {
        let date = Temporal::ymd(2020, 1, 1).unwrap();
        let hourly = RecurrenceRule::with_frequency(Frequency::Hourly).build().unwrap();
        assert!(matches!(
            RulePlan::compile(&hourly, &date),
            Err(RecurrenceError::MalformedRule { element: "FREQ", .. })
        ));

        let by_hour = RecurrenceRule::daily()
            .with_by_rule(ByRule::Hour(vec![9]))
            .build()
            .unwrap();
        assert!(matches!(
            RulePlan::compile(&by_hour, &date),
            Err(RecurrenceError::MalformedRule { element: "BYHOUR", .. })
        ));

        let floating_until = RecurrenceRule::daily()
            .with_until(Temporal::floating_ymd_hms(2020, 2, 1, 0, 0, 0).unwrap())
            .build()
            .unwrap();
        assert!(matches!(
            RulePlan::compile(&floating_until, &date),
            Err(RecurrenceError::TypeMismatch { role: "UNTIL", .. })
        ));
    }

    #[test_log::test]
    fn unproductive_rule_terminates() {
        let plan = plan(
            RecurrenceRule::yearly()
                .with_by_month(vec![2])
                .with_by_monthday(vec![30])
                .build()
                .unwrap(),
            Temporal::ymd(2020, 1, 1).unwrap(),
        );
        assert!(values(&plan, day(2020, 1, 1), 10).is_empty());
    }

    #[test_log::test]
    fn barren_rule_yields_nothing() {
        let plan = plan(
            RecurrenceRule::with_frequency(Frequency::Minutely)
                .with_by_rule(ByRule::Second(vec![60]))
                .build()
                .unwrap(),
            Temporal::floating_ymd_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        );
        assert!(values(&plan, day(2020, 1, 1), 10).is_empty());
    }

    #[test]
    fn sub_daily_rule_skips_rejected_days() {
        let plan = plan(
            RecurrenceRule::with_frequency(Frequency::Hourly)
                .with_interval(5)
                .with_by_month(vec![3])
                .build()
                .unwrap(),
            Temporal::floating_ymd_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        );
        let first = values(&plan, day(2020, 1, 1), 2);
        // Periods fall every five hours from 2020-01-01T00:00; 1440 hours
        // later is 2020-03-01T00:00.
        assert_eq!(first, vec![at(2020, 3, 1, 0, 0, 0), at(2020, 3, 1, 5, 0, 0)]);
        assert_eq!(plan.stage_kinds(), vec![ByRuleKind::Month, ByRuleKind::Minute, ByRuleKind::Second]);
    }

    #[test]
    fn resuming_from_checkpoints_is_transparent() {
        let plan = plan(
            RecurrenceRule::daily().with_interval(3).with_count(200).build().unwrap(),
            Temporal::ymd(2020, 1, 1).unwrap(),
        );
        let cache = Mutex::new(RecurrenceCache::new(64));
        let full: Vec<_> = RuleSequence::new(&plan, day(2020, 1, 1), &cache, 4).collect();
        assert_eq!(full.len(), 200);
        assert!(!cache::lock(&cache).is_empty());

        let floor = day(2021, 1, 1);
        let resumed: Vec<_> = RuleSequence::new(&plan, floor, &cache, 4).collect();
        let expected: Vec<_> = full.iter().copied().filter(|v| *v >= floor).collect();
        assert_eq!(resumed, expected);
    }

    #[test]
    fn arithmetic_seek_matches_full_replay() {
        let plan = plan(
            RecurrenceRule::monthly()
                .with_by_day(vec![WeekdayNum::nth(2, Weekday::Wednesday)])
                .build()
                .unwrap(),
            Temporal::floating_ymd_hms(2020, 1, 8, 18, 30, 0).unwrap(),
        );
        let floor = at(2031, 7, 1, 0, 0, 0);
        let from_anchor: Vec<_> = values(&plan, day(2020, 1, 1), 400)
            .into_iter()
            .filter(|v| *v >= floor)
            .take(5)
            .collect();
        assert_eq!(values(&plan, floor, 5), from_anchor);
        assert_eq!(from_anchor.first(), Some(&at(2031, 7, 9, 18, 30, 0)));
    }

    fn berlin_at(d: u32, h: u32, mi: u32) -> Temporal {
        let berlin = Zone::from_tzid("Europe/Berlin").unwrap();
        Temporal::zoned_ymd_hms(2026, 3, d, h, mi, 0, berlin).unwrap()
    }

    #[test_log::test]
    fn values_in_a_dst_gap_move_past_the_gap() {
        let plan = plan(RecurrenceRule::daily().with_count(4).build().unwrap(), berlin_at(27, 2, 30));
        assert_eq!(
            values(&plan, at(2026, 3, 27, 2, 30, 0), 100),
            vec![
                at(2026, 3, 27, 2, 30, 0),
                at(2026, 3, 28, 2, 30, 0),
                at(2026, 3, 29, 3, 30, 0),
                at(2026, 3, 30, 2, 30, 0),
            ]
        );
    }

    #[test]
    fn a_gap_value_repeating_an_instant_is_kept_once_and_counted_once() {
        let plan = plan(
            RecurrenceRule::with_frequency(Frequency::Hourly)
                .with_count(4)
                .build()
                .unwrap(),
            berlin_at(29, 0, 30),
        );
        assert_eq!(
            values(&plan, at(2026, 3, 29, 0, 0, 0), 100),
            vec![
                at(2026, 3, 29, 0, 30, 0),
                at(2026, 3, 29, 1, 30, 0),
                at(2026, 3, 29, 3, 30, 0),
                at(2026, 3, 29, 4, 30, 0),
            ]
        );
    }

    #[test]
    fn gap_values_are_reordered_behind_later_wall_clock_values() {
        let plan = plan(
            RecurrenceRule::daily()
                .with_by_rule(ByRule::Hour(vec![2, 3]))
                .with_by_rule(ByRule::Minute(vec![0, 50]))
                .with_by_setpos(vec![2, 3])
                .with_count(6)
                .build()
                .unwrap(),
            berlin_at(28, 2, 50),
        );
        assert_eq!(
            values(&plan, at(2026, 3, 28, 0, 0, 0), 100),
            vec![
                at(2026, 3, 28, 2, 50, 0),
                at(2026, 3, 28, 3, 0, 0),
                at(2026, 3, 29, 3, 0, 0),
                at(2026, 3, 29, 3, 50, 0),
                at(2026, 3, 30, 2, 50, 0),
                at(2026, 3, 30, 3, 0, 0),
            ]
        );

        // a seek landing between the two values of the gap day
        assert_eq!(
            values(&plan, at(2026, 3, 29, 3, 10, 0), 2),
            vec![at(2026, 3, 29, 3, 50, 0), at(2026, 3, 30, 2, 50, 0)]
        );
    }
}
