//! Recurrence set composition: rule values merged with RDATE, minus EXDATE.

use std::collections::BTreeSet;
use std::collections::btree_set;
use std::iter::Peekable;

use chrono::NaiveDateTime;

use super::bound::RuleSequence;
use crate::rfc::ical::core::{Temporal, TemporalKind};

/// Values contributed by the rule side of a recurrence set.
#[derive(Debug)]
pub(crate) enum RuleValues<'a> {
    /// A compiled RRULE.
    Rule(RuleSequence<'a>),
    /// No RRULE: the anchor is the only rule value.
    Anchor(Option<NaiveDateTime>),
}

impl Iterator for RuleValues<'_> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Rule(sequence) => sequence.next(),
            Self::Anchor(anchor) => anchor.take(),
        }
    }
}

/// ## Summary
/// Ascending, duplicate-free occurrences of a recurrence set.
///
/// Produced by [`RecurrenceSeries::produce_sequence`](super::RecurrenceSeries::produce_sequence).
/// Finite when the rule carries COUNT or UNTIL (or there is no rule),
/// otherwise unbounded: take what you need and drop the iterator.
#[derive(Debug)]
pub struct Occurrences<'a> {
    rule: Peekable<RuleValues<'a>>,
    additions: Peekable<btree_set::Range<'a, NaiveDateTime>>,
    exceptions: &'a BTreeSet<NaiveDateTime>,
    start: NaiveDateTime,
    kind: TemporalKind,
}

impl<'a> Occurrences<'a> {
    pub(crate) fn new(
        rule: RuleValues<'a>,
        additions: &'a BTreeSet<NaiveDateTime>,
        exceptions: &'a BTreeSet<NaiveDateTime>,
        start: NaiveDateTime,
        kind: TemporalKind,
    ) -> Self {
        Self {
            rule: rule.peekable(),
            additions: additions.range(start..).peekable(),
            exceptions,
            start,
            kind,
        }
    }

    /// Next occurrence as a wall-clock value in the anchor's frame.
    pub(crate) fn next_local(&mut self) -> Option<NaiveDateTime> {
        loop {
            let next_rule = self.rule.peek().copied();
            let next_addition = self.additions.peek().map(|addition| **addition);
            let value = match (next_rule, next_addition) {
                (Some(rule), Some(addition)) if rule < addition => self.rule.next(),
                (Some(rule), Some(addition)) if rule > addition => self.additions.next().copied(),
                (Some(_), Some(_)) => {
                    self.additions.next();
                    self.rule.next()
                }
                (Some(_), None) => self.rule.next(),
                (None, Some(_)) => self.additions.next().copied(),
                (None, None) => return None,
            }?;

            if value < self.start || self.exceptions.contains(&value) {
                continue;
            }
            return Some(value);
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Temporal;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_local().map(|local| self.kind.materialize(local))
    }
}
