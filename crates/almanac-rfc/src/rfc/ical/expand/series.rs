//! A recurring series: anchor, rule, RDATE/EXDATE sets and checkpoint cache.

use std::collections::BTreeSet;
use std::sync::Mutex;

use almanac_core::config::ExpansionConfig;
use chrono::NaiveDateTime;

use super::bound::{RulePlan, RuleSequence};
use super::cache::{self, RecurrenceCache};
use super::compose::{Occurrences, RuleValues};
use super::overrides::SeriesId;
use crate::error::RfcResult;
use crate::rfc::ical::core::{RecurrenceError, RecurrenceResult, RecurrenceRule, Temporal, TemporalKind};

/// ## Summary
/// One recurring component's recurrence set (RFC 5545 §3.8.5).
///
/// Every setter validates its input against the anchor before anything is
/// replaced, so a failed call leaves the series unchanged. Any successful
/// change clears the checkpoint cache.
#[derive(Debug)]
pub struct RecurrenceSeries {
    id: SeriesId,
    anchor: Temporal,
    rule: Option<RecurrenceRule>,
    plan: Option<RulePlan>,
    additions: Vec<Temporal>,
    exceptions: Vec<Temporal>,
    local_additions: BTreeSet<NaiveDateTime>,
    local_exceptions: BTreeSet<NaiveDateTime>,
    cache: Mutex<RecurrenceCache>,
    config: ExpansionConfig,
}

impl RecurrenceSeries {
    /// Creates a series whose only occurrence is `anchor`.
    #[must_use]
    pub fn new(id: SeriesId, anchor: Temporal) -> Self {
        let config = ExpansionConfig::default();
        Self {
            id,
            anchor,
            rule: None,
            plan: None,
            additions: Vec::new(),
            exceptions: Vec::new(),
            local_additions: BTreeSet::new(),
            local_exceptions: BTreeSet::new(),
            cache: Mutex::new(RecurrenceCache::new(config.max_checkpoints)),
            config,
        }
    }

    /// ## Summary
    /// Applies a checkpoint policy, discarding existing checkpoints.
    ///
    /// ## Errors
    /// Returns `RfcError::CoreError` if the configuration is invalid.
    pub fn with_config(mut self, config: &ExpansionConfig) -> RfcResult<Self> {
        config.validate()?;
        self.config = *config;
        self.cache = Mutex::new(RecurrenceCache::new(config.max_checkpoints));
        Ok(self)
    }

    #[must_use]
    pub const fn id(&self) -> &SeriesId {
        &self.id
    }

    #[must_use]
    pub const fn anchor(&self) -> &Temporal {
        &self.anchor
    }

    #[must_use]
    pub const fn rule(&self) -> Option<&RecurrenceRule> {
        self.rule.as_ref()
    }

    /// RDATE values as assigned.
    #[must_use]
    pub fn additions(&self) -> &[Temporal] {
        &self.additions
    }

    /// EXDATE values as assigned.
    #[must_use]
    pub fn exceptions(&self) -> &[Temporal] {
        &self.exceptions
    }

    /// Number of checkpoints currently cached.
    #[must_use]
    pub fn checkpoint_count(&self) -> usize {
        cache::lock(&self.cache).len()
    }

    /// ## Summary
    /// Replaces the recurrence rule.
    ///
    /// ## Errors
    /// Returns `MalformedRule` or `TypeMismatch` if the rule does not fit the
    /// anchor (see [`RecurrenceRule`] and the anchor checks on UNTIL).
    #[tracing::instrument(skip_all, fields(series = %self.id))]
    pub fn set_rule(&mut self, rule: Option<RecurrenceRule>) -> RecurrenceResult<()> {
        let plan = rule
            .as_ref()
            .map(|rule| RulePlan::compile(rule, &self.anchor))
            .transpose()?;
        tracing::debug!(
            rule = rule.as_ref().map(ToString::to_string),
            "Replacing recurrence rule"
        );
        self.rule = rule;
        self.plan = plan;
        self.invalidate();
        Ok(())
    }

    /// ## Summary
    /// Moves the series to a new anchor.
    ///
    /// The rule, additions and exceptions are re-checked against the new
    /// anchor; all of them must still fit.
    ///
    /// ## Errors
    /// Returns the first `MalformedRule` or `TypeMismatch` found.
    #[tracing::instrument(skip_all, fields(series = %self.id))]
    pub fn set_anchor(&mut self, anchor: Temporal) -> RecurrenceResult<()> {
        let plan = self
            .rule
            .as_ref()
            .map(|rule| RulePlan::compile(rule, &anchor))
            .transpose()?;
        let kind = anchor.kind();
        let additions = localize_all(kind, "RDATE", &self.additions)?;
        let exceptions = localize_all(kind, "EXDATE", &self.exceptions)?;

        tracing::debug!(from = %self.anchor, to = %anchor, "Moving series anchor");
        self.anchor = anchor;
        self.plan = plan;
        self.local_additions = additions;
        self.local_exceptions = exceptions;
        self.invalidate();
        Ok(())
    }

    /// ## Summary
    /// Replaces the RDATE set.
    ///
    /// ## Errors
    /// Returns `TypeMismatch` if any value's variant differs from the anchor's.
    #[tracing::instrument(skip_all, fields(series = %self.id))]
    pub fn set_additions(&mut self, additions: Vec<Temporal>) -> RecurrenceResult<()> {
        let local = localize_all(self.anchor.kind(), "RDATE", &additions)?;
        tracing::debug!(count = additions.len(), "Replacing additions");
        self.additions = additions;
        self.local_additions = local;
        self.invalidate();
        Ok(())
    }

    /// ## Summary
    /// Replaces the EXDATE set.
    ///
    /// ## Errors
    /// Returns `TypeMismatch` if any value's variant differs from the anchor's.
    #[tracing::instrument(skip_all, fields(series = %self.id))]
    pub fn set_exceptions(&mut self, exceptions: Vec<Temporal>) -> RecurrenceResult<()> {
        let local = localize_all(self.anchor.kind(), "EXDATE", &exceptions)?;
        tracing::debug!(count = exceptions.len(), "Replacing exceptions");
        self.exceptions = exceptions;
        self.local_exceptions = local;
        self.invalidate();
        Ok(())
    }

    fn invalidate(&mut self) {
        let cache = self
            .cache
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let dropped = cache.len();
        cache.clear();
        tracing::debug!(dropped, "Invalidated recurrence cache");
    }

    /// ## Summary
    /// Returns the occurrences at or after `start`, in ascending order.
    ///
    /// Each call yields a fresh sequence. Generation resumes from the closest
    /// cached checkpoint when one is available.
    ///
    /// ## Errors
    /// Returns `InvalidSeek` if `start` is of a different variant than the
    /// anchor.
    pub fn produce_sequence(&self, start: &Temporal) -> RecurrenceResult<Occurrences<'_>> {
        let local = self.seek_point(start)?;
        Ok(self.sequence_from(local))
    }

    /// All occurrences from the anchor on.
    #[must_use]
    pub fn occurrences(&self) -> Occurrences<'_> {
        self.sequence_from(self.anchor_local())
    }

    /// ## Summary
    /// Returns the occurrences in `[start, end)`, at most `limit` of them.
    ///
    /// ## Errors
    /// Returns `InvalidSeek` if either bound is of a different variant than
    /// the anchor.
    pub fn between(&self, start: &Temporal, end: &Temporal, limit: usize) -> RecurrenceResult<Vec<Temporal>> {
        let from = self.seek_point(start)?;
        let to = self.seek_point(end)?;
        let kind = self.anchor.kind();

        let mut occurrences = self.sequence_from(from);
        let mut values = Vec::new();
        while values.len() < limit {
            match occurrences.next_local() {
                Some(local) if local < to => values.push(kind.materialize(local)),
                _ => break,
            }
        }
        Ok(values)
    }

    /// ## Summary
    /// Returns whether `value` is an occurrence of this series.
    ///
    /// ## Errors
    /// Returns `InvalidSeek` if `value` is of a different variant than the
    /// anchor.
    pub fn is_occurrence(&self, value: &Temporal) -> RecurrenceResult<bool> {
        let local = self.seek_point(value)?;
        Ok(self.sequence_from(local).next_local() == Some(local))
    }

    /// First occurrence at or after `value`, if any.
    pub(crate) fn first_at_or_after(&self, value: &Temporal) -> RecurrenceResult<Option<Temporal>> {
        Ok(self.produce_sequence(value)?.next())
    }

    fn seek_point(&self, start: &Temporal) -> RecurrenceResult<NaiveDateTime> {
        let kind = self.anchor.kind();
        kind.localize(start).ok_or(RecurrenceError::InvalidSeek {
            expected: kind,
            found: start.kind(),
        })
    }

    fn anchor_local(&self) -> NaiveDateTime {
        self.anchor.kind().canonical(self.anchor.local())
    }

    fn sequence_from(&self, start: NaiveDateTime) -> Occurrences<'_> {
        let rule = match &self.plan {
            Some(plan) => RuleValues::Rule(RuleSequence::new(
                plan,
                start,
                &self.cache,
                self.config.checkpoint_interval,
            )),
            None => RuleValues::Anchor(Some(self.anchor_local())),
        };
        Occurrences::new(
            rule,
            &self.local_additions,
            &self.local_exceptions,
            start,
            self.anchor.kind(),
        )
    }
}

fn localize_all(
    kind: TemporalKind,
    role: &'static str,
    values: &[Temporal],
) -> RecurrenceResult<BTreeSet<NaiveDateTime>> {
    values
        .iter()
        .map(|value| {
            kind.localize(value).ok_or(RecurrenceError::TypeMismatch {
                role,
                expected: kind,
                found: value.kind(),
            })
        })
        .collect()
}
