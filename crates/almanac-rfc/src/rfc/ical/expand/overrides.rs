//! Override instances (RECURRENCE-ID) and their reconciliation with a series.

use std::fmt;

use super::series::RecurrenceSeries;
use crate::rfc::ical::core::{RecurrenceError, Temporal, TemporalKind};

/// Shared identifier linking a series and its override instances (UID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId(String);

impl SeriesId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SeriesId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SeriesId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of new series identifiers, supplied by the caller.
pub trait SeriesIdGenerator {
    fn next_id(&mut self) -> SeriesId;
}

/// Random identifiers (UUID v4), suitable as iCalendar UIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSeriesIds;

impl SeriesIdGenerator for UuidSeriesIds {
    fn next_id(&mut self) -> SeriesId {
        SeriesId(uuid::Uuid::new_v4().to_string())
    }
}

/// Deterministic identifiers `{prefix}-1`, `{prefix}-2`, ...
#[derive(Debug, Clone)]
pub struct SequentialSeriesIds {
    prefix: String,
    next: u64,
}

impl SequentialSeriesIds {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl SeriesIdGenerator for SequentialSeriesIds {
    fn next_id(&mut self) -> SeriesId {
        let id = SeriesId(format!("{}-{}", self.prefix, self.next));
        self.next += 1;
        id
    }
}

/// A modified instance of a series.
///
/// `recurrence_id` is the original occurrence the instance replaces; the
/// series is referenced by id only. `payload` carries whatever the caller
/// stores with the instance.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideInstance<P = ()> {
    pub series_id: SeriesId,
    pub recurrence_id: Option<Temporal>,
    pub payload: P,
}

impl OverrideInstance {
    /// Creates an override without a payload.
    #[must_use]
    pub fn new(series_id: SeriesId, recurrence_id: Temporal) -> Self {
        Self {
            series_id,
            recurrence_id: Some(recurrence_id),
            payload: (),
        }
    }
}

/// Why an override no longer matches its series.
#[derive(Debug, Clone, PartialEq)]
pub enum OrphanReason {
    /// The series does not produce the identifier; `nearest` is the first
    /// occurrence after it, if any.
    NoMatchingOccurrence { nearest: Option<Temporal> },
    /// The identifier is of a different date/time variant than the anchor.
    VariantMismatch {
        expected: TemporalKind,
        found: TemporalKind,
    },
}

/// Reconciliation state of one override.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideState {
    Attached,
    Orphaned(OrphanReason),
}

/// An override reported as orphaned.
#[derive(Debug, Clone, PartialEq)]
pub struct Orphan<'o, P = ()> {
    pub instance: &'o OverrideInstance<P>,
    pub reason: OrphanReason,
}

/// ## Summary
/// Matches override instances against the occurrences a series produces.
///
/// The reconciler never modifies or deletes overrides; it only reports which
/// ones are orphaned so the caller can decide what to do with them.
#[derive(Debug, Clone, Copy)]
pub struct OverrideReconciler<'s> {
    series: &'s RecurrenceSeries,
}

impl<'s> OverrideReconciler<'s> {
    #[must_use]
    pub const fn new(series: &'s RecurrenceSeries) -> Self {
        Self { series }
    }

    /// ## Summary
    /// Returns the state of every override that belongs to the series and
    /// carries a recurrence identifier.
    ///
    /// An override is attached when the first occurrence at or after its
    /// identifier is the identifier itself. Zoned identifiers match by
    /// instant.
    #[must_use]
    pub fn classify<'o, P>(
        &self,
        overrides: &'o [OverrideInstance<P>],
    ) -> Vec<(&'o OverrideInstance<P>, OverrideState)> {
        overrides
            .iter()
            .filter(|instance| instance.series_id == *self.series.id())
            .filter_map(|instance| {
                let recurrence_id = instance.recurrence_id.as_ref()?;
                Some((instance, self.state_of(recurrence_id)))
            })
            .collect()
    }

    /// Returns only the orphaned overrides, with the reason for each.
    #[must_use]
    pub fn find_orphans<'o, P>(&self, overrides: &'o [OverrideInstance<P>]) -> Vec<Orphan<'o, P>> {
        let orphans: Vec<_> = self
            .classify(overrides)
            .into_iter()
            .filter_map(|(instance, state)| match state {
                OverrideState::Attached => None,
                OverrideState::Orphaned(reason) => Some(Orphan { instance, reason }),
            })
            .collect();
        tracing::debug!(
            series = %self.series.id(),
            checked = overrides.len(),
            orphaned = orphans.len(),
            "Reconciled overrides"
        );
        orphans
    }

    fn state_of(&self, recurrence_id: &Temporal) -> OverrideState {
        match self.series.first_at_or_after(recurrence_id) {
            Ok(Some(first)) if first == *recurrence_id => OverrideState::Attached,
            Ok(nearest) => {
                OverrideState::Orphaned(OrphanReason::NoMatchingOccurrence { nearest })
            }
            Err(RecurrenceError::InvalidSeek { expected, found }) => {
                OverrideState::Orphaned(OrphanReason::VariantMismatch { expected, found })
            }
            Err(err) => {
                tracing::warn!(error = %err, "Could not evaluate recurrence identifier");
                OverrideState::Orphaned(OrphanReason::NoMatchingOccurrence { nearest: None })
            }
        }
    }
}
