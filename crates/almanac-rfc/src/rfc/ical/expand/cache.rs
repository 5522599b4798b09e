//! Checkpoints that let a rule sequence resume near a far-away start.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

/// Resumption state of a rule sequence at the start of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCursor {
    /// Index of the next frequency period to expand.
    pub period: u64,
    /// Values at or after the anchor produced by all earlier periods.
    pub emitted: u64,
}

impl RuleCursor {
    pub(crate) const START: Self = Self {
        period: 0,
        emitted: 0,
    };
}

/// ## Summary
/// Checkpoints keyed by the start of the period they resume at.
///
/// Every value the rule produces from a checkpoint's period onwards is at or
/// after its key, and every value from earlier periods is before it, so the
/// closest checkpoint at or before a seek point is always a safe place to
/// resume.
#[derive(Debug, Clone)]
pub struct RecurrenceCache {
    checkpoints: BTreeMap<NaiveDateTime, RuleCursor>,
    max_checkpoints: usize,
}

impl RecurrenceCache {
    #[must_use]
    pub fn new(max_checkpoints: usize) -> Self {
        Self {
            checkpoints: BTreeMap::new(),
            max_checkpoints: max_checkpoints.max(2),
        }
    }

    /// Records a checkpoint, thinning the cache when it is full.
    pub fn record(&mut self, key: NaiveDateTime, cursor: RuleCursor) {
        if self.checkpoints.insert(key, cursor).is_some() {
            return;
        }
        tracing::trace!(key = %key, period = cursor.period, emitted = cursor.emitted, "Recorded checkpoint");

        if self.checkpoints.len() > self.max_checkpoints {
            let before = self.checkpoints.len();
            let mut position = 0usize;
            self.checkpoints.retain(|_, _| {
                let keep = position % 2 == 0;
                position += 1;
                keep
            });
            tracing::debug!(
                before,
                after = self.checkpoints.len(),
                "Thinned recurrence cache"
            );
        }
    }

    /// Returns the closest checkpoint at or before `at`.
    #[must_use]
    pub fn closest(&self, at: NaiveDateTime) -> Option<(NaiveDateTime, RuleCursor)> {
        self.checkpoints
            .range(..=at)
            .next_back()
            .map(|(key, cursor)| (*key, *cursor))
    }

    pub fn clear(&mut self) {
        self.checkpoints.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

/// Locks a shared cache. A poisoned lock still holds consistent checkpoints,
/// since every mutation completes before the guard is released.
pub(crate) fn lock(cache: &Mutex<RecurrenceCache>) -> MutexGuard<'_, RecurrenceCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for RecurrenceCache {
    fn default() -> Self {
        Self::new(almanac_core::config::DEFAULT_MAX_CHECKPOINTS)
    }
}
