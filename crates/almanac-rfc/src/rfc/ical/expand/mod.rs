//! Recurrence expansion for iCalendar components (RFC 5545 §3.3.10, §3.8.5).
//!
//! A rule is compiled against its anchor into a frequency stream and a
//! BYxxx constraint chain. Bounded by COUNT/UNTIL, the rule's values are
//! merged with RDATE and filtered by EXDATE into one ascending sequence,
//! resumable from cached checkpoints.

mod bound;
mod cache;
mod calendar;
mod chain;
mod compose;
mod frequency;
mod overrides;
mod series;

pub use cache::{RecurrenceCache, RuleCursor};
pub use compose::Occurrences;
pub use overrides::{
    Orphan, OrphanReason, OverrideInstance, OverrideReconciler, OverrideState, SequentialSeriesIds,
    SeriesId, SeriesIdGenerator, UuidSeriesIds,
};
pub use series::RecurrenceSeries;
