//! Errors raised while building rules and assembling recurrence sets.

use super::TemporalKind;

/// Error raised at the boundary of the recurrence engine.
///
/// Every variant is detected eagerly, when a rule is built, a value set is
/// assigned, or a sequence is requested. Pulling values from a sequence
/// never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    /// Structural violation in a recurrence rule.
    #[error("Malformed rule part {element}: {reason}")]
    MalformedRule {
        /// Name of the offending rule part (`FREQ`, `BYMONTHDAY`, ...).
        element: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A value's date/time variant disagrees with the anchor's.
    #[error("{role} is a {found} but the anchor is a {expected}")]
    TypeMismatch {
        /// Which input carried the value (`UNTIL`, `RDATE`, `EXDATE`, ...).
        role: &'static str,
        expected: TemporalKind,
        found: TemporalKind,
    },

    /// Generation was requested from a start of a different variant.
    #[error("Cannot seek a {expected} series from a {found}")]
    InvalidSeek {
        expected: TemporalKind,
        found: TemporalKind,
    },

    /// A TZID could not be resolved.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

impl RecurrenceError {
    pub(crate) fn malformed(element: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedRule {
            element,
            reason: reason.into(),
        }
    }
}

pub type RecurrenceResult<T> = std::result::Result<T, RecurrenceError>;
