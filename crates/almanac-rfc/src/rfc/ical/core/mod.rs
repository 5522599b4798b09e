//! iCalendar core value types (RFC 5545).
//!
//! These are the structured values the recurrence engine consumes:
//! DATE/DATE-TIME anchors and validated recurrence rules.

mod datetime;
mod error;
mod rrule;

pub use self::datetime::{Temporal, TemporalKind, UtcOffset, Zone};
pub use self::error::{RecurrenceError, RecurrenceResult};
pub use self::rrule::{ByRule, ByRuleKind, Frequency, RecurrenceRule, RuleBuilder, Weekday, WeekdayNum};
