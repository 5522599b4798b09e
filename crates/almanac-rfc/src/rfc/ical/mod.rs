//! iCalendar RFC 5545 recurrence support.
//!
//! - `core`: value types (temporal values, recurrence rules)
//! - `expand`: the recurrence expansion engine
//!
//! ## Example
//!
//! ```rust
//! use almanac_rfc::rfc::ical::core::{RecurrenceRule, Temporal};
//! use almanac_rfc::rfc::ical::expand::{RecurrenceSeries, SeriesId};
//!
//! let anchor = Temporal::ymd(2020, 1, 1).expect("valid date");
//! let rule = RecurrenceRule::daily().with_count(5).build().expect("valid rule");
//!
//! let mut series = RecurrenceSeries::new(SeriesId::from("standup"), anchor);
//! series.set_rule(Some(rule)).expect("rule matches anchor");
//!
//! assert_eq!(series.occurrences().count(), 5);
//! ```

pub mod core;
pub mod expand;
