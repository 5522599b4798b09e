//! RFC 5545 recurrence model and expansion engine.

pub mod error;
pub mod rfc;
