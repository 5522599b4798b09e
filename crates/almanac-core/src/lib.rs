//! Shared ambient concerns for the almanac crates: errors, configuration
//! and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;
