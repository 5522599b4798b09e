use thiserror::Error;

use crate::rfc::ical::core::RecurrenceError;

/// Errors raised by the RFC layer
#[derive(Error, Debug)]
pub enum RfcError {
    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),

    #[error(transparent)]
    CoreError(#[from] almanac_core::error::CoreError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
