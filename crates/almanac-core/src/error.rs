use thiserror::Error;

/// Core-level errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Telemetry error: {0}")]
    TelemetryError(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
