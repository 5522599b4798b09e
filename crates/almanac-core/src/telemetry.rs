//! Tracing subscriber setup for binaries and tools embedding the crates.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::{CoreError, CoreResult};

/// ## Summary
/// Builds the `EnvFilter` for a configured level or directive string
/// (e.g. `"debug"` or `"almanac_rfc=trace,info"`).
///
/// ## Errors
/// Returns `CoreError::TelemetryError` if the directive cannot be parsed.
pub fn env_filter(level: &str) -> CoreResult<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|err| CoreError::TelemetryError(format!("invalid log filter {level:?}: {err}")))
}

/// ## Summary
/// Installs the global tracing subscriber with the configured filter.
///
/// ## Errors
/// Returns `CoreError::TelemetryError` if the filter is invalid or a global
/// subscriber has already been installed.
pub fn init_tracing(logging: &LoggingConfig) -> CoreResult<()> {
    let filter = env_filter(&logging.level)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|err| CoreError::TelemetryError(err.to_string()))?;

    tracing::info!(level = %logging.level, "Tracing initialised");
    Ok(())
}
