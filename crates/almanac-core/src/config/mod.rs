use anyhow::Result;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Default number of generated periods between two cache checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: u32 = 64;

/// Default cap on the checkpoints one series retains.
pub const DEFAULT_MAX_CHECKPOINTS: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub expansion: ExpansionConfig,
    pub logging: LoggingConfig,
}

/// Tuning for recurrence expansion and its checkpoint cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ExpansionConfig {
    /// Generated periods between checkpoints.
    pub checkpoint_interval: u32,
    /// Upper bound on retained checkpoints per series.
    pub max_checkpoints: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            max_checkpoints: DEFAULT_MAX_CHECKPOINTS,
        }
    }
}

impl ExpansionConfig {
    /// ## Summary
    /// Checks that the cache policy can be applied.
    ///
    /// ## Errors
    /// Returns `CoreError::ConfigError` if the interval is zero or fewer than
    /// two checkpoints may be retained.
    pub fn validate(&self) -> CoreResult<()> {
        if self.checkpoint_interval == 0 {
            return Err(CoreError::ConfigError(
                "expansion.checkpoint_interval must be at least 1".to_string(),
            ));
        }
        if self.max_checkpoints < 2 {
            return Err(CoreError::ConfigError(
                "expansion.max_checkpoints must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("expansion.checkpoint_interval", DEFAULT_CHECKPOINT_INTERVAL)?
        .set_default(
            "expansion.max_checkpoints",
            u64::try_from(DEFAULT_MAX_CHECKPOINTS)?,
        )?
        .set_default("logging.level", "info")?)
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and `almanac.toml`.
    /// Environment variables (`ALMANAC_EXPANSION__CHECKPOINT_INTERVAL`, ...)
    /// take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building, deserializing or validating the
    /// configuration fails.
    pub fn load() -> Result<Self> {
        let settings = builder_with_defaults()?
            // TOML file
            .add_source(config::File::with_name("almanac.toml").required(false))
            // Env
            .add_source(
                config::Environment::with_prefix("ALMANAC")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        settings.expansion.validate()?;
        Ok(settings)
    }

    /// ## Summary
    /// Loads configuration from a TOML document layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is not valid TOML, does not match
    /// the settings shape, or fails validation.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let settings = builder_with_defaults()?
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.expansion.validate()?;
        Ok(settings)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

#[cfg(test)]
mod tests;
