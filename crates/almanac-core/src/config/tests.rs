//! Tests for configuration module.

use super::*;

#[test_log::test]
fn defaults_apply_without_sources() {
    let settings = Settings::from_toml_str("").expect("empty document is valid");

    tracing::debug!(settings = ?settings, "Loaded default settings");

    assert_eq!(settings.expansion, ExpansionConfig::default());
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn toml_overrides_defaults() {
    let settings = Settings::from_toml_str(
        "[expansion]\ncheckpoint_interval = 8\n\n[logging]\nlevel = \"trace\"\n",
    )
    .expect("valid document");

    assert_eq!(settings.expansion.checkpoint_interval, 8);
    assert_eq!(settings.expansion.max_checkpoints, DEFAULT_MAX_CHECKPOINTS);
    assert_eq!(settings.logging.level, "trace");
}

#[test]
fn zero_checkpoint_interval_is_rejected() {
    let result = Settings::from_toml_str("[expansion]\ncheckpoint_interval = 0\n");
    assert!(result.is_err());
}

#[test]
fn validate_rejects_tiny_checkpoint_cap() {
    let config = ExpansionConfig {
        checkpoint_interval: 4,
        max_checkpoints: 1,
    };
    assert!(matches!(config.validate(), Err(CoreError::ConfigError(_))));
}
