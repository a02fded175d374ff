//! Integration tests for logging initialization
//!
//! The global subscriber can only be set once per process, so everything
//! that installs one lives in a single test.

#![allow(clippy::unwrap_used)]

use ledgergit_config::ObservabilityConfig;
use ledgergit_observability::{
    init_tracing, init_tracing_with_config, LogConfig, LogError, LogFormat, LogOutput,
};

#[test]
fn test_config_builder_chaining() {
    let config = LogConfig::new()
        .with_format(LogFormat::Json)
        .with_level("debug")
        .with_timestamps(false)
        .with_color(false)
        .with_targets(false)
        .with_output(LogOutput::Stdout);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, Some("debug".to_string()));
    assert!(!config.use_timestamps);
    assert!(!config.use_color);
    assert!(!config.include_targets);
    assert_eq!(config.output, LogOutput::Stdout);
}

#[test]
fn test_default_settings_map_to_pretty_info() {
    let config = LogConfig::from_settings(&ObservabilityConfig::default()).unwrap();
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.level.as_deref(), Some("info"));
}

#[test]
fn test_init_once() {
    let config = LogConfig::new()
        .with_format(LogFormat::Compact)
        .with_level("debug")
        .with_color(false)
        .with_timestamps(false);
    init_tracing_with_config(config).unwrap();
    tracing::debug!(branch = "main", "subscriber installed");

    let second = init_tracing(LogFormat::Json, Some("info"));
    assert!(matches!(second, Err(LogError::AlreadyInitialized(_))));
}
