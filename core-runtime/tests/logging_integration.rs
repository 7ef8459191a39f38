//! Integration tests for logging system

use core_runtime::logging::{
    default_filter_string, init_logging, LogFormat, LogLevel, LoggingConfig,
};
use core_runtime::Error;

#[test]
fn test_logging_config_builder() {
    // Only one subscriber can be installed per process, so the builder is
    // tested separately from initialization.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(config.filter.is_none());
}

#[test]
fn test_default_filter_quiets_sqlx() {
    let filter = default_filter_string(LogLevel::Trace);
    assert!(filter.contains("core_sync=trace"));
    assert!(filter.contains("sqlx=warn"));
    assert!(!filter.contains("sqlx=trace"));
}

#[test]
fn test_second_initialization_is_rejected() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Error);

    init_logging(config.clone()).expect("first initialization succeeds");
    let second = init_logging(config);

    assert!(matches!(second, Err(Error::Config(_))));
}
