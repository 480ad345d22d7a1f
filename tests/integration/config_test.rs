//! Configuration loading tests

use pairwatch::config::{Config, ConfigError, FeedMode};
use std::io::Write;

#[test]
fn test_config_example_loads() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();

    assert_eq!(config.filter.target_chain, "solana");
    assert_eq!(config.filter.min_cap, 20_000.0);
    assert_eq!(config.filter.max_cap, 40_000.0);
    assert_eq!(config.filter.max_age_minutes, 20);
    assert_eq!(config.feed.mode, FeedMode::Search);
    assert_eq!(config.scheduler.scan_interval_secs, 10);
    assert!(config.validate_screening().is_ok());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [filter]
        allowed_venues = ["raydium"]
        min_volume = 50000

        [telegram]
        bot_token = "123:abc"
        chat_id = "@alerts"
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.filter.allowed_venues, vec!["raydium".to_string()]);
    assert_eq!(config.filter.min_volume, 50_000.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_run_requires_credentials() {
    let config = Config::default();
    assert!(config.validate_screening().is_ok());
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Missing("telegram.bot_token"))
    ));
}
