// tests/config.rs
//
// Pipeline config: file loading, env overrides and sanitisation.
// Env-mutating tests are serialised.

use serial_test::serial;
use std::time::Duration;

use rss_intel_monitor::config::*;

const ALL_ENV: &[&str] = &[
    ENV_PIPELINE_CONFIG_PATH,
    ENV_ALERT_THRESHOLD,
    ENV_MAX_FETCH_WORKERS,
    ENV_CONNECT_TIMEOUT_SECS,
    ENV_READ_TIMEOUT_SECS,
    ENV_FETCH_INTERVAL_SECS,
    ENV_DATABASE_URL,
    ENV_MODEL_PATH,
    ENV_MAX_ENTRIES_PER_SOURCE,
    ENV_DB_MAX_CONNECTIONS,
];

fn clear_env() {
    for k in ALL_ENV {
        std::env::remove_var(k);
    }
}

#[test]
#[serial]
fn defaults_without_file_or_env() {
    clear_env();
    std::env::set_var(ENV_PIPELINE_CONFIG_PATH, "/nonexistent/pipeline.toml");

    let cfg = PipelineConfig::load().unwrap();
    assert_eq!(cfg, PipelineConfig::default());
    assert_eq!(cfg.alert_threshold, 50.0);
    assert_eq!(cfg.max_workers, 15);
    assert_eq!(cfg.connect_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.read_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.fetch_interval(), Duration::from_secs(900));
    assert_eq!(cfg.pool_size(), 20);
    clear_env();
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.toml");
    std::fs::write(
        &path,
        "alert_threshold = 70.0\nmax_workers = 3\nfetch_interval_secs = 60\n",
    )
    .unwrap();
    std::env::set_var(ENV_PIPELINE_CONFIG_PATH, &path);
    std::env::set_var(ENV_ALERT_THRESHOLD, "85");
    std::env::set_var(ENV_MAX_ENTRIES_PER_SOURCE, "25");

    let cfg = PipelineConfig::load().unwrap();
    assert_eq!(cfg.alert_threshold, 85.0);
    assert_eq!(cfg.max_workers, 3);
    assert_eq!(cfg.fetch_interval_secs, 60);
    assert_eq!(cfg.max_entries_per_source, Some(25));
    assert_eq!(cfg.pool_size(), 8);
    clear_env();
}

#[test]
#[serial]
fn invalid_env_values_are_ignored_or_clamped() {
    clear_env();
    std::env::set_var(ENV_PIPELINE_CONFIG_PATH, "/nonexistent/pipeline.toml");
    std::env::set_var(ENV_MAX_FETCH_WORKERS, "0");
    std::env::set_var(ENV_READ_TIMEOUT_SECS, "-3");
    std::env::set_var(ENV_ALERT_THRESHOLD, "lots");

    let cfg = PipelineConfig::load().unwrap();
    assert_eq!(cfg.max_workers, 1);
    assert_eq!(cfg.read_timeout_secs, DEFAULT_READ_TIMEOUT_SECS);
    assert_eq!(cfg.alert_threshold, DEFAULT_ALERT_THRESHOLD);
    clear_env();
}

#[test]
fn malformed_toml_is_an_error() {
    assert!(PipelineConfig::from_toml_str("max_workers = \"many\"").is_err());
}

#[test]
fn shipped_config_file_parses() {
    let cfg = PipelineConfig::load_from_file(std::path::Path::new("config/pipeline.toml")).unwrap();
    assert_eq!(cfg.alert_threshold, DEFAULT_ALERT_THRESHOLD);
    assert_eq!(cfg.max_workers, DEFAULT_MAX_WORKERS);
    assert_eq!(cfg.max_entries_per_source, None);
}
