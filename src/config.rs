// src/config.rs
//! Pipeline configuration: TOML file + per-field env overrides.
//!
//! Resolution order for every field:
//! 1) env var (e.g. `ALERT_THRESHOLD`)
//! 2) `$PIPELINE_CONFIG_PATH` or `config/pipeline.toml`
//! 3) built-in default
//!
//! Out-of-range values are sanitised back to their defaults instead of failing,
//! so a bad env var never keeps the scheduler from starting.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

pub const ENV_ALERT_THRESHOLD: &str = "ALERT_THRESHOLD";
pub const ENV_MAX_FETCH_WORKERS: &str = "MAX_FETCH_WORKERS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "FETCH_CONNECT_TIMEOUT_SECS";
pub const ENV_READ_TIMEOUT_SECS: &str = "FETCH_READ_TIMEOUT_SECS";
pub const ENV_FETCH_INTERVAL_SECS: &str = "FETCH_INTERVAL_SECS";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_MODEL_PATH: &str = "MODEL_PATH";
pub const ENV_MAX_ENTRIES_PER_SOURCE: &str = "MAX_ENTRIES_PER_SOURCE";
pub const ENV_DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";

pub const DEFAULT_ALERT_THRESHOLD: f64 = 50.0;
pub const DEFAULT_MAX_WORKERS: usize = 15;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_READ_TIMEOUT_SECS: f64 = 10.0;
pub const DEFAULT_FETCH_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/intel.db?mode=rwc";
pub const DEFAULT_MODEL_PATH: &str = "data/model.json";

/// Browser-like identity; several security news sites block default client agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_alert_threshold() -> f64 {
    DEFAULT_ALERT_THRESHOLD
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}
fn default_connect_timeout_secs() -> f64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}
fn default_read_timeout_secs() -> f64 {
    DEFAULT_READ_TIMEOUT_SECS
}
fn default_fetch_interval_secs() -> u64 {
    DEFAULT_FETCH_INTERVAL_SECS
}
fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// `is_bubbled = score >= alert_threshold`, shared by every strategy and source.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
    /// Upper bound on concurrently running source workers (>= 1).
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: f64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: f64,
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Trained classifier artifact. Missing file => keyword scoring.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Optional cap on entries processed per source and cycle. `None` keeps
    /// the uncapped behaviour.
    #[serde(default)]
    pub max_entries_per_source: Option<usize>,
    /// Store pool size; defaults to `max_workers + 5` so every worker can hold
    /// its own connection while the API still gets one.
    #[serde(default)]
    pub db_max_connections: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            max_workers: DEFAULT_MAX_WORKERS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            fetch_interval_secs: DEFAULT_FETCH_INTERVAL_SECS,
            database_url: default_database_url(),
            model_path: default_model_path(),
            user_agent: default_user_agent(),
            max_entries_per_source: None,
            db_max_connections: None,
        }
    }
}

impl PipelineConfig {
    /// Load using `$PIPELINE_CONFIG_PATH` / `config/pipeline.toml` (if present),
    /// then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_PIPELINE_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PIPELINE_CONFIG_PATH));

        let base = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides().sanitized())
    }

    /// Parse a TOML file without env overrides.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing pipeline config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PipelineConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<f64>(ENV_ALERT_THRESHOLD) {
            self.alert_threshold = v;
        }
        if let Some(v) = env_parse::<usize>(ENV_MAX_FETCH_WORKERS) {
            self.max_workers = v;
        }
        if let Some(v) = env_parse::<f64>(ENV_CONNECT_TIMEOUT_SECS) {
            self.connect_timeout_secs = v;
        }
        if let Some(v) = env_parse::<f64>(ENV_READ_TIMEOUT_SECS) {
            self.read_timeout_secs = v;
        }
        if let Some(v) = env_parse::<u64>(ENV_FETCH_INTERVAL_SECS) {
            self.fetch_interval_secs = v;
        }
        if let Ok(v) = std::env::var(ENV_DATABASE_URL) {
            if !v.trim().is_empty() {
                self.database_url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var(ENV_MODEL_PATH) {
            if !v.trim().is_empty() {
                self.model_path = PathBuf::from(v.trim());
            }
        }
        if let Some(v) = env_parse::<usize>(ENV_MAX_ENTRIES_PER_SOURCE) {
            self.max_entries_per_source = Some(v);
        }
        if let Some(v) = env_parse::<u32>(ENV_DB_MAX_CONNECTIONS) {
            self.db_max_connections = Some(v);
        }
        self
    }

    /// Clamp every field back into its valid domain.
    pub fn sanitized(mut self) -> Self {
        if !self.alert_threshold.is_finite() {
            warn!(target: "config", value = self.alert_threshold, "non-finite alert threshold, using default");
            self.alert_threshold = DEFAULT_ALERT_THRESHOLD;
        }
        if self.max_workers == 0 {
            warn!(target: "config", "max_workers must be >= 1, using 1");
            self.max_workers = 1;
        }
        if !is_positive_finite(self.connect_timeout_secs) {
            self.connect_timeout_secs = DEFAULT_CONNECT_TIMEOUT_SECS;
        }
        if !is_positive_finite(self.read_timeout_secs) {
            self.read_timeout_secs = DEFAULT_READ_TIMEOUT_SECS;
        }
        if self.fetch_interval_secs == 0 {
            self.fetch_interval_secs = DEFAULT_FETCH_INTERVAL_SECS;
        }
        if self.max_entries_per_source == Some(0) {
            self.max_entries_per_source = None;
        }
        if self.db_max_connections == Some(0) {
            self.db_max_connections = None;
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.read_timeout_secs)
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    pub fn pool_size(&self) -> u32 {
        self.db_max_connections
            .unwrap_or_else(|| u32::try_from(self.max_workers).unwrap_or(u32::MAX).saturating_add(5))
    }
}

fn is_positive_finite(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "config", var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
