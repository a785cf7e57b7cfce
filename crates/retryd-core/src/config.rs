use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration rejected while building the retry policy or scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("retry_delays_ms must configure at least one retry attempt")]
    EmptyDelayTable,

    #[error("retry_delays_ms key {0:?} is not a positive attempt number")]
    InvalidAttempt(String),

    #[error("permanent_failure_topic must not be blank")]
    BlankPermanentFailureTopic,

    #[error("retry_scheduler_interval_ms must be greater than zero")]
    ZeroSchedulerInterval,
}

/// Global configuration loaded from `~/.config/retryd/config.toml`.
///
/// Loaded once at startup; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrydConfig {
    /// Exception name that makes a message eligible for a delayed retry.
    pub retriable_exception: String,
    /// Exception name that sends a message straight to the permanent failure topic.
    pub fatal_exception: String,
    /// Exception name that drops the message without further processing.
    pub droppable_exception: String,
    /// Destination for messages that exhausted their retries or failed fatally.
    pub permanent_failure_topic: String,
    /// Name of the persistent store holding queued retries (SQLite table name).
    pub retry_info_store_name: String,
    /// Period of the scheduled sweep in milliseconds.
    pub retry_scheduler_interval_ms: u64,
    /// Attempt number -> minimum delay in milliseconds before re-dispatch.
    /// Keys are strings in TOML (`"1" = 1000`); the number of entries is the
    /// maximum retry count.
    pub retry_delays_ms: BTreeMap<String, u64>,
}

impl Default for RetrydConfig {
    fn default() -> Self {
        Self {
            retriable_exception: "ProcessingException".to_string(),
            fatal_exception: "FatalProcessingException".to_string(),
            droppable_exception: "HaltProcessingException".to_string(),
            permanent_failure_topic: "permanent-failure".to_string(),
            retry_info_store_name: "retry-info".to_string(),
            retry_scheduler_interval_ms: 1000,
            retry_delays_ms: BTreeMap::from([
                ("1".to_string(), 1000),
                ("2".to_string(), 3000),
                ("3".to_string(), 9000),
            ]),
        }
    }
}

impl RetrydConfig {
    /// Sweep period, validated to be non-zero.
    pub fn scheduler_interval(&self) -> Result<Duration, ConfigError> {
        if self.retry_scheduler_interval_ms == 0 {
            return Err(ConfigError::ZeroSchedulerInterval);
        }
        Ok(Duration::from_millis(self.retry_scheduler_interval_ms))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("retryd")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RetrydConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RetrydConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

/// Load configuration from an explicit file. Missing keys take their defaults.
pub fn load_from_path(path: &Path) -> Result<RetrydConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: RetrydConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
