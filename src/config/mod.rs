//! Engine configuration.
//!
//! Loads ~/.addonup/config.toml when present; every field has a default so
//! a missing or partial file still yields a working configuration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::engine::{DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_INTERVAL_SECS};
use crate::logging::LogConfig;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// Config file is not valid TOML.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Catalog polling interval in seconds.
    pub poll_interval_secs: u64,
    /// Event broadcast channel capacity.
    pub event_capacity: usize,
    /// Logging configuration.
    pub log: LogConfig,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            log: LogConfig::default(),
        }
    }
}

impl UpdaterConfig {
    /// Returns the default config file path (~/.addonup/config.toml).
    #[must_use]
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".addonup")
            .join("config.toml")
    }

    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults; an unreadable or malformed file
    /// is logged and also falls back to the defaults.
    #[must_use]
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Loads configuration from a specific file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the polling interval as a `Duration`.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
