//! Storage configuration
//!
//! Loaded from an optional TOML file. Missing sections and keys fall back to
//! the built-in defaults in [`defaults`].

pub mod defaults;

use ccstore_lock::LockOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Lock acquisition settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSection {
    pub timeout_ms: u64,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub contention_warning_ms: u64,
}

impl Default for LockSection {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::LOCK_TIMEOUT_MS,
            min_backoff_ms: defaults::LOCK_MIN_BACKOFF_MS,
            max_backoff_ms: defaults::LOCK_MAX_BACKOFF_MS,
            contention_warning_ms: defaults::LOCK_CONTENTION_WARNING_MS,
        }
    }
}

/// Read/write behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoSection {
    pub preallocate: bool,
    pub preallocate_min_bytes: u64,
    pub touch_on_hit: bool,
}

impl Default for IoSection {
    fn default() -> Self {
        Self {
            preallocate: defaults::PREALLOCATE,
            preallocate_min_bytes: defaults::PREALLOCATE_MIN_BYTES,
            touch_on_hit: defaults::TOUCH_ON_HIT,
        }
    }
}

/// Cleanup of leftovers from crashed or failed writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HousekeepingSection {
    pub orphan_temp_age_secs: u64,
}

impl Default for HousekeepingSection {
    fn default() -> Self {
        Self {
            orphan_temp_age_secs: defaults::ORPHAN_TEMP_AGE_SECS,
        }
    }
}

/// Complete storage configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub lock: LockSection,
    pub io: IoSection,
    pub housekeeping: HousekeepingSection,
}

impl StorageConfig {
    /// Load configuration from `path`, or the defaults if there is no file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config = Self::parse(contents).map_err(|reason| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            reason,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock.min_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "lock.min_backoff_ms must be greater than 0".to_string(),
            ));
        }
        if self.lock.max_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "lock.max_backoff_ms must be greater than 0".to_string(),
            ));
        }
        if self.lock.min_backoff_ms > self.lock.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "lock.min_backoff_ms ({}) exceeds lock.max_backoff_ms ({})",
                self.lock.min_backoff_ms, self.lock.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Lock options for [`ccstore_lock::LockFile::acquire`].
    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            timeout: Duration::from_millis(self.lock.timeout_ms),
            min_backoff: Duration::from_millis(self.lock.min_backoff_ms),
            max_backoff: Duration::from_millis(self.lock.max_backoff_ms),
            contention_warning: Duration::from_millis(self.lock.contention_warning_ms),
        }
    }

    pub fn orphan_temp_age(&self) -> Duration {
        Duration::from_secs(self.housekeeping.orphan_temp_age_secs)
    }
}
