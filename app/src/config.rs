//! Configuration management for the CLI.

use gymlog_store::config::{DEFAULT_BASE_DIR, DEFAULT_MAX_BACKUPS};
use gymlog_store::{RetryPolicy, StorageConfig};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the collections
    pub data_dir: PathBuf,
    /// Backups retained per collection
    pub max_backups: usize,
    /// Attempts per storage operation
    pub retry_attempts: u32,
    /// Delay before the first retry
    pub retry_base_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            data_dir: PathBuf::from(DEFAULT_BASE_DIR),
            max_backups: DEFAULT_MAX_BACKUPS,
            retry_attempts: retry.max_attempts,
            retry_base_delay: retry.base_delay,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("GYMLOG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let max_backups = match lookup("GYMLOG_MAX_BACKUPS") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidMaxBackups(value))?,
            None => defaults.max_backups,
        };

        let retry_attempts = match lookup("GYMLOG_RETRY_ATTEMPTS") {
            Some(value) => match value.parse() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidRetryAttempts(value)),
            },
            None => defaults.retry_attempts,
        };

        let retry_base_delay = match lookup("GYMLOG_RETRY_BASE_MS") {
            Some(value) => value
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidRetryDelay(value))?,
            None => defaults.retry_base_delay,
        };

        Ok(Self {
            data_dir,
            max_backups,
            retry_attempts,
            retry_base_delay,
        })
    }

    /// Storage settings derived from this configuration.
    pub fn storage_config(&self) -> StorageConfig {
        let retry = RetryPolicy::new(self.retry_attempts).with_base_delay(self.retry_base_delay);
        StorageConfig::new(&self.data_dir)
            .with_max_backups(self.max_backups)
            .with_retry(retry)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid GYMLOG_MAX_BACKUPS value: {0}")]
    InvalidMaxBackups(String),

    #[error("Invalid GYMLOG_RETRY_ATTEMPTS value (expected a positive integer): {0}")]
    InvalidRetryAttempts(String),

    #[error("Invalid GYMLOG_RETRY_BASE_MS value: {0}")]
    InvalidRetryDelay(String),
}
