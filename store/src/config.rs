//! Storage configuration.

use crate::integrity::ChecksumAlgorithm;
use crate::metrics::DEFAULT_METRICS_CAPACITY;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of backups kept per collection.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Base directory used when none is configured.
pub const DEFAULT_BASE_DIR: &str = "gym_data";

/// Settings for a [`DataStorage`](crate::DataStorage) instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Directory holding one JSON document per collection
    pub base_dir: PathBuf,
    /// Backups retained per collection
    pub max_backups: usize,
    /// Algorithm for newly written integrity tags
    pub checksum: ChecksumAlgorithm,
    /// Retry policy used by `with_retry`
    pub retry: RetryPolicy,
    /// Metrics retained in memory
    pub metrics_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }
}

impl StorageConfig {
    /// Default settings rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            max_backups: DEFAULT_MAX_BACKUPS,
            checksum: ChecksumAlgorithm::default(),
            retry: RetryPolicy::default(),
            metrics_capacity: DEFAULT_METRICS_CAPACITY,
        }
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    pub fn with_checksum(mut self, checksum: ChecksumAlgorithm) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics_capacity(mut self, capacity: usize) -> Self {
        self.metrics_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StorageConfig::new("gym_data");
        assert_eq!(config.base_dir, PathBuf::from("gym_data"));
        assert_eq!(config.max_backups, 10);
        assert_eq!(config.checksum, ChecksumAlgorithm::Sha256);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.metrics_capacity, 1000);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: StorageConfig = serde_json::from_str(r#"{"maxBackups": 4}"#).unwrap();
        assert_eq!(config.max_backups, 4);
        assert_eq!(config.base_dir, PathBuf::from(DEFAULT_BASE_DIR));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn builder_overrides() {
        let config = StorageConfig::new("d")
            .with_max_backups(2)
            .with_checksum(ChecksumAlgorithm::Sha512)
            .with_retry(RetryPolicy::immediate(5))
            .with_metrics_capacity(10);

        assert_eq!(config.max_backups, 2);
        assert_eq!(config.checksum, ChecksumAlgorithm::Sha512);
        assert_eq!(config.retry, RetryPolicy::immediate(5));
        assert_eq!(config.metrics_capacity, 10);
    }
}
