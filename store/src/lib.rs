//! # gymlog store
//!
//! Durable local storage for named JSON record sets.
//!
//! Each collection (`exercises`, `sessions`, `weights`, `reports`, ...) is
//! kept as one JSON document holding an array of objects. The crate makes
//! sure that document is never observed half-written and that corruption is
//! detected and repaired from backups before anyone reads it.
//!
//! ## Guarantees
//!
//! - **Atomic replace**: writes go to a temp file, are verified, then renamed
//!   over the target
//! - **Integrity tags**: every document has a content hash in a sidecar file
//! - **Rolling backups**: the previous version is copied aside before each
//!   write; only the most recent N are kept
//! - **Retry**: transient I/O failures are retried with exponential backoff;
//!   corruption is never retried, it is restored instead
//!
//! ## Quick Start
//!
//! ```rust
//! use gymlog_store::{DataStorage, StorageConfig, Entry};
//! use serde_json::json;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut storage = DataStorage::open(StorageConfig::new(dir.path())).unwrap();
//!
//! let entries: Vec<Entry> = serde_json::from_value(json!([
//!     {"id": 1, "exercise_id": 3, "weight": 60.0, "reps": 10}
//! ])).unwrap();
//!
//! storage
//!     .with_retry("save_weights", |s| s.save("weights", &entries))
//!     .unwrap();
//!
//! assert_eq!(storage.load("weights").unwrap(), entries);
//! assert!(storage.load("sessions").unwrap().is_empty());
//! ```
//!
//! ## FFI
//!
//! The [`ffi`] module provides C-compatible functions for the host UI. All
//! data is exchanged as JSON strings.

pub mod backup;
pub mod config;
pub mod error;
pub mod ffi;
pub mod integrity;
pub mod metrics;
pub mod retry;
pub mod snapshot;
pub mod storage;

// Re-export main types at crate root
pub use backup::{BackupEntry, BackupManager};
pub use config::StorageConfig;
pub use error::{Error, Result};
pub use integrity::{ChecksumAlgorithm, IntegrityTag};
pub use metrics::{Metric, Metrics, MetricsSummary};
pub use retry::RetryPolicy;
pub use snapshot::{DataExport, ExportMetadata, EXPORT_FORMAT_VERSION};
pub use storage::{validate_collection_name, CollectionHealth, DataStorage, HealthReport};

/// Type aliases for clarity
pub type CollectionName = String;
pub type Entry = serde_json::Map<String, serde_json::Value>;

/// Collections the tracker keeps.
pub mod collections {
    pub const EXERCISES: &str = "exercises";
    pub const SESSIONS: &str = "sessions";
    pub const WEIGHTS: &str = "weights";
    pub const REPORTS: &str = "reports";

    /// Every collection, in display order.
    pub const ALL: [&str; 4] = [EXERCISES, SESSIONS, WEIGHTS, REPORTS];
}
