//! DataStorage - durable JSON record sets on the local filesystem.
//!
//! Each collection is one JSON document (`<base>/<collection>.json`) holding
//! an array of objects, with an integrity tag in a sidecar file. Writes go
//! through a temp file in the same directory and are renamed over the
//! target, so a reader sees either the old document or the new one. Every
//! write is preceded by a backup of the current document; a document that
//! fails verification on load is replaced by the newest valid backup.

use crate::backup::{read_tag, BackupEntry, BackupManager};
use crate::integrity::{tag_path, IntegrityTag};
use crate::metrics::{Metrics, MetricsSummary};
use crate::retry::RetryPolicy;
use crate::snapshot::DataExport;
use crate::{error::Result, CollectionName, Entry, Error, StorageConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const DOCUMENT_EXTENSION: &str = "json";
const MAX_COLLECTION_NAME_LEN: usize = 64;

/// Status of one collection in a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionHealth {
    pub name: CollectionName,
    pub exists: bool,
    pub valid: bool,
    /// Entry count when the document is present and valid
    pub entries: Option<usize>,
}

/// Snapshot of the storage state for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub storage_path: PathBuf,
    pub data_files_ok: bool,
    pub collections: Vec<CollectionHealth>,
    pub backups_available: usize,
    pub performance: MetricsSummary,
}

/// Load/save access to named record sets with backups, integrity tags and
/// retry.
///
/// One instance owns one base directory. It is meant to be constructed once
/// and handed to whatever needs persistence.
#[derive(Debug)]
pub struct DataStorage {
    config: StorageConfig,
    backups: BackupManager,
    metrics: Metrics,
    #[cfg(test)]
    fault: Option<Fault>,
}

/// Where an injected write failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    BeforeRename,
    BeforeTagRename,
}

impl DataStorage {
    /// Open storage rooted at `config.base_dir`, creating directories as
    /// needed.
    pub fn open(config: StorageConfig) -> Result<Self> {
        let backups = BackupManager::new(&config.base_dir, config.max_backups);
        fs::create_dir_all(backups.dir()).map_err(|e| Error::io(backups.dir(), e))?;

        tracing::debug!("Opened storage at {}", config.base_dir.display());

        Ok(Self {
            metrics: Metrics::with_capacity(config.metrics_capacity),
            backups,
            config,
            #[cfg(test)]
            fault: None,
        })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Path of the live document for `collection`.
    pub fn document_path(&self, collection: &str) -> Result<PathBuf> {
        validate_collection_name(collection)?;
        Ok(self
            .config
            .base_dir
            .join(format!("{}.{}", collection, DOCUMENT_EXTENSION)))
    }

    /// Read all entries of `collection`.
    ///
    /// A missing document reads as empty. A document that fails its
    /// integrity check or does not parse is restored from the newest valid
    /// backup first; without one this fails with [`Error::NoValidBackup`].
    pub fn load(&mut self, collection: &str) -> Result<Vec<Entry>> {
        let path = self.document_path(collection)?;
        self.observe("load", |storage| storage.load_document(collection, &path))
    }

    /// Replace all entries of `collection`.
    ///
    /// The current document (if any) is backed up first and the window is
    /// pruned afterwards. An error before the document is renamed into place
    /// leaves the previous document intact. An error while renaming the tag
    /// leaves the new document with the old tag; the next [`load`] sees the
    /// mismatch and restores the backup taken by this call.
    ///
    /// [`load`]: Self::load
    pub fn save(&mut self, collection: &str, entries: &[Entry]) -> Result<()> {
        let path = self.document_path(collection)?;
        self.observe("save", |storage| {
            storage.save_document(collection, &path, entries)
        })
    }

    /// Replace the live document of `collection` with its newest backup that
    /// passes verification.
    pub fn restore_from_backup(&mut self, collection: &str) -> Result<BackupEntry> {
        let path = self.document_path(collection)?;
        self.observe("restore", |storage| {
            storage.restore_document(collection, &path)
        })
    }

    /// Check `collection` without attempting recovery.
    ///
    /// Corruption is reported as [`Error::CorruptedState`]; a missing
    /// document is fine.
    pub fn verify(&self, collection: &str) -> Result<()> {
        let path = self.document_path(collection)?;
        match self.read_document(&path) {
            Ok(_) => Ok(()),
            Err(err) if err.is_corruption() => Err(Error::CorruptedState {
                collection: collection.to_string(),
                reason: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    /// Verify each collection and restore the ones that fail.
    ///
    /// Returns the collections that were restored. Failures are logged and
    /// otherwise ignored so one bad collection does not block the rest.
    pub fn verify_all(&mut self, collections: &[&str]) -> Vec<CollectionName> {
        let mut restored = Vec::new();

        for &collection in collections {
            match self.verify(collection) {
                Ok(()) => {}
                Err(err) if err.is_corruption() => {
                    tracing::warn!("{}, attempting restore", err);
                    match self.restore_from_backup(collection) {
                        Ok(_) => restored.push(collection.to_string()),
                        Err(err) => tracing::error!(
                            "Failed to restore {}, data may be corrupted: {}",
                            collection,
                            err
                        ),
                    }
                }
                Err(err) => tracing::error!("Could not verify {}: {}", collection, err),
            }
        }

        restored
    }

    /// Run `op` under the configured retry policy.
    ///
    /// Each attempt is recorded as a metric named `operation`.
    pub fn with_retry<T, F>(&mut self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let policy = self.config.retry.clone();
        self.with_retry_policy(operation, &policy, op)
    }

    /// Like [`with_retry`](Self::with_retry) with a different attempt count.
    pub fn with_retry_attempts<T, F>(
        &mut self,
        operation: &str,
        max_attempts: u32,
        op: F,
    ) -> Result<T>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let policy = RetryPolicy {
            max_attempts,
            ..self.config.retry.clone()
        };
        self.with_retry_policy(operation, &policy, op)
    }

    /// Like [`with_retry`](Self::with_retry) with an explicit policy.
    pub fn with_retry_policy<T, F>(
        &mut self,
        operation: &str,
        policy: &RetryPolicy,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        policy.run(operation, |_| {
            let started = Instant::now();
            let result = op(self);
            self.record_metric(operation, started.elapsed(), result.is_ok());
            result
        })
    }

    /// Record an operation metric.
    pub fn record_metric(&mut self, name: &str, duration: Duration, success: bool) {
        self.metrics.record(name, duration, success);
    }

    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Backups of `collection`, newest first.
    pub fn list_backups(&self, collection: &str) -> Result<Vec<BackupEntry>> {
        validate_collection_name(collection)?;
        self.backups.list(collection)
    }

    /// Backups of all collections, newest first.
    pub fn list_all_backups(&self) -> Result<Vec<BackupEntry>> {
        self.backups.list_all()
    }

    /// Collections that currently have a document on disk, sorted by name.
    pub fn collections(&self) -> Result<Vec<CollectionName>> {
        let base = &self.config.base_dir;
        let read_dir = fs::read_dir(base).map_err(|e| Error::io(base, e))?;

        let mut names = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| Error::io(base, e))?;
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_collection_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Report the state of every collection on disk.
    pub fn health(&self) -> Result<HealthReport> {
        let mut collections = Vec::new();
        for name in self.collections()? {
            let path = self.document_path(&name)?;
            let (exists, valid, entries) = match self.read_document(&path) {
                Ok(Some(entries)) => (true, true, Some(entries.len())),
                Ok(None) => (false, true, None),
                Err(_) => (true, false, None),
            };
            collections.push(CollectionHealth {
                name,
                exists,
                valid,
                entries,
            });
        }

        Ok(HealthReport {
            storage_path: self.config.base_dir.clone(),
            data_files_ok: collections.iter().all(|c| c.valid),
            collections,
            backups_available: self.backups.list_all()?.len(),
            performance: self.metrics.summary(),
        })
    }

    /// Load `collections` into a transferable export.
    pub fn export_all(&mut self, collections: &[&str]) -> Result<DataExport> {
        let mut data = BTreeMap::new();
        for &collection in collections {
            data.insert(collection.to_string(), self.load(collection)?);
        }
        DataExport::new(data)
    }

    /// Save every collection in `export` after checking its checksum.
    ///
    /// Each collection is backed up before it is replaced.
    pub fn import_all(&mut self, export: &DataExport) -> Result<()> {
        export.verify()?;
        for name in export.collections.keys() {
            validate_collection_name(name)?;
        }

        for (name, entries) in &export.collections {
            self.save(name, entries)?;
        }

        tracing::info!("Imported {} collection(s)", export.collections.len());
        Ok(())
    }

    fn observe<T, F>(&mut self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let started = Instant::now();
        let result = f(self);
        self.record_metric(operation, started.elapsed(), result.is_ok());
        if let Err(err) = &result {
            tracing::error!("Operation {} failed: {}", operation, err);
        }
        result
    }

    fn load_document(&mut self, collection: &str, path: &Path) -> Result<Vec<Entry>> {
        match self.read_document(path) {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(err) if err.is_corruption() => {
                tracing::warn!(
                    "Integrity check failed for {}, attempting restore: {}",
                    path.display(),
                    err
                );
                self.restore_document(collection, path)?;
                self.read_document(path)?
                    .ok_or_else(|| Error::CorruptedState {
                        collection: collection.to_string(),
                        reason: "document missing after restore".to_string(),
                    })
            }
            Err(err) => Err(err),
        }
    }

    fn save_document(&self, collection: &str, path: &Path, entries: &[Entry]) -> Result<()> {
        self.backups
            .create(collection, path, self.config.checksum)?;

        let bytes =
            serde_json::to_vec_pretty(entries).map_err(|e| Error::Serialization(e.to_string()))?;
        self.replace_document(path, &bytes)?;

        if let Err(err) = self.backups.prune(collection) {
            tracing::warn!("Failed to clean up old backups for {}: {}", collection, err);
        }

        tracing::debug!("Saved {} ({} entries)", path.display(), entries.len());
        Ok(())
    }

    fn restore_document(&self, collection: &str, path: &Path) -> Result<BackupEntry> {
        for backup in self.backups.list(collection)? {
            let bytes = match fs::read(&backup.path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::io(&backup.path, e)),
            };
            let checked = read_tag(&backup.tag_path(), self.config.checksum)
                .and_then(|tag| check_document(&backup.path, &bytes, tag.as_ref()));

            match checked {
                Ok(_) => {
                    self.replace_document(path, &bytes)?;
                    tracing::info!("Restored {} from backup: {}", collection, backup.file_name());
                    return Ok(backup);
                }
                Err(err) if err.is_corruption() => {
                    tracing::warn!("Skipping invalid backup {}: {}", backup.file_name(), err);
                }
                Err(err) => return Err(err),
            }
        }

        tracing::warn!("No valid backup found for {}", collection);
        Err(Error::NoValidBackup(collection.to_string()))
    }

    /// Read and verify a document; `None` when it does not exist.
    fn read_document(&self, path: &Path) -> Result<Option<Vec<Entry>>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path, e)),
        };
        let tag = read_tag(&tag_path(path), self.config.checksum)?;
        check_document(path, &bytes, tag.as_ref()).map(Some)
    }

    /// Atomically replace `path` with `bytes` and write its tag.
    ///
    /// The document is renamed into place before its tag. If the process
    /// dies between the two renames the pair mismatches and the next load
    /// restores from backup.
    fn replace_document(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or(self.config.base_dir.as_path());
        let tag = IntegrityTag::compute(self.config.checksum, bytes);

        let document = write_temp(dir, bytes)?;
        let written = fs::read(document.path()).map_err(|e| Error::io(document.path(), e))?;
        check_document(document.path(), &written, Some(&tag))?;

        let tag_file = write_temp(dir, tag.to_string().as_bytes())?;

        self.fault_point(Fault::BeforeRename, path)?;

        document
            .persist(path)
            .map_err(|e| Error::io(path, e.error))?;
        let tag_target = tag_path(path);
        self.fault_point(Fault::BeforeTagRename, &tag_target)?;
        tag_file
            .persist(&tag_target)
            .map_err(|e| Error::io(&tag_target, e.error))?;
        Ok(())
    }

    #[cfg(test)]
    fn fault_point(&self, at: Fault, path: &Path) -> Result<()> {
        if self.fault == Some(at) {
            return Err(Error::io(
                path,
                io::Error::new(io::ErrorKind::Interrupted, format!("injected fault {:?}", at)),
            ));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline]
    fn fault_point(&self, _at: Fault, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Check `bytes` against `tag` (when present) and parse them as entries.
fn check_document(path: &Path, bytes: &[u8], tag: Option<&IntegrityTag>) -> Result<Vec<Entry>> {
    if let Some(tag) = tag {
        tag.verify(bytes).map_err(|actual| Error::IntegrityMismatch {
            path: path.to_path_buf(),
            expected: tag.to_string(),
            actual: actual.to_string(),
        })?;
    }

    serde_json::from_slice(bytes).map_err(|e| Error::InvalidDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_temp(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    let written = file.write_all(bytes).and_then(|()| file.as_file().sync_all());
    written.map_err(|e| Error::io(file.path(), e))?;
    Ok(file)
}

/// Collection names double as file names: ASCII alphanumerics, `_` and `-`.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidCollectionName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn entries(value: Value) -> Vec<Entry> {
        serde_json::from_value(value).unwrap()
    }

    fn open(dir: &TempDir) -> DataStorage {
        let config = StorageConfig::new(dir.path())
            .with_max_backups(3)
            .with_retry(RetryPolicy::immediate(3));
        DataStorage::open(config).unwrap()
    }

    #[test]
    fn collection_names() {
        assert!(validate_collection_name("weights").is_ok());
        assert!(validate_collection_name("warmup-dynamic_2").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("../etc").is_err());
        assert!(validate_collection_name("a.b").is_err());
        assert!(validate_collection_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn interrupted_save_keeps_previous_document() {
        let dir = TempDir::new().unwrap();
        let mut storage = open(&dir);
        let original = entries(json!([{"id": 1, "name": "Back squat"}]));
        storage.save("exercises", &original).unwrap();

        storage.fault = Some(Fault::BeforeRename);
        let result = storage.save("exercises", &entries(json!([{"id": 2}])));
        assert!(matches!(result, Err(Error::Io { kind: io::ErrorKind::Interrupted, .. })));

        storage.fault = None;
        assert_eq!(storage.load("exercises").unwrap(), original);

        // No temp files are left behind next to the documents.
        let mut leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        leftovers.sort();
        assert_eq!(leftovers, vec!["exercises.json", "exercises.json.checksum"]);
    }

    #[test]
    fn interrupted_first_save_leaves_no_document() {
        let dir = TempDir::new().unwrap();
        let mut storage = open(&dir);

        storage.fault = Some(Fault::BeforeRename);
        assert!(storage.save("weights", &entries(json!([{"id": 1}]))).is_err());
        storage.fault = None;

        assert!(!dir.path().join("weights.json").exists());
        assert!(storage.load("weights").unwrap().is_empty());
    }

    #[test]
    fn interrupted_save_is_retried() {
        let dir = TempDir::new().unwrap();
        let mut storage = open(&dir);
        let data = entries(json!([{"id": 7}]));

        let mut attempts = 0;
        storage
            .with_retry("save_weights", |s| {
                attempts += 1;
                s.fault = (attempts < 2).then_some(Fault::BeforeRename);
                s.save("weights", &data)
            })
            .unwrap();

        assert_eq!(attempts, 2);
        assert_eq!(storage.load("weights").unwrap(), data);
        assert_eq!(storage.metrics().count("save_weights"), 2);
    }

    #[test]
    fn interrupted_tag_rename_is_restored_on_load() {
        let dir = TempDir::new().unwrap();
        let mut storage = open(&dir);
        let original = entries(json!([{"id": 1, "weight": 60.0}]));
        storage.save("weights", &original).unwrap();

        storage.fault = Some(Fault::BeforeTagRename);
        let result = storage.save("weights", &entries(json!([{"id": 1, "weight": 70.0}])));
        assert!(matches!(result, Err(Error::Io { kind: io::ErrorKind::Interrupted, .. })));
        storage.fault = None;

        // The new document sits next to the old tag.
        assert!(matches!(
            storage.verify("weights"),
            Err(Error::CorruptedState { .. })
        ));
        assert_eq!(storage.load("weights").unwrap(), original);
        assert!(storage.verify("weights").is_ok());
    }

    #[test]
    fn operations_are_recorded_as_metrics() {
        let dir = TempDir::new().unwrap();
        let mut storage = open(&dir);

        storage.save("reports", &[]).unwrap();
        storage.load("reports").unwrap();
        let _ = storage.restore_from_backup("reports");

        let metrics = storage.metrics();
        assert_eq!(metrics.count("save"), 1);
        assert_eq!(metrics.count("load"), 1);
        assert_eq!(metrics.count("restore"), 1);
        assert_eq!(storage.metrics_summary().failure_counts["restore"], 1);
    }
}
