//! Rolling backup window.
//!
//! Backups live in `<base>/backups/` as `<collection>.<timestamp>.backup`,
//! each with its own integrity sidecar. Timestamps are UTC with microsecond
//! precision, so names sort chronologically; a name collision is resolved by
//! bumping the timestamp by one microsecond.

use crate::integrity::{tag_path, ChecksumAlgorithm, IntegrityTag};
use crate::{error::Result, Error};
use chrono::{Duration as ChronoDuration, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the backup directory under the storage base directory.
pub const BACKUP_DIR: &str = "backups";

const BACKUP_EXTENSION: &str = "backup";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y%m%dT%H%M%S%.f";

/// A backup file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub collection: String,
    pub created_at: NaiveDateTime,
    pub path: PathBuf,
}

impl BackupEntry {
    /// Sidecar holding this backup's integrity tag.
    pub fn tag_path(&self) -> PathBuf {
        tag_path(&self.path)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Creates, lists and prunes backups for all collections.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    max_backups: usize,
}

impl BackupManager {
    pub fn new(base_dir: &Path, max_backups: usize) -> Self {
        Self {
            dir: base_dir.join(BACKUP_DIR),
            max_backups,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Copy `document` into the window for `collection`.
    ///
    /// The backup tag is the document's stored tag when it has one, so a
    /// corrupted document stays detectably corrupted in the window. Returns
    /// `None` when `document` does not exist.
    pub fn create(
        &self,
        collection: &str,
        document: &Path,
        algorithm: ChecksumAlgorithm,
    ) -> Result<Option<BackupEntry>> {
        let bytes = match fs::read(document) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(document, e)),
        };

        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        // A damaged sidecar is copied as is so the backup stays detectably bad.
        let tag = match read_tag(&tag_path(document), algorithm) {
            Ok(Some(tag)) => tag.to_string(),
            Ok(None) => IntegrityTag::compute(algorithm, &bytes).to_string(),
            Err(Error::IntegrityMismatch { expected, .. }) => expected,
            Err(e) => return Err(e),
        };

        let mut created_at = Utc::now().naive_utc().trunc_subsecs(6);
        let mut path = self.path_for(collection, created_at);
        while path.exists() {
            created_at += ChronoDuration::microseconds(1);
            path = self.path_for(collection, created_at);
        }

        fs::write(&path, &bytes).map_err(|e| Error::io(&path, e))?;
        let entry = BackupEntry {
            collection: collection.to_string(),
            created_at,
            path,
        };
        let tag_file = entry.tag_path();
        fs::write(&tag_file, tag).map_err(|e| Error::io(&tag_file, e))?;

        tracing::info!("Backup created: {}", entry.file_name());
        Ok(Some(entry))
    }

    /// Backups of `collection`, newest first.
    pub fn list(&self, collection: &str) -> Result<Vec<BackupEntry>> {
        let mut entries: Vec<_> = self
            .scan()?
            .into_iter()
            .filter(|e| e.collection == collection)
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Backups of every collection, newest first.
    pub fn list_all(&self) -> Result<Vec<BackupEntry>> {
        let mut entries = self.scan()?;
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Remove backups of `collection` beyond the window, oldest first.
    ///
    /// Returns the number of backups removed.
    pub fn prune(&self, collection: &str) -> Result<usize> {
        let entries = self.list(collection)?;
        let mut removed = 0;

        for entry in entries.into_iter().skip(self.max_backups) {
            remove_if_exists(&entry.path)?;
            remove_if_exists(&entry.tag_path())?;
            tracing::info!("Removed old backup: {}", entry.file_name());
            removed += 1;
        }

        Ok(removed)
    }

    fn path_for(&self, collection: &str, created_at: NaiveDateTime) -> PathBuf {
        self.dir.join(format!(
            "{}.{}.{}",
            collection,
            created_at.format(TIMESTAMP_FORMAT),
            BACKUP_EXTENSION
        ))
    }

    fn scan(&self) -> Result<Vec<BackupEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.dir, e)),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| Error::io(&self.dir, e))?;
            let name = dir_entry.file_name();
            if let Some((collection, created_at)) = parse_backup_name(&name.to_string_lossy()) {
                entries.push(BackupEntry {
                    collection,
                    created_at,
                    path: dir_entry.path(),
                });
            }
        }
        Ok(entries)
    }
}

/// Split `<collection>.<timestamp>.backup` into its parts.
fn parse_backup_name(name: &str) -> Option<(String, NaiveDateTime)> {
    let stem = name.strip_suffix(BACKUP_EXTENSION)?.strip_suffix('.')?;
    let (collection, stamp) = stem.split_once('.')?;
    if collection.is_empty() {
        return None;
    }
    let created_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_PARSE_FORMAT).ok()?;
    Some((collection.to_string(), created_at))
}

/// Read a sidecar tag.
///
/// A missing sidecar reads as `None`. A sidecar that exists but does not
/// hold a tag is an [`Error::IntegrityMismatch`] carrying its raw text.
pub(crate) fn read_tag(path: &Path, fallback: ChecksumAlgorithm) -> Result<Option<IntegrityTag>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => String::new(),
        Err(e) => return Err(Error::io(path, e)),
    };

    match IntegrityTag::parse(&text, fallback) {
        Some(tag) => Ok(Some(tag)),
        None => Err(Error::IntegrityMismatch {
            path: path.to_path_buf(),
            expected: text.trim().to_string(),
            actual: "unreadable integrity tag".to_string(),
        }),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}
