//! Full-state export for backup and transfer between devices.
//!
//! An export bundles several collections with a checksum over their
//! serialized form. Collections are kept in a BTreeMap so the serialized
//! form, and therefore the checksum, does not depend on insertion order.

use crate::integrity::{ChecksumAlgorithm, IntegrityTag};
use crate::{error::Result, CollectionName, Entry, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the export format for future compatibility.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of several collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    /// Export format version
    pub format_version: u32,
    /// When the export was taken
    pub exported_at: DateTime<Utc>,
    /// Entries by collection name
    pub collections: BTreeMap<CollectionName, Vec<Entry>>,
    /// Integrity tag over `collections`
    pub checksum: String,
}

impl DataExport {
    /// Build an export of `collections`, stamped now.
    pub fn new(collections: BTreeMap<CollectionName, Vec<Entry>>) -> Result<Self> {
        let checksum = compute_checksum(&collections, ChecksumAlgorithm::Sha256)?.to_string();
        Ok(Self {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at: Utc::now(),
            collections,
            checksum,
        })
    }

    /// Total entries across all collections.
    pub fn entry_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Check the format version and the checksum.
    pub fn verify(&self) -> Result<()> {
        if self.format_version > EXPORT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported export format version: {} (max supported: {})",
                self.format_version, EXPORT_FORMAT_VERSION
            )));
        }

        let expected = IntegrityTag::parse(&self.checksum, ChecksumAlgorithm::Sha256)
            .ok_or_else(|| Error::InvalidSnapshot(format!("malformed checksum: {}", self.checksum)))?;
        let actual = compute_checksum(&self.collections, expected.algorithm)?;

        if actual != expected {
            return Err(Error::InvalidSnapshot(format!(
                "checksum mismatch: expected {}, got {}",
                expected, actual
            )));
        }
        Ok(())
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON and verify.
    pub fn from_json(json: &str) -> Result<Self> {
        let export: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        export.verify()?;
        Ok(export)
    }
}

/// Summary of an export without its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    /// Entry count per collection
    pub counts: BTreeMap<CollectionName, usize>,
}

impl From<&DataExport> for ExportMetadata {
    fn from(export: &DataExport) -> Self {
        Self {
            format_version: export.format_version,
            exported_at: export.exported_at,
            counts: export
                .collections
                .iter()
                .map(|(name, entries)| (name.clone(), entries.len()))
                .collect(),
        }
    }
}

fn compute_checksum(
    collections: &BTreeMap<CollectionName, Vec<Entry>>,
    algorithm: ChecksumAlgorithm,
) -> Result<IntegrityTag> {
    let bytes = serde_json::to_vec(collections).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(IntegrityTag::compute(algorithm, &bytes))
}
