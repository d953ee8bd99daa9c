//! Integrity tags for stored documents.
//!
//! A tag is a content hash of the exact bytes written to disk, rendered as
//! `<algorithm>:<lowercase hex>` and kept in a sidecar file next to the
//! document it describes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix appended to a document path to get its tag path.
pub const TAG_SUFFIX: &str = "checksum";

/// Hash algorithm used to compute integrity tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Name used in the rendered tag.
    pub fn name(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(ChecksumAlgorithm::Sha256),
            "sha512" => Some(ChecksumAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Hex digest of `bytes`.
    pub fn digest(self, bytes: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
            ChecksumAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
        }
    }
}

/// A content hash stored alongside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityTag {
    pub algorithm: ChecksumAlgorithm,
    pub digest: String,
}

impl IntegrityTag {
    /// Compute the tag of `bytes`.
    pub fn compute(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            digest: algorithm.digest(bytes),
        }
    }

    /// Parse a rendered tag.
    ///
    /// A bare hex digest without an algorithm prefix is read with
    /// `fallback`. Returns `None` for anything that is not a tag.
    pub fn parse(text: &str, fallback: ChecksumAlgorithm) -> Option<Self> {
        let text = text.trim();
        let (algorithm, digest) = match text.split_once(':') {
            Some((name, digest)) => (ChecksumAlgorithm::from_name(name)?, digest),
            None => (fallback, text),
        };

        if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        Some(Self {
            algorithm,
            digest: digest.to_ascii_lowercase(),
        })
    }

    /// Check `bytes` against this tag, returning the actual tag on mismatch.
    pub fn verify(&self, bytes: &[u8]) -> std::result::Result<(), IntegrityTag> {
        let actual = Self::compute(self.algorithm, bytes);
        if actual.digest == self.digest {
            Ok(())
        } else {
            Err(actual)
        }
    }
}

impl fmt::Display for IntegrityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.name(), self.digest)
    }
}

/// Sidecar path holding the tag for `document`.
pub fn tag_path(document: &Path) -> PathBuf {
    let mut name = document.as_os_str().to_owned();
    name.push(".");
    name.push(TAG_SUFFIX);
    PathBuf::from(name)
}
