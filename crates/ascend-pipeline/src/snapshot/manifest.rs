//! Snapshot manifest

use ascend_common::{checksum, SnapshotVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const MANIFEST_FILE: &str = "manifest.json";
/// `sha256sum -c` compatible listing next to the manifest
pub const CHECKSUM_FILE: &str = "checksum.txt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Path relative to the snapshot directory
    pub file_path: String,
    /// Tagged digest, `sha256:<hex>`
    pub checksum: String,
    pub byte_size: u64,
}

impl ManifestFile {
    pub fn new(file_path: impl Into<String>, data: &[u8]) -> Self {
        Self {
            file_path: file_path.into(),
            checksum: checksum::tagged(&checksum::sha256_hex(data)),
            byte_size: data.len() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: SnapshotVersion,
    pub created_at: DateTime<Utc>,
    pub schema_version: String,
    pub files: Vec<ManifestFile>,
    pub record_counts: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Manifest {
    pub fn file(&self, file_path: &str) -> Option<&ManifestFile> {
        self.files.iter().find(|f| f.file_path == file_path)
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.byte_size).sum()
    }

    pub fn total_records(&self) -> usize {
        self.record_counts.values().sum()
    }

    /// Checksums in file order, independent of version and timestamp
    pub fn checksums(&self) -> Vec<(&str, &str)> {
        self.files
            .iter()
            .map(|f| (f.file_path.as_str(), f.checksum.as_str()))
            .collect()
    }

    /// Contents of `checksum.txt`
    pub fn checksum_listing(&self) -> String {
        self.files.iter().fold(String::new(), |mut out, f| {
            let _ = writeln!(out, "{}  {}", checksum::untagged(&f.checksum), f.file_path);
            out
        })
    }
}
