//! Immutable, versioned snapshots
//!
//! Layout under the snapshot root:
//!
//! ```text
//! {root}/
//!   v1.0.0/
//!     problems.json
//!     contests.json
//!     topics.json
//!     manifest.json
//!     checksum.txt
//! ```
//!
//! The manager is the only writer. A version directory is published with a
//! single rename of a fully written staging directory, and nothing ever
//! edits or removes it afterwards. Data files carry only records, never the
//! version or a timestamp, so identical batches produce identical
//! checksums regardless of the version they are created under.

mod handle;
pub mod manifest;

pub use handle::SnapshotHandle;
pub use manifest::{Manifest, ManifestFile, CHECKSUM_FILE, MANIFEST_FILE};

use crate::error::{PipelineError, Result};
use ascend_common::{checksum, EntityKind, RecordBatch, SnapshotVersion, VersionBump};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const STAGING_PREFIX: &str = ".staging-";

/// Extra manifest fields supplied at creation time
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub schema_version: String,
    pub notes: Option<String>,
}

impl CreateOptions {
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            schema_version: schema_version.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

pub struct SnapshotManager {
    root: PathBuf,
    #[cfg(test)]
    fail_before: Option<&'static str>,
}

impl SnapshotManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            #[cfg(test)]
            fail_before: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, version: SnapshotVersion) -> PathBuf {
        self.root.join(version.to_string())
    }

    pub fn exists(&self, version: SnapshotVersion) -> bool {
        self.version_dir(version).exists()
    }

    /// Freeze a validated batch as `version`
    ///
    /// Fails with `VersionConflict` without touching anything if the version
    /// already exists. On any other failure the staging directory is removed
    /// and the version does not exist.
    #[instrument(skip(self, records, options), fields(root = %self.root.display()))]
    pub fn create(
        &self,
        version: SnapshotVersion,
        records: &RecordBatch,
        options: &CreateOptions,
    ) -> Result<Manifest> {
        let target = self.version_dir(version);
        if target.exists() {
            warn!(%version, "Refusing to recreate existing snapshot");
            return Err(PipelineError::VersionConflict(version));
        }

        std::fs::create_dir_all(&self.root)?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{STAGING_PREFIX}{version}-"))
            .tempdir_in(&self.root)?;

        let mut files = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let file_name = kind.file_name();
            let data = match kind {
                EntityKind::Problem => serde_json::to_vec_pretty(&records.problems)?,
                EntityKind::Contest => serde_json::to_vec_pretty(&records.contests)?,
                EntityKind::Topic => serde_json::to_vec_pretty(&records.topics)?,
            };
            self.write_staged(staging.path(), &file_name, &data)?;
            debug!(file = %file_name, bytes = data.len(), "Staged snapshot file");
            files.push(ManifestFile::new(file_name, &data));
        }

        let manifest = Manifest {
            version,
            created_at: Utc::now(),
            schema_version: options.schema_version.clone(),
            files,
            record_counts: records.record_counts(),
            notes: options.notes.clone(),
        };

        self.write_staged(
            staging.path(),
            MANIFEST_FILE,
            &serde_json::to_vec_pretty(&manifest)?,
        )?;
        self.write_staged(
            staging.path(),
            CHECKSUM_FILE,
            manifest.checksum_listing().as_bytes(),
        )?;

        if let Err(e) = std::fs::rename(staging.path(), &target) {
            // Lost a race with another writer for the same version
            if target.exists() {
                return Err(PipelineError::VersionConflict(version));
            }
            return Err(e.into());
        }

        info!(
            %version,
            files = manifest.files.len(),
            records = manifest.total_records(),
            bytes = manifest.total_bytes(),
            "Snapshot created"
        );
        Ok(manifest)
    }

    fn write_staged(&self, staging: &Path, file_name: &str, data: &[u8]) -> Result<()> {
        #[cfg(test)]
        {
            if self.fail_before == Some(file_name) {
                return Err(std::io::Error::other(format!("injected failure writing {file_name}")).into());
            }
        }
        std::fs::write(staging.join(file_name), data)?;
        Ok(())
    }

    fn read_manifest(&self, version: SnapshotVersion) -> Result<Manifest> {
        let dir = self.version_dir(version);
        if !dir.is_dir() {
            return Err(PipelineError::VersionNotFound(version));
        }

        let corrupt = || PipelineError::SnapshotCorruption {
            version,
            files: vec![MANIFEST_FILE.to_string()],
        };
        let bytes = std::fs::read(dir.join(MANIFEST_FILE)).map_err(|e| {
            warn!(%version, error = %e, "Manifest unreadable");
            corrupt()
        })?;
        let manifest: Manifest = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(%version, error = %e, "Manifest unparseable");
            corrupt()
        })?;

        if manifest.version != version {
            warn!(%version, recorded = %manifest.version, "Manifest version does not match directory");
            return Err(corrupt());
        }
        Ok(manifest)
    }

    /// Recompute every checksum and size listed in the manifest
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn verify(&self, version: SnapshotVersion) -> Result<Manifest> {
        let manifest = self.read_manifest(version)?;
        let dir = self.version_dir(version);
        let mut bad_files = Vec::new();

        for file in &manifest.files {
            let name = &file.file_path;
            if Path::new(name).components().count() != 1 || name.starts_with('.') {
                warn!(%version, file = %name, "Manifest lists a path outside the snapshot");
                bad_files.push(name.clone());
                continue;
            }

            let path = dir.join(name);
            let size = match std::fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(%version, file = %name, error = %e, "Snapshot file missing");
                    bad_files.push(name.clone());
                    continue;
                },
            };
            if size != file.byte_size {
                warn!(%version, file = %name, expected = file.byte_size, actual = size, "Size mismatch");
                bad_files.push(name.clone());
                continue;
            }

            if let Err(e) = checksum::verify_file_checksum(&path, &file.checksum) {
                warn!(%version, file = %name, error = %e, "Checksum mismatch");
                bad_files.push(name.clone());
            }
        }

        if !bad_files.is_empty() {
            return Err(PipelineError::SnapshotCorruption {
                version,
                files: bad_files,
            });
        }

        info!(%version, files = manifest.files.len(), "Snapshot verified");
        Ok(manifest)
    }

    /// Published snapshots ordered by creation time
    pub fn list(&self) -> Result<Vec<Manifest>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut manifests = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            let Ok(version) = name.parse::<SnapshotVersion>() else {
                debug!(dir = %name, "Skipping non-snapshot directory");
                continue;
            };
            match self.read_manifest(version) {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => warn!(%version, error = %e, "Skipping snapshot with unreadable manifest"),
            }
        }

        manifests.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.version.cmp(&b.version))
        });
        Ok(manifests)
    }

    /// Read-only handle for delivery; does not verify
    pub fn open(&self, version: SnapshotVersion) -> Result<SnapshotHandle> {
        let manifest = self.read_manifest(version)?;
        Ok(SnapshotHandle::new(self.version_dir(version), manifest))
    }

    /// Suggest the version after the highest published one
    pub fn next_version(&self, bump: VersionBump) -> Result<SnapshotVersion> {
        let highest = self
            .list()?
            .into_iter()
            .map(|m| m.version)
            .max()
            .unwrap_or(SnapshotVersion::new(0, 0, 0));
        Ok(highest.bump(bump))
    }
}
