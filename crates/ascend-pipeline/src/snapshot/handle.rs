use super::manifest::Manifest;
use crate::error::{PipelineError, Result};
use ascend_common::{EntityKind, RecordBatch, SnapshotVersion};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Read-only view of one published snapshot
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    dir: PathBuf,
    manifest: Manifest,
}

impl SnapshotHandle {
    pub(super) fn new(dir: PathBuf, manifest: Manifest) -> Self {
        Self { dir, manifest }
    }

    pub fn version(&self) -> SnapshotVersion {
        self.manifest.version
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Raw bytes of a file listed in the manifest
    pub fn read_file(&self, file_path: &str) -> Result<Vec<u8>> {
        if self.manifest.file(file_path).is_none() {
            return Err(PipelineError::config(format!(
                "File '{}' is not part of snapshot {}",
                file_path,
                self.version()
            )));
        }
        Ok(std::fs::read(self.dir.join(file_path))?)
    }

    /// Parse every entity collection
    pub fn records(&self) -> Result<RecordBatch> {
        Ok(RecordBatch::new(
            self.collection(EntityKind::Problem)?,
            self.collection(EntityKind::Contest)?,
            self.collection(EntityKind::Topic)?,
        ))
    }

    fn collection<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<Vec<T>> {
        let bytes = self.read_file(&kind.file_name())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
