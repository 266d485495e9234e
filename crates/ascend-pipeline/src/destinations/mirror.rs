//! Filesystem mirror of published snapshots

use crate::snapshot::{SnapshotHandle, CHECKSUM_FILE, MANIFEST_FILE};
use crate::upload::Destination;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

pub const NAME: &str = "mirror";

/// Copies a snapshot to `{root}/{version}/`
///
/// Files are copied into a staging directory under the root and renamed
/// into place, so a mirror directory is either complete or absent.
#[derive(Debug, Clone)]
pub struct FsMirror {
    root: PathBuf,
}

impl FsMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn copy_all(&self, snapshot: &SnapshotHandle, target: &Path) -> Result<()> {
        if target.exists() {
            debug!(path = %target.display(), "Mirror already present");
            return Ok(());
        }
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create mirror root {}", self.root.display()))?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".staging-{}-", snapshot.version()))
            .tempdir_in(&self.root)
            .context("Failed to create mirror staging directory")?;

        let files = snapshot
            .manifest()
            .files
            .iter()
            .map(|f| f.file_path.as_str())
            .chain([CHECKSUM_FILE, MANIFEST_FILE]);
        for file in files {
            std::fs::copy(snapshot.dir().join(file), staging.path().join(file))
                .with_context(|| format!("Failed to copy {file}"))?;
        }

        if let Err(e) = std::fs::rename(staging.path(), target) {
            if !target.exists() {
                return Err(e)
                    .with_context(|| format!("Failed to publish mirror {}", target.display()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Destination for FsMirror {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version(), root = %self.root.display()))]
    async fn deliver(&self, snapshot: &SnapshotHandle) -> Result<()> {
        let target = self.root.join(snapshot.version().to_string());
        let this = self.clone();
        let handle = snapshot.clone();
        tokio::task::spawn_blocking(move || this.copy_all(&handle, &target))
            .await
            .context("Mirror copy task panicked")??;
        info!("Snapshot mirrored");
        Ok(())
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version(), root = %self.root.display()))]
    async fn compensate(&self, snapshot: &SnapshotHandle) -> Result<()> {
        let target = self.root.join(snapshot.version().to_string());
        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => info!("Mirror removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => debug!("Mirror already absent"),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", target.display()));
            },
        }
        Ok(())
    }
}
