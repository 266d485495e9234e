//! S3-compatible bulk content store

use crate::config::StorageConfig;
use crate::snapshot::{SnapshotHandle, CHECKSUM_FILE, MANIFEST_FILE};
use crate::upload::Destination;
use anyhow::{Context, Result};
use ascend_common::SnapshotVersion;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};

pub const NAME: &str = "objects";

/// Writes every snapshot file to `{prefix}/{version}/{file}`
///
/// The manifest is written last, so a version prefix holding a manifest is
/// complete. Compensation deletes every key; S3 treats deleting a missing key
/// as success.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl ObjectStore {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        debug!(bucket = %config.bucket, endpoint = ?config.endpoint, "Initializing object store");

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, "ascend-object-store");
                aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .credentials_provider(credentials)
                    .region(Region::new(config.region.clone()))
            },
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder.force_path_style(config.path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(bucket = %config.bucket, "Object store client initialized");

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self, version: SnapshotVersion, file: &str) -> String {
        object_key(&self.prefix, version, file)
    }

    /// Files uploaded for a snapshot, manifest last
    fn files(snapshot: &SnapshotHandle) -> Vec<String> {
        snapshot
            .manifest()
            .files
            .iter()
            .map(|f| f.file_path.clone())
            .chain([CHECKSUM_FILE.to_string(), MANIFEST_FILE.to_string()])
            .collect()
    }

    /// Fetch an uploaded object, for reconciliation and tests
    pub async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to download s3://{}/{}", self.bucket, key))?;

        Ok(response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes()
            .to_vec())
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_not_found()) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context(format!(
                "Failed to check s3://{}/{}",
                self.bucket, key
            ))),
        }
    }
}

pub fn object_key(prefix: &str, version: SnapshotVersion, file: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{version}/{file}")
    } else {
        format!("{prefix}/{version}/{file}")
    }
}

#[async_trait]
impl Destination for ObjectStore {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version(), bucket = %self.bucket))]
    async fn deliver(&self, snapshot: &SnapshotHandle) -> Result<()> {
        for file in Self::files(snapshot) {
            let key = self.key(snapshot.version(), &file);
            let data = tokio::fs::read(snapshot.dir().join(&file))
                .await
                .with_context(|| format!("Failed to read snapshot file {file}"))?;

            debug!(key = %key, bytes = data.len(), "Uploading");
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .content_type("application/json")
                .body(ByteStream::from(data))
                .send()
                .await
                .with_context(|| format!("Failed to upload s3://{}/{}", self.bucket, key))?;
        }

        info!("Snapshot uploaded to object store");
        Ok(())
    }

    #[instrument(skip(self, snapshot), fields(version = %snapshot.version(), bucket = %self.bucket))]
    async fn compensate(&self, snapshot: &SnapshotHandle) -> Result<()> {
        for file in Self::files(snapshot).iter().rev() {
            let key = self.key(snapshot.version(), file);
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
                .with_context(|| format!("Failed to delete s3://{}/{}", self.bucket, key))?;
        }

        info!("Snapshot removed from object store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        let v = SnapshotVersion::new(1, 2, 0);
        assert_eq!(object_key("snapshots", v, "problems.json"), "snapshots/v1.2.0/problems.json");
        assert_eq!(object_key("/snapshots/", v, "manifest.json"), "snapshots/v1.2.0/manifest.json");
        assert_eq!(object_key("", v, "topics.json"), "v1.2.0/topics.json");
    }
}
