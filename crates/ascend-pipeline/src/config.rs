//! Pipeline configuration

use crate::error::{PipelineError, Result};
use crate::schema::CURRENT_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

// ============================================================================
// Defaults
// ============================================================================

/// Root directory holding one sub-directory per snapshot version.
pub const DEFAULT_SNAPSHOT_DIR: &str = "data/snapshots";

/// Root directory for rejection artifacts.
pub const DEFAULT_REJECTED_DIR: &str = "data/rejected";

/// SQLite file backing the Upload Log.
pub const DEFAULT_UPLOAD_LOG: &str = "data/upload-log.db";

/// Destination order when `ASCEND_DESTINATIONS` is unset.
pub const DEFAULT_DESTINATIONS: &str = "objects,metadata,cache";

/// Default S3 region.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default S3 bucket.
pub const DEFAULT_S3_BUCKET: &str = "ascend-snapshots";

/// Default key prefix inside the bucket.
pub const DEFAULT_S3_PREFIX: &str = "snapshots";

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/ascend";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// SQLite file backing the cache index.
pub const DEFAULT_CACHE_DB: &str = "data/cache-index.db";

/// Root of the filesystem mirror.
pub const DEFAULT_MIRROR_DIR: &str = "data/mirror";

/// Names accepted in the destination list, in their natural dependency order.
pub const KNOWN_DESTINATIONS: [&str; 4] = ["objects", "metadata", "cache", "mirror"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub prefix: String,
    /// Static credentials; the default AWS provider chain is used when unset
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub snapshot_dir: PathBuf,
    pub rejected_dir: PathBuf,
    pub upload_log: PathBuf,
    pub schema_version: String,
    /// Delivery order, earliest dependency first
    pub destinations: Vec<String>,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub cache_db: PathBuf,
    pub mirror_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl PipelineConfig {
    /// Load and validate from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        let config = Self::load();
        config.validate()?;
        Ok(config)
    }

    /// Load from the environment without validating, for callers that
    /// apply their own overrides first
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset values take the defaults
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str, default: &str| PathBuf::from(get(key).unwrap_or_else(|| default.to_string()));

        Self {
            snapshot_dir: path("ASCEND_SNAPSHOT_DIR", DEFAULT_SNAPSHOT_DIR),
            rejected_dir: path("ASCEND_REJECTED_DIR", DEFAULT_REJECTED_DIR),
            upload_log: path("ASCEND_UPLOAD_LOG", DEFAULT_UPLOAD_LOG),
            schema_version: get("ASCEND_SCHEMA_VERSION")
                .unwrap_or_else(|| CURRENT_SCHEMA_VERSION.to_string()),
            destinations: parse_destinations(
                &get("ASCEND_DESTINATIONS").unwrap_or_else(|| DEFAULT_DESTINATIONS.to_string()),
            ),
            storage: StorageConfig {
                endpoint: get("S3_ENDPOINT"),
                region: get("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                bucket: get("S3_BUCKET").unwrap_or_else(|| DEFAULT_S3_BUCKET.to_string()),
                prefix: get("S3_PREFIX").unwrap_or_else(|| DEFAULT_S3_PREFIX.to_string()),
                access_key: get("S3_ACCESS_KEY").or_else(|| get("AWS_ACCESS_KEY_ID")),
                secret_key: get("S3_SECRET_KEY").or_else(|| get("AWS_SECRET_ACCESS_KEY")),
                path_style: get("S3_PATH_STYLE")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(false),
            },
            database: DatabaseConfig {
                url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections: get("DATABASE_MAX_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            },
            cache_db: path("ASCEND_CACHE_DB", DEFAULT_CACHE_DB),
            mirror_dir: path("ASCEND_MIRROR_DIR", DEFAULT_MIRROR_DIR),
        }
    }

    pub fn with_destinations<I, S>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.destinations = destinations.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_destinations(&self.destinations)?;

        if self.schema_version.is_empty() {
            return Err(PipelineError::config("Schema version cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(PipelineError::config(
                "Database max_connections must be greater than 0",
            ));
        }

        if self.storage.access_key.is_some() != self.storage.secret_key.is_some() {
            return Err(PipelineError::config(
                "S3 access key and secret key must be set together",
            ));
        }

        Ok(())
    }
}

/// Split a comma-separated destination list
pub fn parse_destinations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn validate_destinations(destinations: &[String]) -> Result<()> {
    if destinations.is_empty() {
        return Err(PipelineError::config("Destination list cannot be empty"));
    }

    let mut seen = HashSet::new();
    for name in destinations {
        if !KNOWN_DESTINATIONS.contains(&name.as_str()) {
            return Err(PipelineError::config(format!(
                "Unknown destination '{}' (expected one of: {})",
                name,
                KNOWN_DESTINATIONS.join(", ")
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(PipelineError::config(format!(
                "Destination '{name}' is listed more than once"
            )));
        }
    }
    Ok(())
}
