//! Error types for the data pipeline

use crate::upload::RunState;
use crate::violation::{Stage, Violation};
use ascend_common::{CommonError, SnapshotVersion};
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline error taxonomy
///
/// Schema and integrity violations are raised inside a batch and turned
/// into a rejection artifact before they can leave it. Everything else is
/// surfaced to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Schema violation: {} finding(s) in batch '{batch_id}'", .violations.len())]
    SchemaViolation {
        batch_id: String,
        violations: Vec<Violation>,
    },

    #[error("Integrity violation: {} finding(s) in batch '{batch_id}'", .violations.len())]
    IntegrityViolation {
        batch_id: String,
        violations: Vec<Violation>,
    },

    #[error("Snapshot {0} already exists. Snapshots are immutable; create a new version instead.")]
    VersionConflict(SnapshotVersion),

    #[error("Snapshot {0} not found")]
    VersionNotFound(SnapshotVersion),

    #[error("Snapshot {version} failed verification: {}", .files.join(", "))]
    SnapshotCorruption {
        version: SnapshotVersion,
        files: Vec<String>,
    },

    #[error("Destination '{destination}' failed for {version}: {source:#}")]
    DestinationFailure {
        version: SnapshotVersion,
        destination: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "Rollback of {version} failed at destination '{destination}': {detail}. \
         Manual reconciliation required."
    )]
    RollbackFailure {
        version: SnapshotVersion,
        destination: String,
        detail: String,
    },

    #[error("Upload of {version} is in state '{state}'. Run recovery before uploading again.")]
    RecoveryRequired {
        version: SnapshotVersion,
        state: RunState,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload log error: {0}")]
    UploadLog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn upload_log(msg: impl Into<String>) -> Self {
        Self::UploadLog(msg.into())
    }

    /// Wrap a stage's findings in the matching variant
    pub fn validation(stage: Stage, batch_id: impl Into<String>, violations: Vec<Violation>) -> Self {
        let batch_id = batch_id.into();
        match stage {
            Stage::Schema => Self::SchemaViolation {
                batch_id,
                violations,
            },
            Stage::Integrity => Self::IntegrityViolation {
                batch_id,
                violations,
            },
        }
    }

    /// Split a validation error into its stage and findings
    ///
    /// Any other error is handed back unchanged.
    pub fn into_validation(self) -> std::result::Result<(Stage, Vec<Violation>), Self> {
        match self {
            Self::SchemaViolation { violations, .. } => Ok((Stage::Schema, violations)),
            Self::IntegrityViolation { violations, .. } => Ok((Stage::Integrity, violations)),
            other => Err(other),
        }
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        Self::UploadLog(err.to_string())
    }
}
