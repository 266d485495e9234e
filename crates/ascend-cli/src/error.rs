//! Error types for the Ascend CLI
//!
//! Messages are user-facing and say what to do next where there is an
//! obvious next step.

use ascend_pipeline::{PipelineError, Stage};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// A batch failed validation; the findings were already printed
    #[error("Batch '{batch_id}' rejected at {stage} stage with {count} finding(s).{}", report_hint(.report))]
    Rejected {
        batch_id: String,
        stage: Stage,
        count: usize,
        report: Option<String>,
    },

    #[error("Snapshot {version} is corrupted: {files}. Create a new version from the source batch.")]
    Corrupted { version: String, files: String },

    #[error("Upload of {version} needs recovery (last run: {state}). Run 'ascend recover {version}' first.")]
    NeedsRecovery { version: String, state: String },

    #[error("Rollback failed: {0}")]
    RollbackFailed(String),

    #[error("Configuration error: {0}. Check your environment variables or flags.")]
    Config(String),

    #[error(transparent)]
    Pipeline(PipelineError),

    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn report_hint(report: &Option<String>) -> String {
    match report {
        Some(path) => format!(" Report written to {path}"),
        None => String::new(),
    }
}

impl CliError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::SnapshotCorruption { version, files } => Self::Corrupted {
                version: version.to_string(),
                files: files.join(", "),
            },
            PipelineError::RecoveryRequired { version, state } => Self::NeedsRecovery {
                version: version.to_string(),
                state: state.to_string(),
            },
            PipelineError::RollbackFailure { .. } => Self::RollbackFailed(err.to_string()),
            PipelineError::Config(msg) => Self::Config(msg),
            other => Self::Pipeline(other),
        }
    }
}
