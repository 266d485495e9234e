//! Upload run and entry states

use crate::error::{PipelineError, Result};
use ascend_common::SnapshotVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State machine of one upload run
///
/// ```text
/// NotStarted -> Verifying -> VerificationFailed
///                         -> Uploading(dest) -> Delivered
///                                            -> RollingBack -> RolledBack
///                                                           -> RollbackFailed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "destination")]
pub enum RunState {
    NotStarted,
    Verifying,
    VerificationFailed,
    Uploading(String),
    Delivered,
    RollingBack,
    RolledBack,
    RollbackFailed,
}

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::NotStarted => "not_started",
            RunState::Verifying => "verifying",
            RunState::VerificationFailed => "verification_failed",
            RunState::Uploading(_) => "uploading",
            RunState::Delivered => "delivered",
            RunState::RollingBack => "rolling_back",
            RunState::RolledBack => "rolled_back",
            RunState::RollbackFailed => "rollback_failed",
        }
    }

    /// Destination currently being uploaded, if any
    pub fn destination(&self) -> Option<&str> {
        match self {
            RunState::Uploading(destination) => Some(destination),
            _ => None,
        }
    }

    /// Rebuild from the stored `(state, destination)` columns
    pub fn from_parts(state: &str, destination: Option<String>) -> Result<Self> {
        Ok(match state {
            "not_started" => RunState::NotStarted,
            "verifying" => RunState::Verifying,
            "verification_failed" => RunState::VerificationFailed,
            "uploading" => RunState::Uploading(destination.unwrap_or_default()),
            "delivered" => RunState::Delivered,
            "rolling_back" => RunState::RollingBack,
            "rolled_back" => RunState::RolledBack,
            "rollback_failed" => RunState::RollbackFailed,
            other => {
                return Err(PipelineError::upload_log(format!("Unknown run state '{other}'")));
            },
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::VerificationFailed
                | RunState::Delivered
                | RunState::RolledBack
                | RunState::RollbackFailed
        )
    }

    /// Compensation was started but never completed
    pub fn needs_recovery(&self) -> bool {
        matches!(self, RunState::RollingBack | RunState::RollbackFailed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Uploading(destination) => write!(f, "uploading({destination})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Status of one `(version, destination)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Success,
    Failed,
    RolledBack,
}

impl EntryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Success => "success",
            EntryStatus::Failed => "failed",
            EntryStatus::RolledBack => "rolled_back",
        }
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(EntryStatus::Pending),
            "success" => Ok(EntryStatus::Success),
            "failed" => Ok(EntryStatus::Failed),
            "rolled_back" => Ok(EntryStatus::RolledBack),
            other => Err(PipelineError::upload_log(format!("Unknown entry status '{other}'"))),
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEntry {
    pub version: SnapshotVersion,
    pub destination: String,
    pub status: EntryStatus,
    pub updated_at: DateTime<Utc>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRun {
    pub run_id: Uuid,
    pub version: SnapshotVersion,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
