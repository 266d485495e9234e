//! Rejection artifacts for batches that fail validation
//!
//! Each rejected batch gets `{root}/{batch_id}/` containing `errors.json`
//! (the machine-readable record) and `errors.log` (a human summary). Both
//! files are written into a staging directory and published with a single
//! rename, so a reader sees either the full report or nothing. Existing
//! reports are never overwritten.

use crate::error::{PipelineError, Result};
use crate::violation::{Stage, Violation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const REJECTION_FILE: &str = "errors.json";
pub const SUMMARY_FILE: &str = "errors.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub batch_id: String,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub errors: Vec<Violation>,
}

impl RejectionRecord {
    pub fn new(batch_id: impl Into<String>, stage: Stage, errors: Vec<Violation>) -> Self {
        Self {
            batch_id: batch_id.into(),
            stage,
            created_at: Utc::now(),
            errors,
        }
    }

    fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "batch:      {}", self.batch_id);
        let _ = writeln!(out, "stage:      {}", self.stage);
        let _ = writeln!(out, "created_at: {}", self.created_at.to_rfc3339());
        let _ = writeln!(out, "errors:     {}", self.errors.len());
        out.push('\n');
        for violation in &self.errors {
            let _ = writeln!(out, "{violation}");
        }
        out
    }
}

pub struct RejectionLog {
    root: PathBuf,
}

impl RejectionLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a rejection record; returns the report directory
    #[instrument(skip(self, record), fields(batch_id = %record.batch_id, stage = %record.stage))]
    pub fn write(&self, record: &RejectionRecord) -> Result<PathBuf> {
        validate_batch_id(&record.batch_id)?;
        std::fs::create_dir_all(&self.root)?;

        let target = self.root.join(&record.batch_id);
        if target.exists() {
            return Err(PipelineError::config(format!(
                "Rejection report for batch '{}' already exists at {}",
                record.batch_id,
                target.display()
            )));
        }

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.root)?;
        std::fs::write(
            staging.path().join(REJECTION_FILE),
            serde_json::to_vec_pretty(record)?,
        )?;
        std::fs::write(staging.path().join(SUMMARY_FILE), record.summary())?;
        std::fs::rename(staging.path(), &target)?;

        info!(
            path = %target.display(),
            errors = record.errors.len(),
            "Rejection report written"
        );
        Ok(target)
    }

    pub fn load(&self, batch_id: &str) -> Result<RejectionRecord> {
        validate_batch_id(batch_id)?;
        let content = std::fs::read(self.root.join(batch_id).join(REJECTION_FILE))?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Batch ids with a published report, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') && entry.path().join(REJECTION_FILE).is_file() {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn validate_batch_id(batch_id: &str) -> Result<()> {
    let valid = !batch_id.is_empty()
        && !batch_id.starts_with('.')
        && batch_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(PipelineError::config(format!(
            "Invalid batch id '{batch_id}': use letters, digits, '-', '_' or '.'"
        )))
    }
}
