//! Batch runner: validation, integrity, snapshot
//!
//! Schema and integrity findings are raised as errors inside a batch and
//! settled here into a rejection report. Callers only ever see them as a
//! [`BatchOutcome::Rejected`] value.

use crate::batch::RawBatch;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::integrity::IntegrityChecker;
use crate::rejection::{RejectionLog, RejectionRecord};
use crate::schema::SchemaRegistry;
use crate::snapshot::{CreateOptions, Manifest, SnapshotManager};
use crate::violation::{Stage, Violation};
use ascend_common::{RecordBatch, SnapshotVersion};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A batch that did not pass validation
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub batch_id: String,
    pub stage: Stage,
    pub violations: Vec<Violation>,
    /// Report directory, when one was written
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome<T> {
    Accepted(T),
    Rejected(Rejection),
}

impl<T> BatchOutcome<T> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, BatchOutcome::Rejected(_))
    }
}

pub struct Pipeline {
    schemas: SchemaRegistry,
    integrity: IntegrityChecker,
    snapshots: Arc<SnapshotManager>,
    rejections: RejectionLog,
}

impl Pipeline {
    /// Pipeline with the built-in schema versions
    pub fn new(snapshots: Arc<SnapshotManager>, rejections: RejectionLog) -> Result<Self> {
        Ok(Self {
            schemas: SchemaRegistry::builtin()?,
            integrity: IntegrityChecker::new()?,
            snapshots,
            rejections,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            Arc::new(SnapshotManager::new(&config.snapshot_dir)),
            RejectionLog::new(&config.rejected_dir),
        )
    }

    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn snapshots(&self) -> &Arc<SnapshotManager> {
        &self.snapshots
    }

    pub fn rejections(&self) -> &RejectionLog {
        &self.rejections
    }

    /// Schema then integrity; the first failing stage ends validation
    fn validate(&self, batch: &RawBatch, batch_id: &str, schema_version: &str) -> Result<RecordBatch> {
        let violations = self.schemas.validate_batch(schema_version, batch)?;
        if !violations.is_empty() {
            return Err(PipelineError::validation(Stage::Schema, batch_id, violations));
        }

        let records = batch
            .to_records()
            .map_err(|violations| PipelineError::validation(Stage::Schema, batch_id, violations))?;

        let violations = self.integrity.check(&records);
        if !violations.is_empty() {
            return Err(PipelineError::validation(Stage::Integrity, batch_id, violations));
        }

        Ok(records)
    }

    /// Turn validation errors into a rejection, writing the report if asked
    fn settle<T>(&self, batch_id: &str, result: Result<T>, save_report: bool) -> Result<BatchOutcome<T>> {
        let (stage, violations) = match result {
            Ok(value) => return Ok(BatchOutcome::Accepted(value)),
            Err(e) => e.into_validation()?,
        };

        warn!(batch_id, %stage, errors = violations.len(), "Batch rejected");

        let report = if save_report {
            let record = RejectionRecord::new(batch_id, stage, violations.clone());
            Some(self.rejections.write(&record)?)
        } else {
            None
        };

        Ok(BatchOutcome::Rejected(Rejection {
            batch_id: batch_id.to_string(),
            stage,
            violations,
            report,
        }))
    }

    /// Validate a batch directory without creating a snapshot
    #[instrument(skip(self))]
    pub fn check_batch(
        &self,
        dir: &Path,
        batch_id: &str,
        schema_version: &str,
        save_report: bool,
    ) -> Result<BatchOutcome<RecordBatch>> {
        let batch = RawBatch::from_dir(dir)?;
        let result = self.validate(&batch, batch_id, schema_version);
        self.settle(batch_id, result, save_report)
    }

    /// Validate a batch directory and freeze it as `version`
    ///
    /// A rejected batch always gets a rejection report and never produces a
    /// snapshot.
    #[instrument(skip(self, options), fields(%version, schema_version = %options.schema_version))]
    pub fn process_batch(
        &self,
        dir: &Path,
        version: SnapshotVersion,
        batch_id: &str,
        options: &CreateOptions,
    ) -> Result<BatchOutcome<Manifest>> {
        let batch = RawBatch::from_dir(dir)?;
        self.process(&batch, version, batch_id, options)
    }

    /// Same as [`Pipeline::process_batch`] for an in-memory batch
    pub fn process(
        &self,
        batch: &RawBatch,
        version: SnapshotVersion,
        batch_id: &str,
        options: &CreateOptions,
    ) -> Result<BatchOutcome<Manifest>> {
        if self.snapshots.exists(version) {
            return Err(PipelineError::VersionConflict(version));
        }

        let result = self
            .validate(batch, batch_id, &options.schema_version)
            .and_then(|records| self.snapshots.create(version, &records, options));

        let outcome = self.settle(batch_id, result, true)?;
        if let BatchOutcome::Accepted(manifest) = &outcome {
            info!(
                batch_id,
                records = manifest.total_records(),
                "Batch accepted into snapshot"
            );
        }
        Ok(outcome)
    }
}

/// `{dir name}_{UTC timestamp}_{random suffix}`, restricted to report-safe characters
///
/// The suffix keeps two batches from the same directory in the same second
/// from sharing a rejection report directory.
pub fn default_batch_id(dir: &Path) -> String {
    let name: String = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_matches('-');
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let suffix = Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    if name.is_empty() {
        format!("batch_{stamp}_{suffix}")
    } else {
        format!("{name}_{stamp}_{suffix}")
    }
}
