//! Ascend data pipeline core
//!
//! Takes normalized batches of canonical records through validation, freezes
//! accepted batches into immutable versioned snapshots and delivers those
//! snapshots to an ordered chain of destinations.
//!
//! ```text
//! batch dir -> schema -> integrity -> snapshot vX -> objects -> metadata -> cache
//!                  \          /
//!                rejection report
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ascend_pipeline::{BatchOutcome, CreateOptions, Pipeline, PipelineConfig};
//! use ascend_common::SnapshotVersion;
//! use std::path::Path;
//!
//! # fn main() -> ascend_pipeline::Result<()> {
//! let config = PipelineConfig::from_env()?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let outcome = pipeline.process_batch(
//!     Path::new("data/normalized/2024-06-01"),
//!     SnapshotVersion::new(1, 0, 0),
//!     "2024-06-01",
//!     &CreateOptions::new(&config.schema_version),
//! )?;
//! if let BatchOutcome::Rejected(rejection) = outcome {
//!     eprintln!("{} findings", rejection.violations.len());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod batch;
pub mod config;
pub mod destinations;
pub mod error;
pub mod integrity;
pub mod pipeline;
pub mod rejection;
pub mod schema;
pub mod snapshot;
pub mod upload;
pub mod violation;

pub use batch::RawBatch;
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use integrity::IntegrityChecker;
pub use pipeline::{default_batch_id, BatchOutcome, Pipeline, Rejection};
pub use rejection::{RejectionLog, RejectionRecord};
pub use schema::{SchemaRegistry, CURRENT_SCHEMA_VERSION};
pub use snapshot::{CreateOptions, Manifest, SnapshotHandle, SnapshotManager};
pub use upload::{
    Compensation, Destination, EntryStatus, RunState, SqliteUploadLog, UploadLog,
    UploadOrchestrator, UploadReport,
};
pub use violation::{Rule, Stage, Violation};
