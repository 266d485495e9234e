//! Ascend Common Library
//!
//! Shared types, utilities, and error handling for the Ascend data pipeline.
//!
//! # Overview
//!
//! - **Model**: canonical Problem, Contest and Topic records
//! - **Identifiers**: deterministic UUIDs derived from source-native keys
//! - **Versions**: snapshot version strings (`vMAJOR.MINOR.PATCH`)
//! - **Checksums**: SHA-256 helpers used by snapshot manifests
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use ascend_common::{ids, model::Source};
//!
//! let id = ids::problem_id(Source::Leetcode, "1");
//! assert_eq!(id, ids::problem_id(Source::Leetcode, "1"));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod ids;
pub mod logging;
pub mod model;
pub mod version;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use model::{
    Contest, ContestProblemRef, ContestType, Difficulty, EntityKind, Problem, RecordBatch,
    Source, Topic, TopicCategory,
};
pub use version::{SnapshotVersion, VersionBump};
