//! Ascend CLI Library
//!
//! Command-line interface for the Ascend data pipeline.
//!
//! # Overview
//!
//! - **Validation**: check a normalized batch without snapshotting it (`ascend validate`)
//! - **Snapshots**: create, verify and list immutable versions (`ascend snapshot`)
//! - **Delivery**: push a version to its destinations (`ascend upload`)
//! - **Recovery**: finish an interrupted rollback (`ascend recover`)
//! - **Status**: show the Upload Log for a version (`ascend status`)
//! - **Full run**: validate, snapshot and optionally upload in one go (`ascend run`)
//!
//! Paths and destinations come from the environment (see `PipelineConfig`);
//! flags override them per invocation.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod commands;
pub mod error;
pub mod output;

pub use error::{CliError, Result};

use ascend_common::{SnapshotVersion, VersionBump};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Ascend - competitive programming data pipeline
#[derive(Parser, Debug)]
#[command(name = "ascend")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Snapshot root directory [default: $ASCEND_SNAPSHOT_DIR]
    #[arg(long, global = true)]
    pub snapshot_dir: Option<PathBuf>,

    /// Rejection report directory [default: $ASCEND_REJECTED_DIR]
    #[arg(long, global = true)]
    pub rejected_dir: Option<PathBuf>,

    /// Upload Log database file [default: $ASCEND_UPLOAD_LOG]
    #[arg(long, global = true)]
    pub upload_log: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a batch directory without creating a snapshot
    Validate {
        /// Batch directory containing problems.json, topics.json and optionally contests.json
        #[arg(short, long)]
        input: PathBuf,

        /// Schema version to validate against
        #[arg(long)]
        schema_version: Option<String>,

        /// Batch identifier used for the rejection report
        #[arg(long)]
        batch_id: Option<String>,

        /// Write a rejection report when the batch fails
        #[arg(long)]
        save_report: bool,
    },

    /// Manage snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommand,
    },

    /// Deliver a snapshot to every configured destination
    Upload {
        /// Snapshot version (e.g. v1.0.0)
        version: SnapshotVersion,

        #[command(flatten)]
        destinations: DestinationArgs,

        /// Verify the snapshot and report delivery state without uploading
        #[arg(long)]
        check_only: bool,
    },

    /// Compensate destinations left behind by an interrupted or failed rollback
    Recover {
        /// Snapshot version (e.g. v1.0.0)
        version: SnapshotVersion,

        #[command(flatten)]
        destinations: DestinationArgs,
    },

    /// Show Upload Log entries and delivery state for a version
    Status {
        /// Snapshot version (e.g. v1.0.0)
        version: SnapshotVersion,

        #[command(flatten)]
        destinations: DestinationArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Validate, snapshot and optionally upload a batch
    Run {
        #[command(flatten)]
        batch: BatchArgs,

        /// Upload the new snapshot after creating it
        #[arg(long)]
        upload: bool,

        #[command(flatten)]
        destinations: DestinationArgs,
    },
}

/// Snapshot subcommands
#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
    /// Validate a batch and freeze it as a new version
    Create {
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Recompute checksums of a snapshot
    Verify {
        /// Snapshot version (e.g. v1.0.0)
        version: SnapshotVersion,
    },

    /// List published snapshots
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Input batch and target version
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Batch directory containing problems.json, topics.json and optionally contests.json
    #[arg(short, long)]
    pub input: PathBuf,

    /// Explicit snapshot version
    #[arg(long, conflicts_with = "bump", required_unless_present = "bump")]
    pub version: Option<SnapshotVersion>,

    /// Derive the version from the highest existing one
    #[arg(long, value_enum)]
    pub bump: Option<Bump>,

    /// Schema version to validate against
    #[arg(long)]
    pub schema_version: Option<String>,

    /// Batch identifier (defaults to `{dir name}_{timestamp}`)
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Free-form notes stored in the manifest
    #[arg(long)]
    pub notes: Option<String>,
}

/// Destination override
#[derive(Args, Debug, Clone, Default)]
pub struct DestinationArgs {
    /// Comma-separated destination order (objects, metadata, cache, mirror)
    #[arg(short, long)]
    pub destinations: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl From<Bump> for VersionBump {
    fn from(bump: Bump) -> Self {
        match bump {
            Bump::Major => VersionBump::Major,
            Bump::Minor => VersionBump::Minor,
            Bump::Patch => VersionBump::Patch,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
