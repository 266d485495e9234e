//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function taking the
//! shared [`Context`].

pub mod recover;
pub mod run;
pub mod snapshot;
pub mod status;
pub mod upload;
pub mod validate;

use crate::error::{CliError, Result};
use crate::output;
use crate::{BatchArgs, Cli, Commands, DestinationArgs, SnapshotCommand};
use ascend_common::SnapshotVersion;
use ascend_pipeline::config::{parse_destinations, validate_destinations};
use ascend_pipeline::destinations::build_destinations;
use ascend_pipeline::{
    default_batch_id, BatchOutcome, CreateOptions, Destination, Manifest, Pipeline,
    PipelineConfig, Rejection, SnapshotManager, SqliteUploadLog, UploadOrchestrator,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Configuration resolved from the environment plus global flags
pub struct Context {
    pub config: PipelineConfig,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = PipelineConfig::load();
        if let Some(ref dir) = cli.snapshot_dir {
            config.snapshot_dir = dir.clone();
        }
        if let Some(ref dir) = cli.rejected_dir {
            config.rejected_dir = dir.clone();
        }
        if let Some(ref path) = cli.upload_log {
            config.upload_log = path.clone();
        }
        config.validate()?;
        debug!(?config, "Resolved configuration");
        Ok(Self { config })
    }

    pub fn pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::from_config(&self.config)?)
    }

    pub fn snapshots(&self) -> Arc<SnapshotManager> {
        Arc::new(SnapshotManager::new(&self.config.snapshot_dir))
    }

    pub fn orchestrator(&self) -> Result<UploadOrchestrator> {
        let log = SqliteUploadLog::open(&self.config.upload_log)?;
        Ok(UploadOrchestrator::new(self.snapshots(), Arc::new(log)))
    }

    /// Destination order from the flag, falling back to the configuration
    pub fn destination_names(&self, args: &DestinationArgs) -> Result<Vec<String>> {
        let names = match args.destinations {
            Some(ref raw) => parse_destinations(raw),
            None => self.config.destinations.clone(),
        };
        validate_destinations(&names)?;
        Ok(names)
    }

    pub async fn destinations(&self, args: &DestinationArgs) -> Result<Vec<Arc<dyn Destination>>> {
        let names = self.destination_names(args)?;
        Ok(build_destinations(&self.config, &names).await?)
    }

    pub fn schema_version<'a>(&'a self, flag: &'a Option<String>) -> &'a str {
        flag.as_deref().unwrap_or(&self.config.schema_version)
    }
}

/// Turn a rejected outcome into the matching error after printing it
pub(crate) fn rejected<T>(rejection: Rejection) -> Result<T> {
    output::print_rejection(&rejection);
    Err(CliError::Rejected {
        batch_id: rejection.batch_id,
        stage: rejection.stage,
        count: rejection.violations.len(),
        report: rejection.report.map(|p| p.display().to_string()),
    })
}

/// Validate a batch and create its snapshot; shared by `snapshot create` and `run`
pub(crate) fn create_snapshot(ctx: &Context, batch: &BatchArgs) -> Result<Manifest> {
    let pipeline = ctx.pipeline()?;
    let version = resolve_version(pipeline.snapshots(), batch)?;
    let batch_id = batch_id(&batch.input, &batch.batch_id);

    let mut options = CreateOptions::new(ctx.schema_version(&batch.schema_version));
    if let Some(ref notes) = batch.notes {
        options = options.with_notes(notes.clone());
    }

    match pipeline.process_batch(&batch.input, version, &batch_id, &options)? {
        BatchOutcome::Accepted(manifest) => Ok(manifest),
        BatchOutcome::Rejected(rejection) => rejected(rejection),
    }
}

fn resolve_version(snapshots: &SnapshotManager, batch: &BatchArgs) -> Result<SnapshotVersion> {
    match (batch.version, batch.bump) {
        (Some(version), _) => Ok(version),
        (None, Some(bump)) => Ok(snapshots.next_version(bump.into())?),
        (None, None) => Err(CliError::config("Either --version or --bump is required")),
    }
}

pub(crate) fn batch_id(input: &Path, flag: &Option<String>) -> String {
    flag.clone().unwrap_or_else(|| default_batch_id(input))
}

/// Dispatch a parsed command
pub async fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::from_cli(cli)?;

    match &cli.command {
        Commands::Validate {
            input,
            schema_version,
            batch_id,
            save_report,
        } => validate::run(&ctx, input, schema_version, batch_id, *save_report),

        Commands::Snapshot { command } => match command {
            SnapshotCommand::Create { batch } => snapshot::create(&ctx, batch),
            SnapshotCommand::Verify { version } => snapshot::verify(&ctx, *version),
            SnapshotCommand::List { format } => snapshot::list(&ctx, *format),
        },

        Commands::Upload {
            version,
            destinations,
            check_only,
        } => upload::run(&ctx, *version, destinations, *check_only).await,

        Commands::Recover {
            version,
            destinations,
        } => recover::run(&ctx, *version, destinations).await,

        Commands::Status {
            version,
            destinations,
            format,
        } => status::run(&ctx, *version, destinations, *format).await,

        Commands::Run {
            batch,
            upload,
            destinations,
        } => run::run(&ctx, batch, *upload, destinations).await,
    }
}
