//! `ascend snapshot create|verify|list`

use super::{create_snapshot, Context};
use crate::error::Result;
use crate::output;
use crate::{BatchArgs, OutputFormat};
use ascend_common::SnapshotVersion;
use colored::Colorize;
use tracing::info;

pub fn create(ctx: &Context, batch: &BatchArgs) -> Result<()> {
    let manifest = create_snapshot(ctx, batch)?;
    info!(version = %manifest.version, "Snapshot created");
    println!("{} snapshot {}", "Created".green().bold(), manifest.version);
    output::print_manifest(&manifest);
    Ok(())
}

pub fn verify(ctx: &Context, version: SnapshotVersion) -> Result<()> {
    let manifest = ctx.snapshots().verify(version)?;
    println!("{} every checksum matches", "Verified:".green().bold());
    output::print_manifest(&manifest);
    Ok(())
}

pub fn list(ctx: &Context, format: OutputFormat) -> Result<()> {
    let manifests = ctx.snapshots().list()?;
    match format {
        OutputFormat::Table => output::print_manifest_list(&manifests),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&manifests)?),
    }
    Ok(())
}
