//! `ascend run`: validate, snapshot and optionally upload

use super::{create_snapshot, Context};
use crate::error::Result;
use crate::output;
use crate::{BatchArgs, DestinationArgs};
use colored::Colorize;

pub async fn run(
    ctx: &Context,
    batch: &BatchArgs,
    upload: bool,
    args: &DestinationArgs,
) -> Result<()> {
    // Resolve destinations before snapshotting so a bad list fails early
    let destinations = if upload {
        Some(ctx.destinations(args).await?)
    } else {
        None
    };

    let manifest = create_snapshot(ctx, batch)?;
    println!(
        "{} snapshot {} ({} records)",
        "Created".green().bold(),
        manifest.version,
        manifest.total_records()
    );

    if let Some(destinations) = destinations {
        let report = ctx
            .orchestrator()?
            .upload(manifest.version, &destinations)
            .await?;
        output::print_upload_report(&report);
    }
    Ok(())
}
