//! `ascend upload`

use super::Context;
use crate::error::{CliError, Result};
use crate::output;
use crate::DestinationArgs;
use ascend_common::SnapshotVersion;
use colored::Colorize;

pub async fn run(
    ctx: &Context,
    version: SnapshotVersion,
    args: &DestinationArgs,
    check_only: bool,
) -> Result<()> {
    if check_only {
        return check(ctx, version, args).await;
    }

    let destinations = ctx.destinations(args).await?;
    let report = ctx.orchestrator()?.upload(version, &destinations).await?;
    output::print_upload_report(&report);
    Ok(())
}

/// Verify the snapshot and show what an upload would do, touching no destination
async fn check(ctx: &Context, version: SnapshotVersion, args: &DestinationArgs) -> Result<()> {
    let names = ctx.destination_names(args)?;
    let manifest = ctx.snapshots().verify(version)?;
    println!(
        "{} {} verified ({} records)",
        "OK".green().bold(),
        manifest.version,
        manifest.total_records()
    );

    let orchestrator = ctx.orchestrator()?;
    let log = orchestrator.log();
    match log.latest_run(version).await? {
        Some(run) if run.state.needs_recovery() => {
            return Err(CliError::NeedsRecovery {
                version: version.to_string(),
                state: run.state.to_string(),
            });
        },
        Some(run) => println!("  Last run: {} ({})", run.state, run.run_id),
        None => println!("  Last run: none"),
    }

    println!("  Destinations: {}", names.join(" -> "));
    for name in &names {
        let state = match log.entry(version, name).await? {
            Some(entry) => entry.status.to_string(),
            None => "not uploaded".to_string(),
        };
        println!("    {name}: {state}");
    }
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    if log.is_delivered(version, &refs).await? {
        println!("  Already delivered; upload would do nothing");
    }
    Ok(())
}
