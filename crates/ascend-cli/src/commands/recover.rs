//! `ascend recover`

use super::Context;
use crate::error::Result;
use crate::DestinationArgs;
use ascend_common::SnapshotVersion;
use colored::Colorize;

pub async fn run(ctx: &Context, version: SnapshotVersion, args: &DestinationArgs) -> Result<()> {
    let destinations = ctx.destinations(args).await?;

    match ctx.orchestrator()?.recover(version, &destinations).await? {
        Some(report) => println!(
            "{} {} is rolled back ({})",
            "Recovered:".green().bold(),
            report.version,
            report.run_id
        ),
        None => println!("Nothing to recover for {version}."),
    }
    Ok(())
}
