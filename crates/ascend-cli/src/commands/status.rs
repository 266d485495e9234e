//! `ascend status`

use super::Context;
use crate::error::Result;
use crate::output;
use crate::{DestinationArgs, OutputFormat};
use ascend_common::SnapshotVersion;
use serde_json::json;

/// Delivery is answered for the destination list in effect, so a version
/// live on `mirror` is not reported delivered for `objects,mirror`
pub async fn run(
    ctx: &Context,
    version: SnapshotVersion,
    args: &DestinationArgs,
    format: OutputFormat,
) -> Result<()> {
    let names = ctx.destination_names(args)?;
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let orchestrator = ctx.orchestrator()?;
    let log = orchestrator.log();

    let latest = log.latest_run(version).await?;
    let entries = log.entries(version).await?;
    let delivered = log.is_delivered(version, &names).await?;

    match format {
        OutputFormat::Json => {
            let status = json!({
                "version": version.to_string(),
                "delivered": delivered,
                "destinations": names,
                "latest_run": latest,
                "entries": entries,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        },
        OutputFormat::Table => output::print_status(version, latest.as_ref(), &entries, delivered),
    }
    Ok(())
}
