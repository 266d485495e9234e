//! `ascend validate`

use super::{batch_id, rejected, Context};
use crate::error::Result;
use ascend_pipeline::BatchOutcome;
use colored::Colorize;
use std::path::Path;

pub fn run(
    ctx: &Context,
    input: &Path,
    schema_version: &Option<String>,
    batch_id_flag: &Option<String>,
    save_report: bool,
) -> Result<()> {
    let pipeline = ctx.pipeline()?;
    let batch_id = batch_id(input, batch_id_flag);

    match pipeline.check_batch(input, &batch_id, ctx.schema_version(schema_version), save_report)? {
        BatchOutcome::Accepted(records) => {
            println!(
                "{} batch '{}' is valid: {} problems, {} contests, {} topics",
                "OK".green().bold(),
                batch_id,
                records.problems.len(),
                records.contests.len(),
                records.topics.len()
            );
            Ok(())
        },
        BatchOutcome::Rejected(rejection) => rejected(rejection),
    }
}
