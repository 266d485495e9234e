//! Terminal rendering shared by commands

use ascend_common::SnapshotVersion;
use ascend_pipeline::upload::{UploadEntry, UploadRun};
use ascend_pipeline::{EntryStatus, Manifest, Rejection, UploadReport};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);
    table
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

pub fn print_rejection(rejection: &Rejection) {
    eprintln!(
        "{} batch '{}' failed {} validation:",
        "Rejected:".red().bold(),
        rejection.batch_id,
        rejection.stage
    );
    for violation in &rejection.violations {
        eprintln!(
            "  {} {} {}",
            violation.path.yellow(),
            format!("[{}]", violation.rule).red(),
            violation.detail
        );
    }
}

pub fn print_manifest(manifest: &Manifest) {
    println!("{} {}", "Snapshot".cyan().bold(), manifest.version.to_string().green());
    println!("  Created:  {}", manifest.created_at.to_rfc3339());
    println!("  Schema:   {}", manifest.schema_version);
    if let Some(ref notes) = manifest.notes {
        println!("  Notes:    {}", notes);
    }

    let mut files = table();
    files.set_header(vec!["File", "Checksum", "Size"]);
    for file in &manifest.files {
        files.add_row(vec![
            file.file_path.clone(),
            file.checksum.clone(),
            format_bytes(file.byte_size),
        ]);
    }
    println!("{files}");

    let counts = manifest
        .record_counts
        .iter()
        .map(|(collection, n)| format!("{collection}={n}"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  Records:  {}", counts);
}

pub fn print_manifest_list(manifests: &[Manifest]) {
    if manifests.is_empty() {
        println!("No snapshots found.");
        println!("Run 'ascend snapshot create' to create one.");
        return;
    }

    let mut list = table();
    list.set_header(vec!["Version", "Created", "Schema", "Records", "Size"]);
    for manifest in manifests {
        list.add_row(vec![
            manifest.version.to_string(),
            manifest.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            manifest.schema_version.clone(),
            manifest.total_records().to_string(),
            format_bytes(manifest.total_bytes()),
        ]);
    }
    println!("{list}");
}

pub fn print_upload_report(report: &UploadReport) {
    if report.already_delivered {
        println!(
            "{} {} is already delivered (run {}).",
            "Up to date:".green().bold(),
            report.version,
            report.run_id
        );
        return;
    }

    println!(
        "{} {} ({})",
        "Delivered".green().bold(),
        report.version,
        report.run_id
    );
    for name in &report.delivered {
        println!("  {} {}", "+".green(), name);
    }
    for name in &report.skipped {
        println!("  {} {} (already present)", "=".dimmed(), name);
    }
}

fn colored_status(status: EntryStatus) -> String {
    match status {
        EntryStatus::Success => status.as_str().green().to_string(),
        EntryStatus::Failed => status.as_str().red().to_string(),
        EntryStatus::RolledBack => status.as_str().yellow().to_string(),
        EntryStatus::Pending => status.as_str().dimmed().to_string(),
    }
}

pub fn print_status(
    version: SnapshotVersion,
    latest: Option<&UploadRun>,
    entries: &[UploadEntry],
    delivered: bool,
) {
    let live = if delivered { "live".green() } else { "not live".yellow() };
    println!("{} {} ({})", "Version".cyan().bold(), version, live);

    let Some(run) = latest else {
        println!("No upload runs recorded.");
        return;
    };
    println!("  Last run: {} ({})", run.state, run.run_id);
    println!("  Started:  {}", run.started_at.to_rfc3339());
    if let Some(finished) = run.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }

    let mut table = table();
    table.set_header(vec!["Destination", "Status", "Updated", "Detail"]);
    for entry in entries {
        table.add_row(vec![
            entry.destination.clone(),
            colored_status(entry.status),
            entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.detail.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
}
