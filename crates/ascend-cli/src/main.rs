//! Ascend CLI - Main entry point

use ascend_cli::{commands, Cli};
use ascend_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Verbose mode logs debug to the console; otherwise only warnings show
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let defaults = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("ascend")
        .build();

    // Environment variables take precedence
    let log_config = defaults.clone().merge_env().unwrap_or(defaults);

    // The CLI works without logging, so a failed init is not fatal
    let _guard = init_logging(&log_config).ok().flatten();

    if let Err(e) = commands::execute(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
