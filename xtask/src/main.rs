//! Build automation tasks for Ascend
//!
//! Currently generates the CLI reference from the clap definitions.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for Ascend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<ascend_cli::Cli>();

    let content = format!(
        r#"# Ascend CLI Reference

Generated from the CLI source code on {}.

Ascend validates normalized competitive-programming batches, freezes them
into versioned snapshots and delivers those snapshots to object storage,
the metadata database and the cache index.

## Quick Start

```bash
# Check a batch without creating anything
ascend validate -i data/normalized/2024-06-01

# Validate, snapshot and deliver in one go
ascend run -i data/normalized/2024-06-01 --bump minor --upload

# Inspect delivery state
ascend status v0.1.0
```

## Environment Variables

- `ASCEND_SNAPSHOT_DIR` - Snapshot root (default: `data/snapshots`)
- `ASCEND_REJECTED_DIR` - Rejection reports (default: `data/rejected`)
- `ASCEND_UPLOAD_LOG` - Upload Log database (default: `data/upload-log.db`)
- `ASCEND_DESTINATIONS` - Delivery order (default: `objects,metadata,cache`)
- `ASCEND_SCHEMA_VERSION` - Schema version to validate against
- `ASCEND_CACHE_DB`, `ASCEND_MIRROR_DIR` - Local destinations
- `S3_ENDPOINT`, `S3_REGION`, `S3_BUCKET`, `S3_PREFIX`, `S3_ACCESS_KEY`, `S3_SECRET_KEY`, `S3_PATH_STYLE` - Object storage
- `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` - Metadata database
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_DIR` - Logging

## Commands

{}

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());
    Ok(())
}
