//! CLI command definitions for folder-audit.
//!
//! `run` processes every pending folder in an input directory; `inspect`
//! summarizes the audit log of an already finalized folder.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::audit::{FolderLog, Verdict, DEFAULT_LOG_FILE_NAME};
use crate::pipeline::{BatchRunner, BatchSummary, PipelineConfig};
use crate::scheduler::coerce_concurrency;

/// Batch checksum auditor for work folders.
#[derive(Parser)]
#[command(name = "folder-audit")]
#[command(about = "Hash every file in pending work folders, write an audit log, and mark each folder done or failed")]
#[command(version)]
#[command(
    long_about = "folder-audit scans an input directory for pending work folders (default prefix 'pending_'),\nhashes every file inside each folder with bounded concurrency, publishes a log.json audit log\natomically, and renames the folder to 'done_<id>' or 'failed_<id>'.\n\nExample usage:\n  folder-audit run --input ./input --concurrency 8"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Shorthand for --log-level debug.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Log filter implied by the flags.
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Process every pending folder in the input directory.
    Run(RunArgs),

    /// Summarize the audit log of a processed folder.
    Inspect(InspectArgs),
}

/// Arguments for `folder-audit run`.
///
/// Flags override the matching `FOLDER_AUDIT_*` environment variables.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory containing the work folders.
    #[arg(short = 'i', long)]
    pub input: Option<String>,

    /// Maximum files hashed at once per folder (values <= 0 become 1).
    #[arg(short = 'c', long, allow_negative_numbers = true)]
    pub concurrency: Option<i64>,

    /// Prefix of folders waiting to be processed.
    #[arg(long)]
    pub pending_marker: Option<String>,

    /// Prefix given to folders whose files all succeeded.
    #[arg(long)]
    pub done_marker: Option<String>,

    /// Prefix given to folders with failures.
    #[arg(long)]
    pub failed_marker: Option<String>,

    /// File name of the audit log written into each folder.
    #[arg(long)]
    pub log_file: Option<String>,

    /// Give up on a single file after this many seconds.
    #[arg(long)]
    pub file_timeout_secs: Option<u64>,

    /// Mark a folder failed if its audit log could not be synced to disk.
    #[arg(long)]
    pub strict_durability: bool,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `folder-audit inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Processed folder containing an audit log.
    pub folder: String,

    /// File name of the audit log.
    #[arg(long, default_value = DEFAULT_LOG_FILE_NAME)]
    pub log_file: String,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments without running any command.
///
/// Use this when you need access to CLI options before running commands,
/// e.g., to configure logging based on --log-level.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_batch_command(args).await,
        Commands::Inspect(args) => run_inspect_command(args).await,
    }
}

/// Builds the pipeline configuration: environment first, then flags.
pub fn build_config(args: &RunArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env().context("invalid FOLDER_AUDIT_* environment")?;

    if let Some(input) = &args.input {
        config.input_dir = PathBuf::from(input);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = coerce_concurrency(concurrency);
    }
    if let Some(marker) = &args.pending_marker {
        config.markers.pending = marker.clone();
    }
    if let Some(marker) = &args.done_marker {
        config.markers.done = marker.clone();
    }
    if let Some(marker) = &args.failed_marker {
        config.markers.failed = marker.clone();
    }
    if let Some(log_file) = &args.log_file {
        config.log_file_name = log_file.clone();
    }
    if let Some(secs) = args.file_timeout_secs {
        config.file_timeout = Some(Duration::from_secs(secs));
    }
    if args.strict_durability {
        config.strict_durability = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run_batch_command(args: RunArgs) -> anyhow::Result<()> {
    let runner = BatchRunner::new(build_config(&args)?);
    let config = runner.config();
    info!(
        input = %config.input_dir.display(),
        concurrency = config.concurrency,
        strict_durability = config.strict_durability,
        "Starting folder audit"
    );

    let summary = runner.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!("Pending folders: {}", summary.discovered);
    println!("Done:            {}", summary.done);
    println!("Failed:          {}", summary.failed);
    println!("Files hashed:    {}", summary.files_processed());
    for outcome in &summary.outcomes {
        println!(
            "  {} -> {} ({} files, {} errors)",
            outcome.source.display(),
            outcome.destination.display(),
            outcome.records,
            outcome.stats.failed
        );
    }
    if !summary.errors.is_empty() {
        println!("Errors:");
        for failure in &summary.errors {
            println!("  {}: {}", failure.folder.display(), failure.error);
        }
    }
}

/// Summary of a published audit log.
#[derive(Debug, Serialize)]
struct InspectSummary {
    log: PathBuf,
    records: usize,
    succeeded: usize,
    failed: usize,
    verdict: Verdict,
    errors: Vec<InspectError>,
}

#[derive(Debug, Serialize)]
struct InspectError {
    filename: String,
    error: String,
}

async fn run_inspect_command(args: InspectArgs) -> anyhow::Result<()> {
    let path = PathBuf::from(&args.folder).join(&args.log_file);
    let log = FolderLog::load(&path)
        .await
        .with_context(|| format!("failed to read audit log {}", path.display()))?;

    let summary = InspectSummary {
        log: path,
        records: log.len(),
        succeeded: log.success_count(),
        failed: log.error_count(),
        verdict: log.verdict(),
        errors: log
            .records()
            .iter()
            .filter_map(|r| {
                r.error_message().map(|e| InspectError {
                    filename: r.filename.clone(),
                    error: e.to_string(),
                })
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Log:       {}", summary.log.display());
        println!("Records:   {}", summary.records);
        println!("Succeeded: {}", summary.succeeded);
        println!("Failed:    {}", summary.failed);
        println!("Verdict:   {}", summary.verdict);
        for err in &summary.errors {
            println!("  {}: {}", err.filename, err.error);
        }
    }
    Ok(())
}
