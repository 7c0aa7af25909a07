//! Batch execution over every pending folder in the input directory.
//!
//! Folders are processed one at a time. A folder-level failure is logged
//! and counted, and the batch moves on to the next folder.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{error, info};

use crate::error::{FolderError, ScanError};
use crate::folder::FolderState;
use crate::scanner::scan_pending_folders;

use super::config::PipelineConfig;
use super::orchestrator::{FolderOutcome, FolderProcessor};

/// A folder that could not be fully processed.
#[derive(Debug, Clone, Serialize)]
pub struct FolderFailure {
    pub folder: PathBuf,
    pub error: String,
}

/// Summary of one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Pending folders found.
    pub discovered: usize,
    /// Folders renamed with the done marker.
    pub done: usize,
    /// Folders renamed with the failed marker (including log failures).
    pub failed: usize,
    /// Per-folder outcomes, in processing order.
    pub outcomes: Vec<FolderOutcome>,
    /// Folder-level errors.
    pub errors: Vec<FolderFailure>,
}

impl BatchSummary {
    fn record_outcome(&mut self, outcome: FolderOutcome) {
        match outcome.state {
            FolderState::Done => self.done += 1,
            FolderState::Failed => self.failed += 1,
            FolderState::Pending => {}
        }
        self.outcomes.push(outcome);
    }

    /// Total files hashed across all finalized folders.
    pub fn files_processed(&self) -> usize {
        self.outcomes.iter().map(|o| o.records).sum()
    }
}

/// Processes every pending folder under the configured input directory.
pub struct BatchRunner {
    config: PipelineConfig,
    processor: FolderProcessor,
}

impl BatchRunner {
    pub fn new(config: PipelineConfig) -> Self {
        let processor = FolderProcessor::new(&config);
        Self { config, processor }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the batch.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` only when the input directory cannot be listed;
    /// per-folder errors are collected in the summary.
    pub async fn run(&self) -> Result<BatchSummary, ScanError> {
        let folders = scan_pending_folders(&self.config.input_dir, &self.config.markers).await?;
        info!(
            input = %self.config.input_dir.display(),
            folders = folders.len(),
            concurrency = self.config.concurrency,
            "Found pending folders"
        );

        let mut summary = BatchSummary {
            discovered: folders.len(),
            ..Default::default()
        };

        for folder in folders {
            match self.processor.process_folder(&folder).await {
                Ok(outcome) => summary.record_outcome(outcome),
                Err(e) => {
                    error!(folder = %folder.display(), error = %e, "Folder processing failed");
                    if matches!(e, FolderError::LogWrite { .. }) {
                        summary.failed += 1;
                    }
                    summary.errors.push(FolderFailure {
                        folder,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            done = summary.done,
            failed = summary.failed,
            errors = summary.errors.len(),
            "Batch complete"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_mixed_batch() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let ok = temp_dir.path().join("pending_a");
        let empty = temp_dir.path().join("pending_b");
        std::fs::create_dir(&ok).expect("mkdir");
        std::fs::create_dir(&empty).expect("mkdir");
        std::fs::create_dir(temp_dir.path().join("done_old")).expect("mkdir");
        std::fs::write(ok.join("f"), b"1").expect("write");

        let runner = BatchRunner::new(
            PipelineConfig::new()
                .with_input_dir(temp_dir.path())
                .with_concurrency(2),
        );
        let summary = runner.run().await.expect("run");

        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.done, 2);
        assert_eq!(summary.failed, 0);
        assert!(summary.errors.is_empty());
        assert_eq!(summary.files_processed(), 1);
        assert!(temp_dir.path().join("done_a").is_dir());
        assert!(temp_dir.path().join("done_b").is_dir());
        assert!(temp_dir.path().join("done_old").is_dir());
    }

    #[tokio::test]
    async fn test_second_run_finds_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir(temp_dir.path().join("pending_1")).expect("mkdir");

        let runner = BatchRunner::new(PipelineConfig::new().with_input_dir(temp_dir.path()));
        let first = runner.run().await.expect("first run");
        assert_eq!(first.done, 1);

        let second = runner.run().await.expect("second run");
        assert_eq!(second.discovered, 0);
        assert!(second.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_missing_input_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let runner =
            BatchRunner::new(PipelineConfig::new().with_input_dir(temp_dir.path().join("nope")));
        assert!(runner.run().await.is_err());
    }
}
