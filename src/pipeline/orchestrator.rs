//! Per-folder processing.
//!
//! `FolderProcessor` runs one work folder through every stage:
//! - File discovery
//! - Bounded concurrent hashing
//! - Ordering and verdict
//! - Durable log publication
//! - Terminal rename
//!
//! A folder is renamed only after its log is published. If publication
//! fails the folder is still moved to the failed name so it is never
//! picked up again as pending.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::{DurableLogWriter, FolderLog, Verdict};
use crate::error::{FinalizeError, FolderError};
use crate::folder::{FolderFinalizer, FolderState, WorkFolder};
use crate::hasher::FileHasher;
use crate::scanner::list_file_tasks;
use crate::scheduler::{BoundedWorkerPool, PoolStats};

use super::config::PipelineConfig;

/// Result of processing one work folder.
#[derive(Debug, Clone, Serialize)]
pub struct FolderOutcome {
    /// Path before processing.
    pub source: PathBuf,
    /// Path after the terminal rename.
    pub destination: PathBuf,
    /// Terminal state.
    pub state: FolderState,
    /// Verdict derived from the per-file records alone.
    pub verdict: Verdict,
    /// Number of records in the published log.
    pub records: usize,
    /// Pool counters.
    pub stats: PoolStats,
    /// Whether the log reached stable storage before publication.
    pub log_synced: bool,
    /// Wall-clock time spent on the folder.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Runs single work folders through hashing, logging and finalization.
pub struct FolderProcessor {
    pool: BoundedWorkerPool,
    writer: DurableLogWriter,
    finalizer: FolderFinalizer,
    strict_durability: bool,
}

impl FolderProcessor {
    /// Creates a processor from a validated configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        let hasher = FileHasher::new()
            .with_buffer_size(config.read_buffer_bytes)
            .with_timeout(config.file_timeout);

        Self {
            pool: BoundedWorkerPool::new(config.concurrency, hasher),
            writer: DurableLogWriter::new(config.log_file_name.clone()),
            finalizer: FolderFinalizer::new(config.markers.clone()),
            strict_durability: config.strict_durability,
        }
    }

    /// Processes the pending folder at `folder`.
    ///
    /// # Errors
    ///
    /// Returns `FolderError` if the folder is not pending, if it cannot be
    /// listed, if its log cannot be published (the folder is then moved to
    /// the failed name), or if the terminal rename fails.
    pub async fn process_folder(&self, folder: &Path) -> Result<FolderOutcome, FolderError> {
        let started = Instant::now();

        let work = WorkFolder::parse(folder, self.finalizer.markers())?;
        if work.state().is_terminal() {
            return Err(FinalizeError::AlreadyTerminal {
                path: folder.to_path_buf(),
                state: work.state().to_string(),
            }
            .into());
        }

        let tasks = list_file_tasks(folder).await?;
        info!(
            folder = %folder.display(),
            files = tasks.len(),
            concurrency = self.pool.concurrency(),
            "Processing folder"
        );

        let run = self.pool.run(tasks).await;
        let log = FolderLog::from_unordered(run.records);
        let verdict = log.verdict();
        debug!(
            folder = %folder.display(),
            succeeded = run.stats.succeeded,
            failed = run.stats.failed,
            %verdict,
            "Hashing complete"
        );

        let published = match self.writer.publish(folder, &log).await {
            Ok(published) => published,
            Err(log_err) => {
                error!(
                    folder = %folder.display(),
                    log = self.writer.file_name(),
                    error = %log_err,
                    "Failed to write audit log"
                );
                return match self.finalizer.finalize(folder, Verdict::Failed).await {
                    Ok(finalized) => Err(FolderError::LogWrite {
                        source: log_err,
                        finalized_as: finalized.to,
                    }),
                    Err(finalize) => Err(FolderError::LogWriteAndFinalize {
                        log: log_err,
                        finalize,
                    }),
                };
            }
        };

        let effective = effective_verdict(verdict, published.synced, self.strict_durability);
        if effective != verdict {
            warn!(
                folder = %folder.display(),
                "Audit log was not synced to disk, marking folder failed"
            );
        }

        let finalized = self.finalizer.finalize(folder, effective).await?;

        Ok(FolderOutcome {
            source: finalized.from,
            destination: finalized.to,
            state: finalized.state,
            verdict,
            records: log.len(),
            stats: run.stats,
            log_synced: published.synced,
            duration: started.elapsed(),
        })
    }
}

/// Verdict used for the terminal rename.
///
/// Under strict durability an unsynced log fails the folder; otherwise the
/// per-file verdict stands.
fn effective_verdict(verdict: Verdict, synced: bool, strict_durability: bool) -> Verdict {
    if strict_durability && !synced {
        Verdict::Failed
    } else {
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn processor(concurrency: i64) -> FolderProcessor {
        FolderProcessor::new(&PipelineConfig::new().with_concurrency(concurrency))
    }

    #[test]
    fn test_effective_verdict() {
        // Synced logs keep the per-file verdict under either policy.
        assert_eq!(effective_verdict(Verdict::Done, true, false), Verdict::Done);
        assert_eq!(effective_verdict(Verdict::Done, true, true), Verdict::Done);
        assert_eq!(effective_verdict(Verdict::Failed, true, true), Verdict::Failed);

        // Unsynced logs only matter when strict.
        assert_eq!(effective_verdict(Verdict::Done, false, false), Verdict::Done);
        assert_eq!(effective_verdict(Verdict::Done, false, true), Verdict::Failed);
        assert_eq!(effective_verdict(Verdict::Failed, false, false), Verdict::Failed);
        assert_eq!(effective_verdict(Verdict::Failed, false, true), Verdict::Failed);
    }

    #[tokio::test]
    async fn test_strict_durability_keeps_synced_folder_done() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let folder = temp_dir.path().join("pending_007");
        std::fs::create_dir(&folder).expect("mkdir");
        std::fs::write(folder.join("a.txt"), b"hello").expect("write");

        let strict = FolderProcessor::new(&PipelineConfig::new().with_strict_durability(true));
        let outcome = strict.process_folder(&folder).await.expect("process");

        assert!(outcome.log_synced);
        assert_eq!(outcome.state, FolderState::Done);
    }

    #[tokio::test]
    async fn test_process_all_readable() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let folder = temp_dir.path().join("pending_001");
        std::fs::create_dir(&folder).expect("mkdir");
        std::fs::write(folder.join("b.txt"), b"world").expect("write");
        std::fs::write(folder.join("a.txt"), b"hello").expect("write");

        let outcome = processor(2)
            .process_folder(&folder)
            .await
            .expect("process");

        assert_eq!(outcome.state, FolderState::Done);
        assert_eq!(outcome.verdict, Verdict::Done);
        assert_eq!(outcome.destination, temp_dir.path().join("done_001"));
        assert_eq!(outcome.records, 2);

        let log = FolderLog::load(outcome.destination.join("log.json"))
            .await
            .expect("load log");
        assert_eq!(log.records()[0].filename, "a.txt");
        assert_eq!(log.records()[1].filename, "b.txt");
    }

    #[tokio::test]
    async fn test_nested_directories_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let folder = temp_dir.path().join("pending_005");
        std::fs::create_dir_all(folder.join("inner")).expect("mkdir");
        std::fs::write(folder.join("inner").join("x"), b"x").expect("write");
        std::fs::write(folder.join("top.txt"), b"top").expect("write");

        let outcome = processor(4)
            .process_folder(&folder)
            .await
            .expect("process");

        assert_eq!(outcome.records, 1);
        assert!(outcome.destination.join("inner").join("x").exists());
    }

    #[tokio::test]
    async fn test_missing_folder_is_scan_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = processor(1)
            .process_folder(&temp_dir.path().join("pending_missing"))
            .await
            .expect_err("missing folder");
        assert!(matches!(err, FolderError::Scan(_)));
    }

    #[tokio::test]
    async fn test_terminal_folder_left_alone() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let folder = temp_dir.path().join("failed_002");
        std::fs::create_dir(&folder).expect("mkdir");

        let err = processor(1)
            .process_folder(&folder)
            .await
            .expect_err("terminal folder");
        assert!(matches!(
            err,
            FolderError::Finalize(FinalizeError::AlreadyTerminal { .. })
        ));
        assert!(!folder.join("log.json").exists());
    }

    #[tokio::test]
    async fn test_log_failure_forces_failed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let folder = temp_dir.path().join("pending_006");
        std::fs::create_dir(&folder).expect("mkdir");
        // A non-empty directory named like the log blocks publication.
        std::fs::create_dir(folder.join("log.json")).expect("mkdir");
        std::fs::write(folder.join("log.json").join("keep"), b"k").expect("write");
        std::fs::write(folder.join("data.bin"), b"data").expect("write");

        let err = processor(2)
            .process_folder(&folder)
            .await
            .expect_err("log write should fail");

        match err {
            FolderError::LogWrite { finalized_as, .. } => {
                assert_eq!(finalized_as, temp_dir.path().join("failed_006"));
                assert!(finalized_as.is_dir());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!folder.exists());
    }
}
