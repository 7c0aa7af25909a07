//! Bounded fan-out of file hashing within one work folder.
//!
//! Every file gets its own task. A task must hold a semaphore permit while
//! it runs, so at most `concurrency` files are open at once. Results flow
//! back over an mpsc channel that is drained only after every task in the
//! `JoinSet` has been joined.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::audit::ResultRecord;
use crate::hasher::{FileHasher, FileTask};

/// Maps a caller-supplied concurrency value to a usable slot count.
///
/// Zero or negative values become 1; a pool with no slots would never
/// make progress.
pub fn coerce_concurrency(requested: i64) -> usize {
    if requested <= 0 {
        1
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}

/// Counters for one pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Number of files dispatched.
    pub dispatched: usize,
    /// Records with a digest.
    pub succeeded: usize,
    /// Records with an error.
    pub failed: usize,
    /// Tasks that ended without reporting (panicked); counted in `failed`.
    pub aborted: usize,
}

/// Records produced by one pool run, in completion order.
#[derive(Debug)]
pub struct PoolRun {
    pub records: Vec<ResultRecord>,
    pub stats: PoolStats,
}

/// Runs [`FileHasher`] over a folder's files with a hard cap on in-flight work.
pub struct BoundedWorkerPool {
    hasher: Arc<FileHasher>,
    slots: Arc<Semaphore>,
    concurrency: usize,
}

impl BoundedWorkerPool {
    /// Creates a pool with `concurrency` slots (at least one).
    pub fn new(concurrency: usize, hasher: FileHasher) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            hasher: Arc::new(hasher),
            slots: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Number of slots.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Hashes every task and returns exactly one record per task.
    ///
    /// Per-file failures become `error` records; they never abort the run.
    pub async fn run(&self, tasks: Vec<FileTask>) -> PoolRun {
        let dispatched = tasks.len();
        let (tx, mut rx) = mpsc::channel::<ResultRecord>(dispatched.max(1));
        let mut pending: HashMap<String, usize> = HashMap::with_capacity(dispatched);
        let mut workers = JoinSet::new();

        for task in tasks {
            *pending.entry(task.name.clone()).or_insert(0) += 1;

            let permit = match Arc::clone(&self.slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    // Only reachable if the semaphore was closed.
                    let _ = tx
                        .send(ResultRecord::error(
                            task.name.clone(),
                            format!("worker pool unavailable: {}", e),
                        ))
                        .await;
                    continue;
                }
            };

            let hasher = Arc::clone(&self.hasher);
            let tx = tx.clone();
            workers.spawn(async move {
                let _permit = permit;
                let record = hasher.hash(&task).await;
                debug!(
                    file = %record.filename,
                    success = record.is_success(),
                    "Processed file"
                );
                // Capacity equals the task count, so this never waits.
                let _ = tx.send(record).await;
            });
        }

        let mut join_failures = Vec::new();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "File hashing task did not complete");
                join_failures.push(e.to_string());
            }
        }
        drop(tx);

        let mut records = Vec::with_capacity(dispatched);
        while let Some(record) = rx.recv().await {
            if let Some(count) = pending.get_mut(&record.filename) {
                *count = count.saturating_sub(1);
            }
            records.push(record);
        }

        let mut aborted = 0;
        let cause = join_failures
            .first()
            .cloned()
            .unwrap_or_else(|| "no result reported".to_string());
        let mut missing: Vec<(String, usize)> =
            pending.into_iter().filter(|(_, n)| *n > 0).collect();
        missing.sort();
        for (name, count) in missing {
            for _ in 0..count {
                records.push(ResultRecord::error(
                    name.clone(),
                    format!("hashing task aborted: {}", cause),
                ));
                aborted += 1;
            }
        }

        let succeeded = records.iter().filter(|r| r.is_success()).count();
        let stats = PoolStats {
            dispatched,
            succeeded,
            failed: records.len() - succeeded,
            aborted,
        };

        PoolRun { records, stats }
    }
}
