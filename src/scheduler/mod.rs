//! Concurrency control for per-folder file processing.
//!
//! - **BoundedWorkerPool**: one task per file, capped by a semaphore
//! - **PoolStats**: per-run counters for logging and summaries
//!
//! # Example
//!
//! ```rust,ignore
//! use folder_audit::hasher::{FileHasher, FileTask};
//! use folder_audit::scheduler::BoundedWorkerPool;
//!
//! let pool = BoundedWorkerPool::new(8, FileHasher::new());
//! let run = pool.run(vec![FileTask::new("a.txt", "/data/pending_001/a.txt")]).await;
//! assert_eq!(run.records.len(), 1);
//! ```

pub mod worker_pool;

pub use worker_pool::{coerce_concurrency, BoundedWorkerPool, PoolRun, PoolStats};
