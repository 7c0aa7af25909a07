//! Pipeline orchestration for folder auditing.
//!
//! # Architecture
//!
//! - **Config**: input directory, concurrency, markers and policies
//! - **Orchestrator**: `FolderProcessor`, which takes one folder through every stage
//! - **Runner**: `BatchRunner`, which walks the input directory folder by folder
//!
//! # Pipeline Flow
//!
//! 1. **Discovery**: pending folders are listed and sorted by name
//! 2. **Hashing**: every file in a folder is hashed by the bounded worker pool
//! 3. **Aggregation**: records are sorted by filename and the verdict is computed
//! 4. **Publication**: the audit log is written to a temporary file and renamed into place
//! 5. **Finalization**: the folder is renamed with the done or failed marker
//!
//! # Example
//!
//! ```rust,ignore
//! use folder_audit::pipeline::{BatchRunner, PipelineConfig};
//!
//! let config = PipelineConfig::new()
//!     .with_input_dir("./input")
//!     .with_concurrency(8);
//!
//! let summary = BatchRunner::new(config).run().await?;
//! println!("done={} failed={}", summary.done, summary.failed);
//! ```

pub mod config;
pub mod orchestrator;
pub mod runner;

pub use config::{default_concurrency, ConfigError, PipelineConfig};
pub use orchestrator::{FolderOutcome, FolderProcessor};
pub use runner::{BatchRunner, BatchSummary, FolderFailure};
