//! folder-audit: batch checksum auditing of work folders.
//!
//! Each pending work folder is hashed file by file with bounded
//! concurrency, its results are published as a durable JSON audit log,
//! and the folder is renamed to record whether every file succeeded.

pub mod audit;
pub mod cli;
pub mod error;
pub mod folder;
pub mod hasher;
pub mod pipeline;
pub mod scanner;
pub mod scheduler;

// Re-export commonly used error types
pub use error::{FinalizeError, FolderError, LogWriteError, ScanError};
