//! Error types for folder-audit operations.
//!
//! Defines error types for the folder-level stages of the pipeline:
//! - Input directory and work folder scanning
//! - Durable audit log publication
//! - Terminal folder renames
//! - Per-folder processing as a whole
//!
//! Per-file hashing failures are not errors at this level: they are
//! recorded as `error` outcomes in the folder's audit log.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while scanning the input directory or a work folder.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Input directory '{0}' does not exist or is not accessible: {1}")]
    InputUnavailable(PathBuf, #[source] std::io::Error),

    #[error("Input path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while publishing a folder's audit log.
///
/// Every variant is raised before or at the atomic publish step, so the
/// final log artifact is never touched when one of these is returned.
#[derive(Debug, Error)]
pub enum LogWriteError {
    #[error("Failed to serialize audit log: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to create temporary log '{path}': {source}")]
    CreateTemp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write temporary log '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to publish '{from}' as '{to}': {source}")]
    Publish {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while renaming a folder to its terminal name.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("Folder path '{0}' has no usable name")]
    InvalidFolderName(PathBuf),

    #[error("Folder '{path}' is already {state} and cannot be finalized again")]
    AlreadyTerminal { path: PathBuf, state: String },

    #[error("Failed to rename '{from}' to '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Folder-level failures reported to the batch runner.
#[derive(Debug, Error)]
pub enum FolderError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Audit log could not be written (folder moved to '{finalized_as}'): {source}")]
    LogWrite {
        #[source]
        source: LogWriteError,
        finalized_as: PathBuf,
    },

    #[error("Audit log could not be written ({log}) and the folder could not be marked failed ({finalize})")]
    LogWriteAndFinalize {
        log: LogWriteError,
        finalize: FinalizeError,
    },

    #[error("Finalization error: {0}")]
    Finalize(#[from] FinalizeError),
}
