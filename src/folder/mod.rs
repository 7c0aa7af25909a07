//! Work folder lifecycle.
//!
//! A work folder's state lives entirely in its name prefix. This module
//! turns that prefix into an explicit [`FolderState`] with a single legal
//! transition, `Pending -> Done | Failed`, and renames folders through
//! [`FolderFinalizer`].

mod finalizer;

pub use finalizer::{FinalizedFolder, FolderFinalizer};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audit::Verdict;
use crate::error::FinalizeError;

/// Default prefix of folders waiting to be processed.
pub const DEFAULT_PENDING_MARKER: &str = "pending_";
/// Default prefix of folders whose files all hashed successfully.
pub const DEFAULT_DONE_MARKER: &str = "done_";
/// Default prefix of folders with at least one failure.
pub const DEFAULT_FAILED_MARKER: &str = "failed_";

/// Lifecycle state encoded by a folder's name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderState {
    Pending,
    Done,
    Failed,
}

impl FolderState {
    /// Returns true for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FolderState::Pending)
    }

    /// Applies a verdict. Only `Pending` folders may transition.
    pub fn transition(self, verdict: Verdict) -> Option<FolderState> {
        match self {
            FolderState::Pending => Some(match verdict {
                Verdict::Done => FolderState::Done,
                Verdict::Failed => FolderState::Failed,
            }),
            FolderState::Done | FolderState::Failed => None,
        }
    }
}

impl std::fmt::Display for FolderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FolderState::Pending => write!(f, "pending"),
            FolderState::Done => write!(f, "done"),
            FolderState::Failed => write!(f, "failed"),
        }
    }
}

/// Name prefixes for each folder state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMarkers {
    pub pending: String,
    pub done: String,
    pub failed: String,
}

impl Default for FolderMarkers {
    fn default() -> Self {
        Self {
            pending: DEFAULT_PENDING_MARKER.to_string(),
            done: DEFAULT_DONE_MARKER.to_string(),
            failed: DEFAULT_FAILED_MARKER.to_string(),
        }
    }
}

impl FolderMarkers {
    pub fn new(
        pending: impl Into<String>,
        done: impl Into<String>,
        failed: impl Into<String>,
    ) -> Self {
        Self {
            pending: pending.into(),
            done: done.into(),
            failed: failed.into(),
        }
    }

    /// Returns the prefix for `state`.
    pub fn marker(&self, state: FolderState) -> &str {
        match state {
            FolderState::Pending => &self.pending,
            FolderState::Done => &self.done,
            FolderState::Failed => &self.failed,
        }
    }

    /// Splits a folder name into its state and stable identifier.
    ///
    /// Names without a known marker are treated as pending, with the id
    /// taken after the first `_` (or the whole name when there is none).
    pub fn classify(&self, name: &str) -> (FolderState, String) {
        // Longest marker first, so "done_" never shadows e.g. "done_x_".
        let mut candidates = [
            (FolderState::Pending, self.pending.as_str()),
            (FolderState::Done, self.done.as_str()),
            (FolderState::Failed, self.failed.as_str()),
        ];
        candidates.sort_by_key(|(_, marker)| std::cmp::Reverse(marker.len()));

        for (state, marker) in candidates {
            if marker.is_empty() {
                continue;
            }
            if let Some(id) = name.strip_prefix(marker) {
                return (state, id.to_string());
            }
        }

        let id = match name.split_once('_') {
            Some((_, rest)) => rest,
            None => name,
        };
        (FolderState::Pending, id.to_string())
    }

    /// Returns true if `name` carries the pending marker.
    pub fn is_pending_name(&self, name: &str) -> bool {
        !self.pending.is_empty() && name.starts_with(&self.pending)
    }
}

/// A work folder: its location, current state and stable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkFolder {
    path: PathBuf,
    state: FolderState,
    id: String,
}

impl WorkFolder {
    /// Interprets the folder at `path` using `markers`.
    pub fn parse(path: impl Into<PathBuf>, markers: &FolderMarkers) -> Result<Self, FinalizeError> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FinalizeError::InvalidFolderName(path.clone()))?
            .to_string();
        let (state, id) = markers.classify(&name);
        Ok(Self { path, state, id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> FolderState {
        self.state
    }

    /// Identifier with the state marker removed.
    pub fn id(&self) -> &str {
        &self.id
    }
}
