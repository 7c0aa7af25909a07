//! Terminal renames of work folders.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use super::{FolderMarkers, FolderState, WorkFolder};
use crate::audit::Verdict;
use crate::error::FinalizeError;

/// Result of a successful terminal rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedFolder {
    pub from: PathBuf,
    pub to: PathBuf,
    pub state: FolderState,
    /// True when the plain target name was taken and a suffix was added.
    pub disambiguated: bool,
}

/// Moves pending folders to their `done` or `failed` name.
#[derive(Debug, Clone, Default)]
pub struct FolderFinalizer {
    markers: FolderMarkers,
}

impl FolderFinalizer {
    pub fn new(markers: FolderMarkers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &FolderMarkers {
        &self.markers
    }

    /// Renames `folder` to reflect `verdict`.
    ///
    /// The folder must still be pending. If the target name exists, a UTC
    /// timestamp suffix (and, if needed, a counter) is appended. A failed
    /// rename leaves the folder where it was.
    pub async fn finalize(
        &self,
        folder: &Path,
        verdict: Verdict,
    ) -> Result<FinalizedFolder, FinalizeError> {
        let work = WorkFolder::parse(folder, &self.markers)?;
        let next = work
            .state()
            .transition(verdict)
            .ok_or_else(|| FinalizeError::AlreadyTerminal {
                path: folder.to_path_buf(),
                state: work.state().to_string(),
            })?;

        let parent = folder.parent().unwrap_or_else(|| Path::new("."));
        let base = format!("{}{}", self.markers.marker(next), work.id());

        // rename(2) silently replaces an empty directory at the target, so a
        // name that appears between the existence check and the rename is
        // only caught when it is non-empty. Targets are assumed not to be
        // created concurrently as empty directories.
        let mut attempts = 0;
        let (target, disambiguated) = loop {
            let (target, disambiguated) = unique_target(parent, &base).await;
            if disambiguated {
                warn!(
                    folder = %folder.display(),
                    target = %target.display(),
                    "Target folder name already taken, using suffixed name"
                );
            }

            match tokio::fs::rename(folder, &target).await {
                Ok(()) => break (target, disambiguated),
                Err(e) if is_collision(&e) && attempts < MAX_RENAME_ATTEMPTS => {
                    attempts += 1;
                    warn!(
                        target = %target.display(),
                        attempt = attempts,
                        "Target folder appeared before rename, retrying"
                    );
                }
                Err(source) => {
                    return Err(FinalizeError::Rename {
                        from: folder.to_path_buf(),
                        to: target,
                        source,
                    });
                }
            }
        };

        info!(
            from = %folder.display(),
            to = %target.display(),
            state = %next,
            "Finalized folder"
        );

        Ok(FinalizedFolder {
            from: work.path().to_path_buf(),
            to: target,
            state: next,
            disambiguated,
        })
    }
}

/// Retries after a target collision before giving up.
const MAX_RENAME_ATTEMPTS: u32 = 3;

/// True if a rename failed because its target already exists.
fn is_collision(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::AlreadyExists | std::io::ErrorKind::DirectoryNotEmpty
    )
}

async fn exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

/// Picks `<base>`, else `<base>_<timestamp>`, else `<base>_<timestamp>_<n>`.
async fn unique_target(parent: &Path, base: &str) -> (PathBuf, bool) {
    let plain = parent.join(base);
    if !exists(&plain).await {
        return (plain, false);
    }

    let stamped = format!("{}_{}", base, Utc::now().format("%Y%m%dT%H%M%SZ"));
    let candidate = parent.join(&stamped);
    if !exists(&candidate).await {
        return (candidate, true);
    }

    let mut n: u32 = 1;
    loop {
        let candidate = parent.join(format!("{}_{}", stamped, n));
        if !exists(&candidate).await {
            return (candidate, true);
        }
        n += 1;
    }
}
