//! Crash-safe publication of folder audit logs.
//!
//! The log is written to a uniquely named temporary file in the target
//! folder, flushed, synced on a best-effort basis and then renamed over
//! the final name. The rename is the only point at which the new log
//! becomes visible; a failure at any earlier step removes the temporary
//! file and leaves the final artifact alone.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::FolderLog;
use crate::error::LogWriteError;

/// Name of the published audit log inside each work folder.
pub const DEFAULT_LOG_FILE_NAME: &str = "log.json";

/// Details of a successfully published log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedLog {
    /// Final path of the log.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: usize,
    /// Whether the data was confirmed on stable storage before publishing.
    pub synced: bool,
}

/// Writes [`FolderLog`]s with a write-to-temporary-then-rename protocol.
#[derive(Debug, Clone)]
pub struct DurableLogWriter {
    file_name: String,
}

impl Default for DurableLogWriter {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILE_NAME)
    }
}

impl DurableLogWriter {
    /// Creates a writer that publishes logs under `file_name`.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Returns the name of the published log.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the final log path for `folder`.
    pub fn log_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.file_name)
    }

    fn temp_path(&self, folder: &Path) -> PathBuf {
        folder.join(format!(".{}.tmp.{}", self.file_name, Uuid::new_v4()))
    }

    /// Serializes `log` and atomically publishes it inside `folder`.
    ///
    /// # Errors
    ///
    /// Returns `LogWriteError` if serialization, any step on the temporary
    /// file, or the final rename fails. The temporary file is removed in
    /// every failure case.
    pub async fn publish(
        &self,
        folder: &Path,
        log: &FolderLog,
    ) -> Result<PublishedLog, LogWriteError> {
        let data = log.to_json_pretty()?;
        let tmp_path = self.temp_path(folder);
        let final_path = self.log_path(folder);

        let synced = match write_temp(&tmp_path, &data).await {
            Ok(synced) => synced,
            Err(e) => {
                discard(&tmp_path).await;
                return Err(e);
            }
        };

        if let Err(source) = fs::rename(&tmp_path, &final_path).await {
            discard(&tmp_path).await;
            return Err(LogWriteError::Publish {
                from: tmp_path,
                to: final_path,
                source,
            });
        }

        debug!(
            path = %final_path.display(),
            records = log.len(),
            bytes = data.len(),
            synced,
            "Published audit log"
        );

        Ok(PublishedLog {
            path: final_path,
            bytes: data.len(),
            synced,
        })
    }
}

/// Writes `data` to a freshly created file and syncs it.
///
/// Returns whether `sync_all` succeeded; a sync failure is only a warning.
/// The handle is dropped without a separate close check, so `sync_all` is
/// the durability signal.
async fn write_temp(path: &Path, data: &[u8]) -> Result<bool, LogWriteError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|source| LogWriteError::CreateTemp {
            path: path.to_path_buf(),
            source,
        })?;

    write_contents(&mut file, path, data).await?;

    let synced = match file.sync_all().await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "fsync of temporary log failed, publishing anyway");
            false
        }
    };

    Ok(synced)
}

/// Writes and flushes `data`.
///
/// tokio completes file writes in the background, so a failed write may
/// only surface from `flush`; both are reported as `LogWriteError::Write`.
async fn write_contents<W>(writer: &mut W, path: &Path, data: &[u8]) -> Result<(), LogWriteError>
where
    W: AsyncWrite + Unpin,
{
    let write_err = |source| LogWriteError::Write {
        path: path.to_path_buf(),
        source,
    };

    writer.write_all(data).await.map_err(write_err)?;
    writer.flush().await.map_err(write_err)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary log");
        }
    }
}
