//! Discovery of pending work folders and the files inside them.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::ScanError;
use crate::folder::FolderMarkers;
use crate::hasher::FileTask;

/// Lists the pending work folders directly under `input_dir`, sorted by name.
///
/// # Errors
///
/// Returns `ScanError` if `input_dir` is missing, is not a directory, or
/// cannot be listed.
pub async fn scan_pending_folders(
    input_dir: &Path,
    markers: &FolderMarkers,
) -> Result<Vec<PathBuf>, ScanError> {
    let meta = fs::metadata(input_dir)
        .await
        .map_err(|e| ScanError::InputUnavailable(input_dir.to_path_buf(), e))?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(input_dir.to_path_buf()));
    }

    let read_err = |source| ScanError::ReadDir {
        path: input_dir.to_path_buf(),
        source,
    };

    let mut folders = Vec::new();
    let mut entries = fs::read_dir(input_dir).await.map_err(read_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let file_type = entry.file_type().await.map_err(read_err)?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| markers.is_pending_name(n)) {
            folders.push(entry.path());
        }
    }

    folders.sort();
    Ok(folders)
}

/// Lists the files to hash in `folder`, sorted by name.
///
/// Nested directories are skipped and left untouched.
pub async fn list_file_tasks(folder: &Path) -> Result<Vec<FileTask>, ScanError> {
    let read_err = |source| ScanError::ReadDir {
        path: folder.to_path_buf(),
        source,
    };

    let mut tasks = Vec::new();
    let mut entries = fs::read_dir(folder).await.map_err(read_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let file_type = entry.file_type().await.map_err(read_err)?;
        if file_type.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        tasks.push(FileTask::new(name, entry.path()));
    }

    tasks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_filters_by_marker() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for name in ["pending_b", "pending_a", "done_c", "failed_d", "other"] {
            std::fs::create_dir(temp_dir.path().join(name)).expect("mkdir");
        }
        std::fs::write(temp_dir.path().join("pending_file"), b"x").expect("write");

        let folders = scan_pending_folders(temp_dir.path(), &FolderMarkers::default())
            .await
            .expect("scan");

        assert_eq!(
            folders,
            vec![
                temp_dir.path().join("pending_a"),
                temp_dir.path().join("pending_b"),
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_missing_input() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = scan_pending_folders(&temp_dir.path().join("nope"), &FolderMarkers::default())
            .await
            .expect_err("missing input");
        assert!(matches!(err, ScanError::InputUnavailable(..)));
    }

    #[tokio::test]
    async fn test_scan_input_is_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = temp_dir.path().join("input");
        std::fs::write(&file, b"x").expect("write");

        let err = scan_pending_folders(&file, &FolderMarkers::default())
            .await
            .expect_err("not a dir");
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("b.txt"), b"b").expect("write");
        std::fs::write(temp_dir.path().join("a.txt"), b"a").expect("write");
        std::fs::create_dir(temp_dir.path().join("nested")).expect("mkdir");
        std::fs::write(temp_dir.path().join("nested").join("c.txt"), b"c").expect("write");

        let tasks = list_file_tasks(temp_dir.path()).await.expect("list");
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(tasks[0].path, temp_dir.path().join("a.txt"));
    }
}
