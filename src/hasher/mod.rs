//! Streaming content digests for individual files.
//!
//! [`FileHasher`] reads a file in fixed-size chunks through an incremental
//! MD5 context and turns every outcome, including open and read failures,
//! into a [`ResultRecord`]. It holds no mutable state and is safe to call
//! from many tasks at once.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::audit::ResultRecord;

/// Default read chunk size.
pub const DEFAULT_READ_BUFFER_BYTES: usize = 64 * 1024;

/// One file inside a work folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// File name relative to the work folder.
    pub name: String,
    /// Full path of the file.
    pub path: PathBuf,
}

impl FileTask {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Computes per-file digests.
#[derive(Debug, Clone)]
pub struct FileHasher {
    buffer_size: usize,
    timeout: Option<Duration>,
}

impl Default for FileHasher {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_READ_BUFFER_BYTES,
            timeout: None,
        }
    }
}

impl FileHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the read chunk size (at least one byte).
    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes.max(1);
        self
    }

    /// Bounds the time spent on a single file.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Hashes `task` and returns its result record.
    pub async fn hash(&self, task: &FileTask) -> ResultRecord {
        match self.timeout {
            Some(limit) => {
                let hashing = self.hash_file(&task.path, &task.name);
                match tokio::time::timeout(limit, hashing).await {
                    Ok(record) => record,
                    Err(_) => ResultRecord::error(
                        task.name.clone(),
                        format!("timed out after {:?}", limit),
                    ),
                }
            }
            None => self.hash_file(&task.path, &task.name).await,
        }
    }

    /// Streams the file at `path` through MD5.
    ///
    /// The file handle is owned by this call and closed on every return path.
    pub async fn hash_file(&self, path: &Path, filename: &str) -> ResultRecord {
        let mut file = match File::open(path).await {
            Ok(f) => f,
            Err(e) => {
                return ResultRecord::error(filename, format!("failed to open file: {}", e));
            }
        };

        let mut context = md5::Context::new();
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => context.consume(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return ResultRecord::error(filename, format!("failed to read file: {}", e));
                }
            }
        }

        let digest = context.compute();
        ResultRecord::success(filename, hex::encode(digest.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";
    const WORLD_MD5: &str = "7d793037a0760186574b0282f2f435e7";
    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    #[tokio::test]
    async fn test_known_digests() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let hello = temp_dir.path().join("a.txt");
        let world = temp_dir.path().join("b.txt");
        std::fs::write(&hello, b"hello").expect("write");
        std::fs::write(&world, b"world").expect("write");

        let hasher = FileHasher::new();
        let a = hasher.hash_file(&hello, "a.txt").await;
        let b = hasher.hash_file(&world, "b.txt").await;

        assert_eq!(a.filename, "a.txt");
        assert_eq!(a.md5(), Some(HELLO_MD5));
        assert_eq!(b.md5(), Some(WORLD_MD5));
    }

    #[tokio::test]
    async fn test_empty_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("empty");
        std::fs::write(&path, b"").expect("write");

        let record = FileHasher::new().hash_file(&path, "empty").await;
        assert_eq!(record.md5(), Some(EMPTY_MD5));
    }

    #[tokio::test]
    async fn test_chunk_size_does_not_change_digest() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("big.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).expect("write");

        let expected = format!("{:x}", md5::compute(&data));
        let small = FileHasher::new().with_buffer_size(7).hash_file(&path, "big.bin").await;
        let large = FileHasher::new().hash_file(&path, "big.bin").await;

        assert_eq!(small.md5(), Some(expected.as_str()));
        assert_eq!(large.md5(), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn test_missing_file_is_error_record() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let record = FileHasher::new()
            .hash_file(&temp_dir.path().join("nope"), "nope")
            .await;

        assert!(!record.is_success());
        let message = record.error_message().expect("error message");
        assert!(message.starts_with("failed to open file:"), "{}", message);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_read_failure_is_error_record() {
        // Opening a directory succeeds on Linux but reading it fails.
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let record = FileHasher::new().hash_file(temp_dir.path(), "dir").await;

        let message = record.error_message().expect("error message");
        assert!(message.starts_with("failed to read file:"), "{}", message);
    }

    #[tokio::test]
    async fn test_hash_task_with_timeout() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("a.txt");
        std::fs::write(&path, b"hello").expect("write");

        let hasher = FileHasher::new().with_timeout(Some(Duration::from_secs(30)));
        let record = hasher.hash(&FileTask::new("a.txt", &path)).await;
        assert_eq!(record.md5(), Some(HELLO_MD5));
    }

    #[test]
    fn test_buffer_size_floor() {
        let hasher = FileHasher::new().with_buffer_size(0);
        assert_eq!(hasher.buffer_size, 1);
    }
}
