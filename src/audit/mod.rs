//! Per-file result records and the folder audit log.
//!
//! A [`FolderLog`] is the single artifact of record for a processed work
//! folder: one [`ResultRecord`] per file, sorted by filename so that the
//! log is reproducible regardless of the order in which workers finished.
//! The log is persisted through [`DurableLogWriter`].

mod writer;

pub use writer::{DurableLogWriter, PublishedLog, DEFAULT_LOG_FILE_NAME};

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Outcome of hashing a single file.
///
/// Serialized inline into the owning record as a `status` tag plus
/// either an `md5` or an `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    /// The file was read completely.
    Success {
        /// Lowercase hex MD5 digest of the file content.
        md5: String,
    },
    /// The file could not be opened or read.
    Error {
        /// Human-readable description of the failure.
        error: String,
    },
}

impl FileOutcome {
    /// Returns true for [`FileOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Success { .. })
    }
}

/// The outcome of processing one file, stamped with its completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// File name relative to its work folder.
    pub filename: String,
    /// Digest or error.
    #[serde(flatten)]
    pub outcome: FileOutcome,
    /// When the outcome was determined (UTC).
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: DateTime<Utc>,
}

impl ResultRecord {
    /// Creates a success record stamped with the current time.
    pub fn success(filename: impl Into<String>, md5: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            outcome: FileOutcome::Success { md5: md5.into() },
            timestamp: Utc::now(),
        }
    }

    /// Creates an error record stamped with the current time.
    pub fn error(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            outcome: FileOutcome::Error {
                error: error.into(),
            },
            timestamp: Utc::now(),
        }
    }

    /// Returns true if the file was hashed successfully.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Returns the digest for successful records.
    pub fn md5(&self) -> Option<&str> {
        match &self.outcome {
            FileOutcome::Success { md5 } => Some(md5),
            FileOutcome::Error { .. } => None,
        }
    }

    /// Returns the error description for failed records.
    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            FileOutcome::Success { .. } => None,
            FileOutcome::Error { error } => Some(error),
        }
    }
}

fn serialize_rfc3339<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Aggregate verdict for a work folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every file was hashed successfully (vacuously true for empty folders).
    Done,
    /// At least one file failed, or the folder's log could not be published.
    Failed,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Done => write!(f, "done"),
            Verdict::Failed => write!(f, "failed"),
        }
    }
}

/// The ordered set of result records for one work folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderLog {
    records: Vec<ResultRecord>,
}

impl FolderLog {
    /// Builds the canonical log from records in arbitrary completion order.
    ///
    /// Records are sorted by filename, comparing raw bytes.
    pub fn from_unordered(mut records: Vec<ResultRecord>) -> Self {
        records.sort_by(|a, b| a.filename.as_bytes().cmp(b.filename.as_bytes()));
        Self { records }
    }

    /// Reads a published log back from disk.
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Returns the records in canonical order.
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Number of records in the log.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the folder had no files.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of successful records.
    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed records.
    pub fn error_count(&self) -> usize {
        self.records.len() - self.success_count()
    }

    /// Computes the aggregate verdict: `Done` iff every record succeeded.
    pub fn verdict(&self) -> Verdict {
        if self.records.iter().all(ResultRecord::is_success) {
            Verdict::Done
        } else {
            Verdict::Failed
        }
    }

    /// Serializes the log as indented JSON.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(filename: &str, outcome: FileOutcome) -> ResultRecord {
        ResultRecord {
            filename: filename.to_string(),
            outcome,
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:30:45Z")
                .expect("valid timestamp")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_from_unordered_sorts_by_filename() {
        let log = FolderLog::from_unordered(vec![
            ResultRecord::success("c.txt", "03"),
            ResultRecord::success("a.txt", "01"),
            ResultRecord::error("b.txt", "failed to open file: missing"),
        ]);

        let names: Vec<_> = log.records().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_sort_is_bytewise() {
        let log = FolderLog::from_unordered(vec![
            ResultRecord::success("b", "x"),
            ResultRecord::success("B", "x"),
            ResultRecord::success("a", "x"),
            ResultRecord::success("Z", "x"),
        ]);

        let names: Vec<_> = log.records().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["B", "Z", "a", "b"]);
    }

    #[test]
    fn test_verdict() {
        let empty = FolderLog::from_unordered(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.verdict(), Verdict::Done);

        let all_ok = FolderLog::from_unordered(vec![
            ResultRecord::success("a", "1"),
            ResultRecord::success("b", "2"),
        ]);
        assert_eq!(all_ok.verdict(), Verdict::Done);
        assert_eq!(all_ok.success_count(), 2);
        assert_eq!(all_ok.error_count(), 0);

        let one_bad = FolderLog::from_unordered(vec![
            ResultRecord::success("a", "1"),
            ResultRecord::error("b", "boom"),
        ]);
        assert_eq!(one_bad.verdict(), Verdict::Failed);
        assert_eq!(one_bad.error_count(), 1);
    }

    #[test]
    fn test_record_json_field_order() {
        let ok = at(
            "a.txt",
            FileOutcome::Success {
                md5: "5d41402abc4b2a76b9719d911017c592".to_string(),
            },
        );
        let json = serde_json::to_string(&ok).expect("serialize");
        assert_eq!(
            json,
            r#"{"filename":"a.txt","status":"success","md5":"5d41402abc4b2a76b9719d911017c592","timestamp":"2024-05-01T12:30:45Z"}"#
        );

        let bad = at(
            "b.txt",
            FileOutcome::Error {
                error: "failed to open file: denied".to_string(),
            },
        );
        let json = serde_json::to_string(&bad).expect("serialize");
        assert_eq!(
            json,
            r#"{"filename":"b.txt","status":"error","error":"failed to open file: denied","timestamp":"2024-05-01T12:30:45Z"}"#
        );
    }

    #[test]
    fn test_log_json_parses_back() {
        let log = FolderLog::from_unordered(vec![
            at(
                "x",
                FileOutcome::Error {
                    error: "nope".to_string(),
                },
            ),
            at("w", FileOutcome::Success { md5: "ab".to_string() }),
        ]);
        let bytes = log.to_json_pretty().expect("serialize");
        let parsed: FolderLog = serde_json::from_slice(&bytes).expect("parse");
        assert_eq!(parsed, log);
        assert_eq!(parsed.records()[0].md5(), Some("ab"));
        assert_eq!(parsed.records()[1].error_message(), Some("nope"));
    }

    #[test]
    fn test_empty_log_is_json_array() {
        let log = FolderLog::from_unordered(Vec::new());
        assert_eq!(log.to_json_pretty().expect("serialize"), b"[]");
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Done.to_string(), "done");
        assert_eq!(Verdict::Failed.to_string(), "failed");
    }
}
