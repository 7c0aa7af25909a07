//! Pipeline configuration.
//!
//! This module provides configuration for the folder audit pipeline:
//! the input directory, per-folder concurrency, folder name markers,
//! log file naming, per-file timeouts and the durability policy.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::audit::DEFAULT_LOG_FILE_NAME;
use crate::folder::FolderMarkers;
use crate::hasher::DEFAULT_READ_BUFFER_BYTES;
use crate::scheduler::coerce_concurrency;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the folder audit pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the work folders.
    pub input_dir: PathBuf,
    /// Maximum number of files hashed at once within a folder.
    pub concurrency: usize,
    /// Folder name prefixes.
    pub markers: FolderMarkers,
    /// Name of the audit log written into each folder.
    pub log_file_name: String,
    /// Optional upper bound on the time spent hashing one file.
    pub file_timeout: Option<Duration>,
    /// Mark a folder failed when its log could not be synced to disk.
    pub strict_durability: bool,
    /// Read chunk size used while hashing.
    pub read_buffer_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./input"),
            concurrency: default_concurrency(),
            markers: FolderMarkers::default(),
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            file_timeout: None,
            strict_durability: false,
            read_buffer_bytes: DEFAULT_READ_BUFFER_BYTES,
        }
    }
}

/// Number of CPUs available to this process, or 1 if unknown.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FOLDER_AUDIT_INPUT_DIR`: Input directory (default: ./input)
    /// - `FOLDER_AUDIT_CONCURRENCY`: Files hashed at once per folder (default: CPU count; values <= 0 become 1)
    /// - `FOLDER_AUDIT_PENDING_MARKER`: Pending folder prefix (default: pending_)
    /// - `FOLDER_AUDIT_DONE_MARKER`: Done folder prefix (default: done_)
    /// - `FOLDER_AUDIT_FAILED_MARKER`: Failed folder prefix (default: failed_)
    /// - `FOLDER_AUDIT_LOG_FILE`: Audit log file name (default: log.json)
    /// - `FOLDER_AUDIT_FILE_TIMEOUT_SECS`: Per-file timeout in seconds (default: none)
    /// - `FOLDER_AUDIT_STRICT_DURABILITY`: Fail folders whose log was not synced (default: false)
    /// - `FOLDER_AUDIT_READ_BUFFER_BYTES`: Read chunk size (default: 65536)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(val) = lookup("FOLDER_AUDIT_INPUT_DIR") {
            config.input_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("FOLDER_AUDIT_CONCURRENCY") {
            let requested: i64 = parse_env_value(&val, "FOLDER_AUDIT_CONCURRENCY")?;
            config.concurrency = coerce_concurrency(requested);
        }

        if let Some(val) = lookup("FOLDER_AUDIT_PENDING_MARKER") {
            config.markers.pending = val;
        }

        if let Some(val) = lookup("FOLDER_AUDIT_DONE_MARKER") {
            config.markers.done = val;
        }

        if let Some(val) = lookup("FOLDER_AUDIT_FAILED_MARKER") {
            config.markers.failed = val;
        }

        if let Some(val) = lookup("FOLDER_AUDIT_LOG_FILE") {
            config.log_file_name = val;
        }

        if let Some(val) = lookup("FOLDER_AUDIT_FILE_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "FOLDER_AUDIT_FILE_TIMEOUT_SECS")?;
            config.file_timeout = Some(Duration::from_secs(secs));
        }

        if let Some(val) = lookup("FOLDER_AUDIT_STRICT_DURABILITY") {
            config.strict_durability = parse_env_bool(&val, "FOLDER_AUDIT_STRICT_DURABILITY")?;
        }

        if let Some(val) = lookup("FOLDER_AUDIT_READ_BUFFER_BYTES") {
            config.read_buffer_bytes = parse_env_value(&val, "FOLDER_AUDIT_READ_BUFFER_BYTES")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ValidationFailed(
                "concurrency must be greater than 0".to_string(),
            ));
        }

        let markers = [
            ("pending", &self.markers.pending),
            ("done", &self.markers.done),
            ("failed", &self.markers.failed),
        ];
        for (label, marker) in markers {
            if marker.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} marker cannot be empty",
                    label
                )));
            }
            if marker.contains(std::path::MAIN_SEPARATOR) || marker.contains('/') {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} marker cannot contain a path separator",
                    label
                )));
            }
        }

        if self.markers.pending == self.markers.done
            || self.markers.pending == self.markers.failed
            || self.markers.done == self.markers.failed
        {
            return Err(ConfigError::ValidationFailed(
                "pending, done and failed markers must be distinct".to_string(),
            ));
        }

        if self.log_file_name.is_empty()
            || self.log_file_name.contains('/')
            || self.log_file_name.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(ConfigError::ValidationFailed(
                "log_file_name must be a plain file name".to_string(),
            ));
        }

        if matches!(self.file_timeout, Some(t) if t.is_zero()) {
            return Err(ConfigError::ValidationFailed(
                "file_timeout must be greater than 0".to_string(),
            ));
        }

        if self.read_buffer_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "read_buffer_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the input directory.
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    /// Builder method to set concurrency; values below 1 become 1.
    pub fn with_concurrency(mut self, concurrency: i64) -> Self {
        self.concurrency = coerce_concurrency(concurrency);
        self
    }

    /// Builder method to set folder markers.
    pub fn with_markers(mut self, markers: FolderMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Builder method to set the audit log file name.
    pub fn with_log_file_name(mut self, name: impl Into<String>) -> Self {
        self.log_file_name = name.into();
        self
    }

    /// Builder method to set the per-file timeout.
    pub fn with_file_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.file_timeout = timeout;
        self
    }

    /// Builder method to set the durability policy.
    pub fn with_strict_durability(mut self, strict: bool) -> Self {
        self.strict_durability = strict;
        self
    }

    /// Builder method to set the read chunk size.
    pub fn with_read_buffer_bytes(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes;
        self
    }
}

/// Parses an environment variable value to the specified type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

/// Parses a boolean environment variable value.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean, got '{}'", value),
        }),
    }
}
