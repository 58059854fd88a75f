//! Error types for the unique file collector
//!
//! Fatal errors (`ConfigLoad`, `RegistryLoad`, `InvalidPath`, `Cancelled`) abort
//! a run before any file is moved. Per-file problems during hashing or moving
//! are carried as [`FileFailure`] values in the run summary instead, so one bad
//! file never stops the batch.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the unique file collector
#[derive(Error, Debug)]
pub enum CollectorError {
    /// The category configuration could not be read or parsed
    #[error("Failed to load category configuration from {source_name}: {message}")]
    ConfigLoad {
        source_name: String,
        message: String,
    },

    /// A prior-run hash file was supplied but could not be read or parsed
    #[error("Failed to load hash registry '{}': {message}", path.display())]
    RegistryLoad { path: PathBuf, message: String },

    /// A single file could not be hashed
    #[error("Failed to hash '{}': {message}", path.display())]
    HashCompute { path: PathBuf, message: String },

    /// A single file could not be relocated
    #[error("Failed to move '{}' to '{}': {message}", source_path.display(), destination.display())]
    Move {
        source_path: PathBuf,
        destination: PathBuf,
        message: String,
    },

    /// The hash registry could not be written
    #[error("Failed to persist hash registry '{}': {message}", path.display())]
    Persist { path: PathBuf, message: String },

    /// Source or destination directory is unusable
    #[error("Invalid path '{}': {message}", path.display())]
    InvalidPath { path: PathBuf, message: String },

    /// The run was interrupted before any file was moved
    #[error("Run cancelled before any file was moved")]
    Cancelled,

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CollectorError>;

impl From<std::io::Error> for CollectorError {
    fn from(err: std::io::Error) -> Self {
        CollectorError::IoError(err.to_string())
    }
}

/// Phase in which a per-file failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Hash,
    Move,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Hash => write!(f, "hash"),
            FailureStage::Move => write!(f, "move"),
        }
    }
}

/// A file that was skipped because of a recoverable error
#[derive(Debug, Clone)]
pub struct FileFailure {
    /// Source path of the affected file
    pub path: PathBuf,
    /// Phase that failed
    pub stage: FailureStage,
    /// Human-readable reason
    pub reason: String,
}

impl FileFailure {
    /// Build a failure record from a per-file error
    ///
    /// Only `HashCompute` and `Move` are per-file; anything else is recorded
    /// against the hash stage with its display text.
    pub fn from_error(err: &CollectorError) -> Self {
        match err {
            CollectorError::Move {
                source_path,
                message,
                ..
            } => Self {
                path: source_path.clone(),
                stage: FailureStage::Move,
                reason: message.clone(),
            },
            CollectorError::HashCompute { path, message } => Self {
                path: path.clone(),
                stage: FailureStage::Hash,
                reason: message.clone(),
            },
            other => Self {
                path: PathBuf::new(),
                stage: FailureStage::Hash,
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.path.display(), self.reason)
    }
}

/// Process exit codes used by the binary
pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const CANCELLED: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const REGISTRY_ERROR: u8 = 3;
    pub const INVALID_PATH: u8 = 4;
    pub const UNEXPECTED_ERROR: u8 = 5;
}

impl CollectorError {
    /// Exit code the binary should report for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CollectorError::ConfigLoad { .. } => exit_codes::CONFIG_ERROR,
            CollectorError::RegistryLoad { .. } => exit_codes::REGISTRY_ERROR,
            CollectorError::InvalidPath { .. } => exit_codes::INVALID_PATH,
            CollectorError::Cancelled => exit_codes::CANCELLED,
            _ => exit_codes::UNEXPECTED_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_error_becomes_move_failure() {
        let err = CollectorError::Move {
            source_path: PathBuf::from("/src/a.txt"),
            destination: PathBuf::from("/dst/a.txt"),
            message: "permission denied".to_string(),
        };

        let failure = FileFailure::from_error(&err);
        assert_eq!(failure.stage, FailureStage::Move);
        assert_eq!(failure.path, PathBuf::from("/src/a.txt"));
        assert_eq!(failure.reason, "permission denied");
        assert_eq!(failure.to_string(), "[move] /src/a.txt: permission denied");
    }

    #[test]
    fn test_exit_codes_for_fatal_errors() {
        let config = CollectorError::ConfigLoad {
            source_name: "categories.json".to_string(),
            message: "bad".to_string(),
        };
        let registry = CollectorError::RegistryLoad {
            path: PathBuf::from("hashes.txt"),
            message: "bad".to_string(),
        };

        assert_eq!(config.exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(registry.exit_code(), exit_codes::REGISTRY_ERROR);
        assert_eq!(CollectorError::Cancelled.exit_code(), exit_codes::CANCELLED);
    }
}
