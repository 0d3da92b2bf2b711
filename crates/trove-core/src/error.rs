//! Error types for file operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a single item (or a whole batch) could not be processed.
///
/// Per-item variants end up in a batch result's failure list; they never
/// abort the batch on their own.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OpError {
    /// The path no longer exists at the time it was processed.
    #[error("source vanished")]
    SourceVanished,

    /// The operation would not change anything (same source and target).
    #[error("no-op: source and target are the same")]
    NoOpTarget,

    /// The target path is already taken.
    #[error("target exists")]
    AlreadyExists,

    /// The conflict resolver chose to skip an existing target.
    #[error("skipped (exists)")]
    SkippedExisting,

    /// Copying or moving a directory into itself or one of its descendants.
    #[error("cannot copy/move a directory into itself")]
    RecursiveTargetConflict,

    /// Permission denied by the operating system.
    #[error("permission denied")]
    PermissionDenied,

    /// A computed or proposed name was empty.
    #[error("empty name")]
    EmptyName,

    /// A computed or proposed name is not a valid file name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The destination of a transfer is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Any other I/O error, carrying the OS message.
    #[error("{0}")]
    Io(String),

    /// The batch was cancelled before this item was reached.
    #[error("cancelled")]
    Cancelled,

    /// No recoverable-delete facility exists on this platform.
    #[error("trash is not supported on this platform")]
    Unsupported,

    /// Another operation is already in flight.
    #[error("another operation is already running")]
    Busy,
}

impl OpError {
    /// Classify an I/O error.
    pub fn io(source: &std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(source.to_string()),
        }
    }

    /// Classify an I/O error raised while first touching a source path,
    /// where "not found" means the path disappeared after it was selected.
    pub fn io_at_source(source: &std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::SourceVanished,
            _ => Self::io(source),
        }
    }
}

impl From<std::io::Error> for OpError {
    fn from(source: std::io::Error) -> Self {
        Self::io(&source)
    }
}

/// A failed item in a batch: the `(path, reason)` pair shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// The path that failed.
    pub path: PathBuf,
    /// Why it failed.
    pub error: OpError,
}

impl ItemFailure {
    /// Create a new item failure.
    pub fn new(path: impl Into<PathBuf>, error: OpError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }

    /// Human-readable reason.
    pub fn reason(&self) -> String {
        self.error.to_string()
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_error_io() {
        let err = OpError::io(&std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err, OpError::PermissionDenied);

        let err = OpError::io(&std::io::Error::other("disk on fire"));
        assert_eq!(err, OpError::Io("disk on fire".to_string()));
    }

    #[test]
    fn test_op_error_at_source() {
        let err = OpError::io_at_source(&std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err, OpError::SourceVanished);
    }

    #[test]
    fn test_item_failure_display() {
        let failure = ItemFailure::new("/tmp/a.txt", OpError::SkippedExisting);
        assert_eq!(failure.reason(), "skipped (exists)");
        assert_eq!(failure.to_string(), "/tmp/a.txt: skipped (exists)");
    }
}
