//! File operation descriptions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::progress::OperationType;
use crate::rename::RenameRule;

/// A batch operation to be executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOperation {
    /// Copy files/directories into a destination directory.
    Copy {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Move files/directories into a destination directory.
    Move {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Rename every path in place according to a rule.
    Rename { paths: Vec<PathBuf>, rule: RenameRule },
    /// Permanently delete files/directories.
    Delete { targets: Vec<PathBuf> },
    /// Move files/directories to the trash.
    Trash { targets: Vec<PathBuf> },
}

impl FileOperation {
    /// Create a copy operation.
    pub fn copy(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Copy {
            sources,
            destination: destination.into(),
        }
    }

    /// Create a move operation.
    pub fn move_to(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Move {
            sources,
            destination: destination.into(),
        }
    }

    /// Create a rename operation.
    pub fn rename(paths: Vec<PathBuf>, rule: RenameRule) -> Self {
        Self::Rename { paths, rule }
    }

    /// Create a delete operation, permanent or via the trash.
    pub fn delete(targets: Vec<PathBuf>, use_trash: bool) -> Self {
        if use_trash {
            Self::Trash { targets }
        } else {
            Self::Delete { targets }
        }
    }

    /// The kind of operation.
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Copy { .. } => OperationType::Copy,
            Self::Move { .. } => OperationType::Move,
            Self::Rename { .. } => OperationType::Rename,
            Self::Delete { .. } => OperationType::Delete,
            Self::Trash { .. } => OperationType::Trash,
        }
    }

    /// Number of top-level items in the batch.
    pub fn item_count(&self) -> usize {
        match self {
            Self::Copy { sources, .. } | Self::Move { sources, .. } => sources.len(),
            Self::Rename { paths, .. } => paths.len(),
            Self::Delete { targets } | Self::Trash { targets } => targets.len(),
        }
    }
}
