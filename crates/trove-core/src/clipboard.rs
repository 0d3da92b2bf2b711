//! Clipboard state: the active cut/copy operation and its recall history.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Whether a paste should copy or move the clipboard paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ClipboardKind {
    Cut,
    Copy,
}

/// A cut or copy captured from the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardOperation {
    pub kind: ClipboardKind,
    /// Paths in the order they were captured.
    pub paths: Vec<PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl ClipboardOperation {
    /// Capture a new operation stamped with the current time.
    pub fn new(kind: ClipboardKind, paths: Vec<PathBuf>) -> Self {
        Self {
            kind,
            paths,
            created_at: Utc::now(),
        }
    }

    /// Check if this operation moves its paths on paste.
    pub fn is_cut(&self) -> bool {
        self.kind == ClipboardKind::Cut
    }

    /// Check that every path still exists. Evaluated on demand because
    /// paths can disappear at any time after capture.
    pub fn is_valid(&self) -> bool {
        !self.paths.is_empty() && self.paths.iter().all(|p| p.symlink_metadata().is_ok())
    }
}

/// A history item paired with its validity at recall time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry<'a> {
    pub operation: &'a ClipboardOperation,
    pub valid: bool,
}

/// The single active clipboard operation plus a bounded history.
///
/// Setting a new operation always replaces the active one; paths are never
/// merged across operations.
#[derive(Debug, Clone)]
pub struct Clipboard {
    active: Option<ClipboardOperation>,
    /// Newest first.
    history: VecDeque<ClipboardOperation>,
    capacity: usize,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Clipboard {
    /// Create an empty clipboard keeping at most `capacity` past operations.
    pub fn new(capacity: usize) -> Self {
        Self {
            active: None,
            history: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Make `operation` the active one and record it in the history.
    pub fn set(&mut self, operation: ClipboardOperation) {
        self.history.push_front(operation.clone());
        self.history.truncate(self.capacity);
        self.active = Some(operation);
    }

    /// Capture a copy of `paths`.
    pub fn copy(&mut self, paths: Vec<PathBuf>) {
        self.set(ClipboardOperation::new(ClipboardKind::Copy, paths));
    }

    /// Capture a cut of `paths`.
    pub fn cut(&mut self, paths: Vec<PathBuf>) {
        self.set(ClipboardOperation::new(ClipboardKind::Cut, paths));
    }

    /// The active operation, if any.
    pub fn active(&self) -> Option<&ClipboardOperation> {
        self.active.as_ref()
    }

    /// Drop the active operation. History is kept.
    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Check if there is nothing to paste.
    pub fn is_empty(&self) -> bool {
        self.active.as_ref().is_none_or(|op| op.paths.is_empty())
    }

    /// Past operations, newest first, with validity computed now.
    pub fn history(&self) -> Vec<HistoryEntry<'_>> {
        self.history
            .iter()
            .map(|operation| HistoryEntry {
                operation,
                valid: operation.is_valid(),
            })
            .collect()
    }

    /// Look up a single history item, computing its validity now.
    pub fn recall(&self, index: usize) -> Option<HistoryEntry<'_>> {
        self.history.get(index).map(|operation| HistoryEntry {
            operation,
            valid: operation.is_valid(),
        })
    }

    /// Re-activate a past operation. Returns `false` if the index is out of
    /// range. The restored operation moves to the front of the history.
    pub fn restore(&mut self, index: usize) -> bool {
        match self.history.remove(index) {
            Some(operation) => {
                self.set(operation);
                true
            }
            None => false,
        }
    }

    /// Number of operations in the history.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Maximum number of operations kept in the history.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
