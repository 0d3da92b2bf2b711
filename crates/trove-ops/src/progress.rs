//! Progress reporting and cooperative cancellation for batch operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Copy,
    Move,
    Rename,
    Delete,
    Trash,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Rename => write!(f, "Rename"),
            Self::Delete => write!(f, "Delete"),
            Self::Trash => write!(f, "Move to trash"),
        }
    }
}

/// Progress information for an ongoing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationProgress {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of top-level items processed so far, failed ones included.
    pub items_completed: usize,
    /// Total number of top-level items in the batch.
    pub items_total: usize,
    /// Number of bytes written or moved so far.
    pub bytes_processed: u64,
    /// The item currently being processed.
    pub current_path: Option<PathBuf>,
}

impl OperationProgress {
    /// Create a new progress tracker for an operation.
    pub fn new(operation_type: OperationType, items_total: usize) -> Self {
        Self {
            operation_type,
            items_completed: 0,
            items_total,
            bytes_processed: 0,
            current_path: None,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.items_total > 0 {
            (self.items_completed as f64 / self.items_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Update the item currently being processed.
    pub fn set_current(&mut self, path: Option<PathBuf>) {
        self.current_path = path;
    }

    /// Mark one more item as done.
    pub fn complete_item(&mut self, bytes: u64) {
        self.items_completed += 1;
        self.bytes_processed += bytes;
    }
}

/// Receives progress snapshots while a batch runs.
///
/// Implementations must not block for long; the batch waits on them.
pub trait ProgressSink {
    fn report(&mut self, progress: &OperationProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&OperationProgress),
{
    fn report(&mut self, progress: &OperationProgress) {
        self(progress)
    }
}

/// Cancellation and progress hooks an engine consults between items.
#[derive(Default)]
pub struct BatchControl {
    cancel: CancellationToken,
    sink: Option<Box<dyn ProgressSink + Send>>,
}

impl std::fmt::Debug for BatchControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchControl")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl BatchControl {
    /// Create a control with a fresh token and no progress sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `token` for cancellation.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Push progress snapshots to `sink`.
    pub fn with_progress(mut self, sink: impl ProgressSink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// A handle that cancels this batch when triggered.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn report(&mut self, progress: &OperationProgress) {
        if let Some(sink) = self.sink.as_mut() {
            sink.report(progress);
        }
    }
}
