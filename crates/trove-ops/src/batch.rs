//! Batch results shared by every engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trove_core::{ItemFailure, OpError};

use crate::progress::OperationType;

/// Why a batch stopped before reaching every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interruption {
    /// Cancellation was requested between items.
    Cancelled,
    /// A conflict resolver answered `Abort`.
    Aborted,
}

/// Outcome of a batch that ran: successes, per-item failures, and any items
/// that were never reached.
///
/// Failure is data here. Nothing that goes wrong with an individual item
/// escapes as an error, and successes are never dropped when failures occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// The type of operation.
    pub operation_type: OperationType,
    /// Number of items successfully processed.
    pub succeeded: usize,
    /// Failed items in input order.
    pub failures: Vec<ItemFailure>,
    /// Items not attempted because the batch was interrupted.
    pub unprocessed: Vec<PathBuf>,
    /// Set when the batch stopped early.
    pub interruption: Option<Interruption>,
    /// Total bytes copied or moved.
    pub bytes_processed: u64,
}

impl BatchResult {
    /// Create an empty result.
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            succeeded: 0,
            failures: Vec::new(),
            unprocessed: Vec::new(),
            interruption: None,
            bytes_processed: 0,
        }
    }

    pub(crate) fn record_success(&mut self, bytes: u64) {
        self.succeeded += 1;
        self.bytes_processed += bytes;
    }

    pub(crate) fn record_failure(&mut self, path: impl Into<PathBuf>, error: OpError) {
        self.failures.push(ItemFailure::new(path, error));
    }

    pub(crate) fn interrupt(&mut self, reason: Interruption, remaining: &[PathBuf]) {
        self.interruption = Some(reason);
        self.unprocessed.extend(remaining.iter().cloned());
    }

    /// Number of failed items.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Check if every item succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.interruption.is_none()
    }

    /// Items left untouched by a cancellation.
    pub fn cancelled(&self) -> &[PathBuf] {
        match self.interruption {
            Some(Interruption::Cancelled) => &self.unprocessed,
            _ => &[],
        }
    }

    /// Check whether a resolver aborted the batch.
    pub fn was_aborted(&self) -> bool {
        self.interruption == Some(Interruption::Aborted)
    }

    /// The first `n` failures, for a status line.
    pub fn first_failures(&self, n: usize) -> &[ItemFailure] {
        &self.failures[..self.failures.len().min(n)]
    }

    /// Look up the failure recorded for `path`, if any.
    pub fn failure_for(&self, path: &Path) -> Option<&OpError> {
        self.failures
            .iter()
            .find(|f| f.path == path)
            .map(|f| &f.error)
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::Copy => "Copied",
            OperationType::Move => "Moved",
            OperationType::Rename => "Renamed",
            OperationType::Delete => "Deleted",
            OperationType::Trash => "Trashed",
        };

        let mut summary = format!("{} {} items", action, self.succeeded);
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        match self.interruption {
            Some(Interruption::Cancelled) => {
                summary.push_str(&format!(", {} cancelled", self.unprocessed.len()));
            }
            Some(Interruption::Aborted) => {
                summary.push_str(&format!(", aborted ({} not processed)", self.unprocessed.len()));
            }
            None => {}
        }
        summary
    }
}

/// What a batch call returns.
///
/// Batch-level conditions are their own variants so callers can switch
/// strategy (for example offer permanent delete when trash is unsupported)
/// without inspecting failure text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// The batch ran; see the per-item result.
    Completed(BatchResult),
    /// Cancelled before the first item started. Nothing was touched.
    Cancelled,
    /// No recoverable-delete facility exists. Nothing was touched.
    Unsupported,
    /// A precondition of the whole batch failed. Nothing was touched.
    Rejected(OpError),
}

impl BatchOutcome {
    /// The per-item result, if the batch ran.
    pub fn result(&self) -> Option<&BatchResult> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// Consume into the per-item result, if the batch ran.
    pub fn into_result(self) -> Option<BatchResult> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// Number of successful items (zero unless the batch ran).
    pub fn succeeded(&self) -> usize {
        self.result().map_or(0, |r| r.succeeded)
    }

    /// Get a human-readable summary of the outcome.
    pub fn summary(&self) -> String {
        match self {
            Self::Completed(result) => result.summary(),
            Self::Cancelled => "Cancelled before any item was processed".to_string(),
            Self::Unsupported => OpError::Unsupported.to_string(),
            Self::Rejected(error) => format!("Rejected: {error}"),
        }
    }
}
