//! File operations engine for trove.
//!
//! Copy, move, bulk rename, delete and trash over batches of paths. Each
//! engine runs synchronously, reports per-item failures in a
//! [`BatchResult`] instead of stopping at the first error, and checks a
//! [`BatchControl`] between items for cancellation and progress. The
//! [`executor`](OperationExecutor) ties them to the clipboard and can run
//! any [`FileOperation`] on tokio's blocking pool while streaming
//! [`OperationEvent`]s over a channel.

mod batch;
mod conflict;
mod delete;
mod executor;
mod fs_util;
mod operation;
mod progress;
mod rename;
mod transfer;

pub use batch::{BatchOutcome, BatchResult, Interruption};
pub use conflict::{
    AutoRenameResolver, Conflict, ConflictDecision, ConflictKind, ConflictResolver, FixedResolver,
    ResolveContext, auto_rename_path,
};
pub use delete::{DeleteEngine, NoTrash, SystemTrash, TrashBackend};
pub use executor::{
    ActiveOperation, OperationEvent, OperationExecutor, OperationGuard, run_operation,
    start_operation,
};
pub use operation::FileOperation;
pub use progress::{BatchControl, OperationProgress, OperationType, ProgressSink};
pub use rename::{RenameEngine, RenamePreview, RenameRule, preview, validate_filename};
pub use transfer::{TransferEngine, TransferMode, settle_cut};

/// Default channel buffer size for operation progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;
