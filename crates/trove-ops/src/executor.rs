//! High-level operation executor with unified result handling.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use trove_core::{Clipboard, OpError, OpsConfig};

use crate::OPERATION_CHANNEL_SIZE;
use crate::batch::{BatchOutcome, BatchResult};
use crate::conflict::ConflictResolver;
use crate::delete::DeleteEngine;
use crate::operation::FileOperation;
use crate::progress::{BatchControl, OperationProgress, OperationType, ProgressSink};
use crate::rename::RenameEngine;
use crate::transfer::{TransferEngine, TransferMode, settle_cut};

/// Events streamed from a running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    /// Progress update.
    Progress(OperationProgress),
    /// The operation finished. Always the last event.
    Complete(BatchOutcome),
}

/// Forwards progress into an operation channel.
///
/// Updates are dropped while the channel is full so a slow receiver never
/// stalls the batch.
#[derive(Debug, Clone)]
struct ChannelSink(mpsc::Sender<OperationEvent>);

impl ProgressSink for ChannelSink {
    fn report(&mut self, progress: &OperationProgress) {
        let _ = self.0.try_send(OperationEvent::Progress(progress.clone()));
    }
}

/// Admits at most one mutating operation at a time.
#[derive(Debug, Clone, Default)]
pub struct OperationGuard {
    busy: Arc<AtomicBool>,
}

impl OperationGuard {
    /// Create an idle guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. Returns `None` while another operation holds it.
    pub fn try_begin(&self) -> Option<ActiveOperation> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ActiveOperation {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Check whether an operation is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of an operation; releases the guard on drop.
#[derive(Debug)]
pub struct ActiveOperation {
    busy: Arc<AtomicBool>,
}

impl Drop for ActiveOperation {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Run `operation` to completion on the current thread.
pub fn run_operation(
    operation: &FileOperation,
    resolver: &mut dyn ConflictResolver,
    config: &OpsConfig,
    control: BatchControl,
) -> BatchOutcome {
    tracing::debug!(
        target: "executor",
        "running {} over {} items",
        operation.operation_type(),
        operation.item_count()
    );

    match operation {
        FileOperation::Copy {
            sources,
            destination,
        } => TransferEngine::new(config.clone())
            .with_control(control)
            .transfer(TransferMode::Copy, sources, destination, resolver),
        FileOperation::Move {
            sources,
            destination,
        } => TransferEngine::new(config.clone())
            .with_control(control)
            .transfer(TransferMode::Move, sources, destination, resolver),
        FileOperation::Rename { paths, rule } => {
            RenameEngine::new().with_control(control).apply(paths, rule)
        }
        FileOperation::Delete { targets } => DeleteEngine::new().with_control(control).delete(targets),
        FileOperation::Trash { targets } => DeleteEngine::new().with_control(control).trash(targets),
    }
}

/// Start an operation on the blocking thread pool.
///
/// Progress and the final outcome arrive on the returned channel. When the
/// guard is already held the only event is `Complete(Rejected(Busy))`.
/// Must be called from within a tokio runtime.
pub fn start_operation(
    operation: FileOperation,
    mut resolver: Box<dyn ConflictResolver + Send>,
    config: OpsConfig,
    guard: &OperationGuard,
    cancel: CancellationToken,
) -> mpsc::Receiver<OperationEvent> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    let Some(active) = guard.try_begin() else {
        tracing::warn!(target: "executor", "{} rejected: busy", operation.operation_type());
        let _ = tx.try_send(OperationEvent::Complete(BatchOutcome::Rejected(OpError::Busy)));
        return rx;
    };

    tokio::task::spawn_blocking(move || {
        let control = BatchControl::new()
            .with_cancel(cancel)
            .with_progress(ChannelSink(tx.clone()));
        let outcome = run_operation(&operation, resolver.as_mut(), &config, control);
        drop(active);
        let _ = tx.blocking_send(OperationEvent::Complete(outcome));
    });

    rx
}

/// Owns the clipboard and serializes operations against it.
#[derive(Debug)]
pub struct OperationExecutor {
    config: OpsConfig,
    clipboard: Clipboard,
    guard: OperationGuard,
}

impl Default for OperationExecutor {
    fn default() -> Self {
        Self::new(OpsConfig::default())
    }
}

impl OperationExecutor {
    /// Create an executor with an empty clipboard sized from `config`.
    pub fn new(config: OpsConfig) -> Self {
        let clipboard = Clipboard::new(config.clipboard_history);
        Self {
            config,
            clipboard,
            guard: OperationGuard::new(),
        }
    }

    /// The configuration every operation runs with.
    pub fn config(&self) -> &OpsConfig {
        &self.config
    }

    /// The clipboard pastes are taken from.
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Mutable access to the clipboard, for recall and restore.
    pub fn clipboard_mut(&mut self) -> &mut Clipboard {
        &mut self.clipboard
    }

    /// A handle on the busy flag, shared with background operations.
    pub fn guard(&self) -> OperationGuard {
        self.guard.clone()
    }

    /// Put `paths` on the clipboard for copying.
    pub fn copy(&mut self, paths: Vec<std::path::PathBuf>) {
        self.clipboard.copy(paths);
    }

    /// Put `paths` on the clipboard for moving.
    pub fn cut(&mut self, paths: Vec<std::path::PathBuf>) {
        self.clipboard.cut(paths);
    }

    /// Paste the active clipboard operation into `destination`.
    pub fn paste(
        &mut self,
        destination: &Path,
        resolver: &mut dyn ConflictResolver,
        control: BatchControl,
    ) -> BatchOutcome {
        let Some(_active) = self.guard.try_begin() else {
            return BatchOutcome::Rejected(OpError::Busy);
        };
        let Some(clip) = self.clipboard.active().cloned() else {
            return BatchOutcome::Completed(BatchResult::new(OperationType::Copy));
        };

        let operation = if clip.is_cut() {
            FileOperation::move_to(clip.paths, destination)
        } else {
            FileOperation::copy(clip.paths, destination)
        };
        let outcome = run_operation(&operation, resolver, &self.config, control);
        settle_cut(&mut self.clipboard, &outcome);
        outcome
    }

    /// Execute an operation on the current thread.
    pub fn execute(
        &mut self,
        operation: &FileOperation,
        resolver: &mut dyn ConflictResolver,
        control: BatchControl,
    ) -> BatchOutcome {
        let Some(_active) = self.guard.try_begin() else {
            return BatchOutcome::Rejected(OpError::Busy);
        };
        run_operation(operation, resolver, &self.config, control)
    }

    /// Execute an operation in the background, streaming its events.
    pub fn start(
        &self,
        operation: FileOperation,
        resolver: Box<dyn ConflictResolver + Send>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<OperationEvent> {
        start_operation(operation, resolver, self.config.clone(), &self.guard, cancel)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::conflict::{ConflictDecision, FixedResolver};

    fn skip() -> FixedResolver {
        FixedResolver(ConflictDecision::Skip)
    }

    #[test]
    fn test_guard_is_exclusive() {
        let guard = OperationGuard::new();
        let first = guard.try_begin();
        assert!(first.is_some());
        assert!(guard.try_begin().is_none());
        drop(first);
        assert!(!guard.is_busy());
        assert!(guard.try_begin().is_some());
    }

    #[test]
    fn test_execute_rejects_while_busy() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, b"x").unwrap();

        let mut executor = OperationExecutor::default();
        let _held = executor.guard().try_begin().unwrap();
        let op = FileOperation::delete(vec![file.clone()], false);
        let outcome = executor.execute(&op, &mut skip(), BatchControl::new());

        assert_eq!(outcome, BatchOutcome::Rejected(OpError::Busy));
        assert!(file.exists());
    }

    #[test]
    fn test_paste_cut_clears_clipboard() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"x").unwrap();
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let mut executor = OperationExecutor::default();
        executor.cut(vec![src.clone()]);
        let outcome = executor.paste(&dest, &mut skip(), BatchControl::new());

        assert_eq!(outcome.succeeded(), 1);
        assert!(executor.clipboard().active().is_none());
        assert!(dest.join("a.txt").exists());
        assert!(!src.exists());
    }

    #[test]
    fn test_paste_copy_keeps_clipboard() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"x").unwrap();
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let mut executor = OperationExecutor::default();
        executor.copy(vec![src.clone()]);
        executor.paste(&dest, &mut skip(), BatchControl::new());

        assert!(executor.clipboard().active().is_some());
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_start_operation_streams_progress_then_complete() {
        let tmp = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| {
                let p = tmp.path().join(format!("{i}.txt"));
                fs::write(&p, b"abc").unwrap();
                p
            })
            .collect();

        let executor = OperationExecutor::default();
        let mut rx = executor.start(
            FileOperation::delete(paths.clone(), false),
            Box::new(skip()),
            CancellationToken::new(),
        );

        let mut progress_events = 0;
        let mut outcome = None;
        while let Some(event) = rx.recv().await {
            match event {
                OperationEvent::Progress(_) => progress_events += 1,
                OperationEvent::Complete(o) => outcome = Some(o),
            }
        }

        let outcome = outcome.unwrap();
        assert_eq!(outcome.succeeded(), 3);
        assert!(progress_events > 0);
        assert!(paths.iter().all(|p| !p.exists()));
        assert!(!executor.guard().is_busy());
    }

    #[tokio::test]
    async fn test_start_operation_busy() {
        let executor = OperationExecutor::default();
        let _held = executor.guard().try_begin().unwrap();

        let mut rx = executor.start(
            FileOperation::delete(vec![PathBuf::from("/nonexistent")], false),
            Box::new(skip()),
            CancellationToken::new(),
        );

        assert_eq!(
            rx.recv().await,
            Some(OperationEvent::Complete(BatchOutcome::Rejected(OpError::Busy)))
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_start_operation_cancelled_before_start() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("keep.txt");
        fs::write(&file, b"x").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let executor = OperationExecutor::default();
        let mut rx = executor.start(
            FileOperation::delete(vec![file.clone()], false),
            Box::new(skip()),
            cancel,
        );

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert_eq!(last, Some(OperationEvent::Complete(BatchOutcome::Cancelled)));
        assert!(file.exists());
    }
}
