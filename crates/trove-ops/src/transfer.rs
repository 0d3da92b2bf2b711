//! Copy and move, one algorithm for both, with conflict resolution.

use std::fs;
use std::path::{Path, PathBuf};

use trove_core::{Clipboard, OpError, OpsConfig, is_same_or_descendant};

use crate::batch::{BatchOutcome, BatchResult, Interruption};
use crate::conflict::{BatchPolicy, Conflict, ConflictDecision, ConflictResolver};
use crate::fs_util::{self, CopyOptions};
use crate::progress::{BatchControl, OperationProgress, OperationType};
use crate::rename::validate_filename;

/// Whether sources are duplicated or relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

impl TransferMode {
    fn operation_type(self) -> OperationType {
        match self {
            Self::Copy => OperationType::Copy,
            Self::Move => OperationType::Move,
        }
    }
}

/// What happened to one source.
enum ItemOutcome {
    Done(u64),
    Failed(OpError),
    Abort,
}

/// Where a conflicting item should go, once the resolver has spoken.
enum Resolution {
    Overwrite,
    Target(PathBuf),
    Skip,
    Abort,
    Failed(OpError),
}

/// Executes copy and move batches into a destination directory.
///
/// Items are processed in input order. A failing item is recorded and the
/// batch moves on; only an `Abort` decision or cancellation stops it early,
/// and nothing already transferred is rolled back.
#[derive(Debug)]
pub struct TransferEngine {
    config: OpsConfig,
    control: BatchControl,
}

impl TransferEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: OpsConfig) -> Self {
        Self {
            config,
            control: BatchControl::new(),
        }
    }

    /// Attach cancellation and progress hooks.
    pub fn with_control(mut self, control: BatchControl) -> Self {
        self.control = control;
        self
    }

    /// Copy every source into `destination`.
    pub fn copy(
        &mut self,
        sources: &[PathBuf],
        destination: &Path,
        resolver: &mut dyn ConflictResolver,
    ) -> BatchOutcome {
        self.transfer(TransferMode::Copy, sources, destination, resolver)
    }

    /// Move every source into `destination`.
    pub fn move_to(
        &mut self,
        sources: &[PathBuf],
        destination: &Path,
        resolver: &mut dyn ConflictResolver,
    ) -> BatchOutcome {
        self.transfer(TransferMode::Move, sources, destination, resolver)
    }

    /// Paste the clipboard's active operation into `destination`.
    ///
    /// A cut is moved, a copy is copied. After a cut the active operation is
    /// cleared, but only if at least one item made it across.
    pub fn paste(
        &mut self,
        clipboard: &mut Clipboard,
        destination: &Path,
        resolver: &mut dyn ConflictResolver,
    ) -> BatchOutcome {
        let Some(operation) = clipboard.active().cloned() else {
            return BatchOutcome::Completed(BatchResult::new(OperationType::Copy));
        };

        let mode = if operation.is_cut() {
            TransferMode::Move
        } else {
            TransferMode::Copy
        };
        let outcome = self.transfer(mode, &operation.paths, destination, resolver);
        settle_cut(clipboard, &outcome);
        outcome
    }

    /// Run one transfer batch.
    pub fn transfer(
        &mut self,
        mode: TransferMode,
        sources: &[PathBuf],
        destination: &Path,
        resolver: &mut dyn ConflictResolver,
    ) -> BatchOutcome {
        let operation_type = mode.operation_type();

        match fs::metadata(destination) {
            Ok(metadata) if metadata.is_dir() => {}
            _ => {
                tracing::warn!(target: "transfer", "destination {} is not a directory", destination.display());
                return BatchOutcome::Rejected(OpError::NotADirectory(destination.to_path_buf()));
            }
        }

        let mut result = BatchResult::new(operation_type);
        let mut progress = OperationProgress::new(operation_type, sources.len());
        let mut policy = BatchPolicy::new(self.config.batch_scope, sources.len());

        for (index, source) in sources.iter().enumerate() {
            if self.control.is_cancelled() {
                if index == 0 {
                    tracing::info!(target: "transfer", "{operation_type} cancelled before start");
                    return BatchOutcome::Cancelled;
                }
                result.interrupt(Interruption::Cancelled, &sources[index..]);
                break;
            }

            progress.set_current(Some(source.clone()));
            self.control.report(&progress);

            match self.transfer_one(mode, source, destination, resolver, &mut policy) {
                ItemOutcome::Done(bytes) => {
                    tracing::debug!(target: "transfer", "{operation_type} {} done", source.display());
                    result.record_success(bytes);
                    progress.complete_item(bytes);
                }
                ItemOutcome::Failed(error) => {
                    tracing::warn!(target: "transfer", "{operation_type} {} failed: {error}", source.display());
                    result.record_failure(source, error);
                    progress.complete_item(0);
                }
                ItemOutcome::Abort => {
                    tracing::info!(target: "transfer", "{operation_type} aborted at {}", source.display());
                    result.interrupt(Interruption::Aborted, &sources[index..]);
                    break;
                }
            }

            self.control.report(&progress);
        }

        tracing::info!(target: "transfer", "{}", result.summary());
        BatchOutcome::Completed(result)
    }

    fn transfer_one(
        &self,
        mode: TransferMode,
        source: &Path,
        destination: &Path,
        resolver: &mut dyn ConflictResolver,
        policy: &mut BatchPolicy,
    ) -> ItemOutcome {
        let metadata = match fs::symlink_metadata(source) {
            Ok(metadata) => metadata,
            Err(e) => return ItemOutcome::Failed(OpError::io_at_source(&e)),
        };
        let Some(name) = source.file_name() else {
            return ItemOutcome::Failed(OpError::InvalidName(format!(
                "{} has no file name",
                source.display()
            )));
        };

        // Must run before anything touches the disk, or the copy recurses forever.
        // A followed link counts as the directory it points to.
        let is_dir = if self.config.follow_symlinks {
            fs::metadata(source).is_ok_and(|m| m.is_dir())
        } else {
            metadata.is_dir()
        };
        if is_dir && is_same_or_descendant(destination, source) {
            return ItemOutcome::Failed(OpError::RecursiveTargetConflict);
        }

        let mut target = destination.join(name);
        if mode == TransferMode::Move && fs_util::same_path(&target, source) {
            return ItemOutcome::Failed(OpError::NoOpTarget);
        }

        if fs_util::exists(&target) {
            match self.resolve_conflict(source, &target, destination, resolver, policy) {
                Resolution::Overwrite => {
                    if fs_util::same_path(&target, source) {
                        return ItemOutcome::Failed(OpError::NoOpTarget);
                    }
                    // Removing an ancestor of the source would destroy the source.
                    if is_same_or_descendant(source, &target) {
                        return ItemOutcome::Failed(OpError::RecursiveTargetConflict);
                    }
                    if let Err(e) = fs_util::remove_path(&target) {
                        return ItemOutcome::Failed(OpError::io(&e));
                    }
                }
                Resolution::Target(renamed) => target = renamed,
                Resolution::Skip => return ItemOutcome::Failed(OpError::SkippedExisting),
                Resolution::Abort => return ItemOutcome::Abort,
                Resolution::Failed(error) => return ItemOutcome::Failed(error),
            }
        }

        let options = CopyOptions {
            preserve_metadata: self.config.preserve_metadata,
            follow_symlinks: self.config.follow_symlinks,
        };
        let result = match mode {
            TransferMode::Copy => fs_util::copy_entry(source, &target, options),
            TransferMode::Move => fs_util::move_entry(source, &target, options),
        };

        match result {
            Ok(bytes) => ItemOutcome::Done(bytes),
            Err(e) if fs_util::is_copy_cycle(&e) => {
                ItemOutcome::Failed(OpError::RecursiveTargetConflict)
            }
            Err(e) => ItemOutcome::Failed(OpError::io(&e)),
        }
    }

    /// Ask for a decision, re-prompting while a proposed rename is unusable.
    fn resolve_conflict(
        &self,
        source: &Path,
        target: &Path,
        destination: &Path,
        resolver: &mut dyn ConflictResolver,
        policy: &mut BatchPolicy,
    ) -> Resolution {
        let mut conflict = Conflict::at(source, target);

        for attempt in 0..self.config.max_rename_attempts {
            match policy.decide(&conflict, resolver, attempt) {
                ConflictDecision::Overwrite => return Resolution::Overwrite,
                ConflictDecision::Skip => return Resolution::Skip,
                ConflictDecision::Abort => return Resolution::Abort,
                ConflictDecision::RenameAs(name) => {
                    if let Err(reason) = validate_filename(&name) {
                        tracing::debug!(target: "transfer", "rejected rename {name:?}: {reason}");
                        continue;
                    }
                    let renamed = destination.join(&name);
                    if fs_util::exists(&renamed) {
                        conflict = Conflict::at(source, &renamed);
                        continue;
                    }
                    return Resolution::Target(renamed);
                }
            }
        }

        Resolution::Failed(OpError::AlreadyExists)
    }
}

/// Clear the clipboard after a cut paste that moved at least one item.
///
/// Copies stay on the clipboard so they can be pasted again.
pub fn settle_cut(clipboard: &mut Clipboard, outcome: &BatchOutcome) {
    let was_cut = clipboard.active().is_some_and(|op| op.is_cut());
    if was_cut && outcome.succeeded() > 0 {
        clipboard.clear_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{FixedResolver, ResolveContext};

    fn engine() -> TransferEngine {
        TransferEngine::new(OpsConfig::default())
    }

    fn skip() -> FixedResolver {
        FixedResolver(ConflictDecision::Skip)
    }

    #[test]
    fn test_copy_simple() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"data").unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir(&dest).unwrap();

        let outcome = engine().copy(&[src.clone()], &dest, &mut skip());
        let result = outcome.result().unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.bytes_processed, 4);
        assert!(src.exists());
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"data");
    }

    #[test]
    fn test_destination_must_be_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, b"").unwrap();

        let outcome = engine().copy(&[file.clone()], &tmp.path().join("missing"), &mut skip());
        assert!(matches!(outcome, BatchOutcome::Rejected(OpError::NotADirectory(_))));
    }

    #[test]
    fn test_move_onto_itself_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"data").unwrap();

        let outcome = engine().move_to(&[src.clone()], tmp.path(), &mut skip());
        let result = outcome.result().unwrap();
        assert_eq!(result.failure_for(&src), Some(&OpError::NoOpTarget));
        assert!(src.exists());
    }

    #[test]
    fn test_copy_into_same_dir_with_rename() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"data").unwrap();

        let mut resolver = FixedResolver(ConflictDecision::RenameAs("b.txt".to_string()));
        let outcome = engine().copy(&[src.clone()], tmp.path(), &mut resolver);
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(fs::read(tmp.path().join("b.txt")).unwrap(), b"data");
    }

    #[test]
    fn test_copy_onto_itself_cannot_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"data").unwrap();

        let mut resolver = FixedResolver(ConflictDecision::Overwrite);
        let outcome = engine().copy(&[src.clone()], tmp.path(), &mut resolver);
        let result = outcome.result().unwrap();
        assert_eq!(result.failure_for(&src), Some(&OpError::NoOpTarget));
        assert_eq!(fs::read(&src).unwrap(), b"data");
    }

    #[test]
    fn test_rename_reprompts_until_free() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("src");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&src_dir).unwrap();
        fs::create_dir_all(&dest).unwrap();
        let src = src_dir.join("a.txt");
        fs::write(&src, b"new").unwrap();
        fs::write(dest.join("a.txt"), b"old").unwrap();
        fs::write(dest.join("taken.txt"), b"taken").unwrap();

        let mut attempts = Vec::new();
        let mut resolver = |_: &Conflict, ctx: ResolveContext| {
            attempts.push(ctx.attempt);
            match ctx.attempt {
                0 => ConflictDecision::RenameAs("taken.txt".to_string()),
                1 => ConflictDecision::RenameAs(String::new()),
                _ => ConflictDecision::RenameAs("free.txt".to_string()),
            }
        };

        let outcome = engine().copy(&[src], &dest, &mut resolver);
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(attempts, vec![0, 1, 2]);
        assert_eq!(fs::read(dest.join("free.txt")).unwrap(), b"new");
        assert_eq!(fs::read(dest.join("taken.txt")).unwrap(), b"taken");
    }

    #[test]
    fn test_rename_attempts_are_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("src");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&src_dir).unwrap();
        fs::create_dir_all(&dest).unwrap();
        let src = src_dir.join("a.txt");
        fs::write(&src, b"new").unwrap();
        fs::write(dest.join("a.txt"), b"old").unwrap();

        let mut resolver = FixedResolver(ConflictDecision::RenameAs("a.txt".to_string()));
        let outcome = engine().copy(&[src.clone()], &dest, &mut resolver);
        let result = outcome.result().unwrap();
        assert_eq!(result.failure_for(&src), Some(&OpError::AlreadyExists));
    }

    #[test]
    fn test_overwrite_parent_of_source_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let inner = tmp.path().join("a").join("a");
        fs::create_dir_all(&inner).unwrap();

        let mut resolver = FixedResolver(ConflictDecision::Overwrite);
        let outcome = engine().move_to(&[inner.clone()], tmp.path(), &mut resolver);
        let result = outcome.result().unwrap();
        assert_eq!(result.failure_for(&inner), Some(&OpError::RecursiveTargetConflict));
        assert!(inner.exists());
    }

    #[test]
    fn test_cancel_before_start() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"data").unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir(&dest).unwrap();

        let control = BatchControl::new();
        control.cancel_token().cancel();
        let mut engine = engine().with_control(control);

        let outcome = engine.copy(&[src], &dest, &mut skip());
        assert_eq!(outcome, BatchOutcome::Cancelled);
        assert!(!dest.join("a.txt").exists());
    }

    #[test]
    fn test_paste_copy_keeps_clipboard() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a.txt");
        fs::write(&src, b"data").unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir(&dest).unwrap();

        let mut clipboard = Clipboard::default();
        clipboard.copy(vec![src.clone()]);
        let outcome = engine().paste(&mut clipboard, &dest, &mut skip());

        assert_eq!(outcome.succeeded(), 1);
        assert!(clipboard.active().is_some());
        assert!(src.exists());
    }
}
