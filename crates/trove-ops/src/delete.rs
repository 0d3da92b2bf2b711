//! Permanent and recoverable (trash) deletion.

use std::fs;
use std::path::{Path, PathBuf};

use trove_core::OpError;

use crate::batch::{BatchOutcome, BatchResult, Interruption};
use crate::fs_util;
use crate::progress::{BatchControl, OperationProgress, OperationType};

/// A recoverable-delete facility.
pub trait TrashBackend: Send {
    /// Check if this backend can trash anything at all.
    fn is_available(&self) -> bool;

    /// Move one path to the trash.
    fn trash(&self, path: &Path) -> Result<(), String>;
}

/// The platform trash (recycle bin, freedesktop trash, macOS Trash).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

impl TrashBackend for SystemTrash {
    fn is_available(&self) -> bool {
        cfg!(any(
            target_os = "windows",
            target_os = "macos",
            target_os = "linux",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        ))
    }

    #[cfg(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    fn trash(&self, path: &Path) -> Result<(), String> {
        trash::delete(path).map_err(|e| e.to_string())
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    )))]
    fn trash(&self, _path: &Path) -> Result<(), String> {
        Err(OpError::Unsupported.to_string())
    }
}

/// A backend for configurations without any trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrash;

impl TrashBackend for NoTrash {
    fn is_available(&self) -> bool {
        false
    }

    fn trash(&self, _path: &Path) -> Result<(), String> {
        Err(OpError::Unsupported.to_string())
    }
}

/// Deletes batches of paths, permanently or via a trash backend.
pub struct DeleteEngine {
    control: BatchControl,
    backend: Box<dyn TrashBackend>,
}

impl std::fmt::Debug for DeleteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteEngine")
            .field("control", &self.control)
            .field("trash_available", &self.backend.is_available())
            .finish()
    }
}

impl Default for DeleteEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DeleteEngine {
    /// Create an engine using the platform trash.
    pub fn new() -> Self {
        Self {
            control: BatchControl::new(),
            backend: Box::new(SystemTrash),
        }
    }

    /// Use a different trash backend.
    pub fn with_trash_backend(mut self, backend: impl TrashBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    /// Attach cancellation and progress hooks.
    pub fn with_control(mut self, control: BatchControl) -> Self {
        self.control = control;
        self
    }

    /// Check if `trash` can do anything on this configuration.
    pub fn trash_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Permanently delete every path. Directories are removed recursively.
    pub fn delete(&mut self, paths: &[PathBuf]) -> BatchOutcome {
        run_batch(&mut self.control, OperationType::Delete, paths, |path| {
            let bytes = fs_util::entry_size(path);
            fs_util::remove_path(path).map_err(|e| OpError::io(&e))?;
            Ok(bytes)
        })
    }

    /// Move every path to the trash.
    ///
    /// Returns [`BatchOutcome::Unsupported`] without touching anything when
    /// no trash exists; this never falls back to permanent deletion.
    pub fn trash(&mut self, paths: &[PathBuf]) -> BatchOutcome {
        if !self.backend.is_available() {
            tracing::warn!(target: "delete", "trash unavailable, refusing {} items", paths.len());
            return BatchOutcome::Unsupported;
        }

        let backend = self.backend.as_ref();
        run_batch(&mut self.control, OperationType::Trash, paths, |path| {
            let bytes = fs_util::entry_size(path);
            backend.trash(path).map_err(OpError::Io)?;
            Ok(bytes)
        })
    }
}

fn run_batch<F>(
    control: &mut BatchControl,
    operation_type: OperationType,
    paths: &[PathBuf],
    mut remove: F,
) -> BatchOutcome
where
    F: FnMut(&Path) -> Result<u64, OpError>,
{
    let mut result = BatchResult::new(operation_type);
    let mut progress = OperationProgress::new(operation_type, paths.len());

    for (index, path) in paths.iter().enumerate() {
        if control.is_cancelled() {
            if index == 0 {
                tracing::info!(target: "delete", "{operation_type} cancelled before start");
                return BatchOutcome::Cancelled;
            }
            result.interrupt(Interruption::Cancelled, &paths[index..]);
            break;
        }

        progress.set_current(Some(path.clone()));
        control.report(&progress);

        let outcome = match fs::symlink_metadata(path) {
            Ok(_) => remove(path),
            Err(e) => Err(OpError::io_at_source(&e)),
        };

        match outcome {
            Ok(bytes) => {
                tracing::debug!(target: "delete", "{operation_type} {}", path.display());
                result.record_success(bytes);
                progress.complete_item(bytes);
            }
            Err(error) => {
                tracing::warn!(target: "delete", "{operation_type} {} failed: {error}", path.display());
                result.record_failure(path, error);
                progress.complete_item(0);
            }
        }

        control.report(&progress);
    }

    tracing::info!(target: "delete", "{}", result.summary());
    BatchOutcome::Completed(result)
}
