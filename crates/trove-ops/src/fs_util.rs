//! Filesystem primitives used by the engines.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use trove_core::normalize_path;

/// How entries are copied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CopyOptions {
    pub preserve_metadata: bool,
    pub follow_symlinks: bool,
}

/// A followed link led back into a directory that is already being copied,
/// or into the copy itself.
#[derive(Debug)]
pub(crate) struct CopyCycle(pub PathBuf);

impl fmt::Display for CopyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} leads back into the tree being copied", self.0.display())
    }
}

impl std::error::Error for CopyCycle {}

/// Check whether a copy failed because it would have copied into itself.
pub(crate) fn is_copy_cycle(error: &io::Error) -> bool {
    error.get_ref().is_some_and(|inner| inner.is::<CopyCycle>())
}

/// Copy a file, directory tree or symlink to `dest`, which must not exist.
///
/// Returns the number of bytes written. On failure whatever this call
/// wrote to `dest` is removed again.
pub(crate) fn copy_entry(source: &Path, dest: &Path, options: CopyOptions) -> io::Result<u64> {
    let mut walk = CopyWalk {
        options,
        ancestors: Vec::new(),
        output_root: None,
    };

    let occupied = exists(dest);
    walk.copy(source, dest).inspect_err(|e| {
        if !occupied && exists(dest) {
            tracing::debug!(target: "transfer", "removing partial copy {}: {e}", dest.display());
            let _ = remove_path(dest);
        }
    })
}

/// State of one recursive copy.
///
/// Only tracked when links are followed: a plain walk cannot revisit a
/// directory, a followed one can.
struct CopyWalk {
    options: CopyOptions,
    /// Canonical paths of the source directories currently open.
    ancestors: Vec<PathBuf>,
    /// Canonical path of the top-level directory being written.
    output_root: Option<PathBuf>,
}

impl CopyWalk {
    fn copy(&mut self, source: &Path, dest: &Path) -> io::Result<u64> {
        let metadata = if self.options.follow_symlinks {
            fs::metadata(source)?
        } else {
            fs::symlink_metadata(source)?
        };

        if metadata.file_type().is_symlink() {
            self.copy_link(source, dest)
        } else if metadata.is_dir() {
            self.copy_dir(source, dest)
        } else {
            copy_file(source, dest, self.options)
        }
    }

    #[cfg(unix)]
    fn copy_link(&mut self, source: &Path, dest: &Path) -> io::Result<u64> {
        let target = fs::read_link(source)?;
        std::os::unix::fs::symlink(target, dest)?;
        Ok(0)
    }

    /// Without unix symlinks the link is copied as what it points to.
    #[cfg(not(unix))]
    fn copy_link(&mut self, source: &Path, dest: &Path) -> io::Result<u64> {
        let followed = CopyOptions {
            follow_symlinks: true,
            ..self.options
        };
        let saved = std::mem::replace(&mut self.options, followed);
        let result = self.copy(source, dest);
        self.options = saved;
        result
    }

    /// Recursively copy a directory.
    fn copy_dir(&mut self, source: &Path, dest: &Path) -> io::Result<u64> {
        let tracked = self.options.follow_symlinks;
        if tracked {
            let canonical = fs::canonicalize(source)?;
            let inside_output = self
                .output_root
                .as_ref()
                .is_some_and(|root| canonical.starts_with(root));
            if inside_output || self.ancestors.contains(&canonical) {
                return Err(io::Error::other(CopyCycle(source.to_path_buf())));
            }
            self.ancestors.push(canonical);
        }

        let result = self.copy_children(source, dest);
        if tracked {
            self.ancestors.pop();
        }
        let total_bytes = result?;

        // Children bump the directory's mtime, so restore it last.
        if self.options.preserve_metadata {
            if let Ok(metadata) = fs::metadata(source) {
                if let Err(e) = fs::set_permissions(dest, metadata.permissions()) {
                    tracing::debug!(target: "transfer", "keeping default permissions on {}: {e}", dest.display());
                }
            }
            preserve_times(source, dest);
        }

        Ok(total_bytes)
    }

    fn copy_children(&mut self, source: &Path, dest: &Path) -> io::Result<u64> {
        fs::create_dir(dest)?;
        if self.options.follow_symlinks && self.output_root.is_none() {
            self.output_root = Some(fs::canonicalize(dest)?);
        }

        let mut total_bytes = 0u64;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            total_bytes += self.copy(&entry.path(), &dest.join(entry.file_name()))?;
        }
        Ok(total_bytes)
    }
}

/// Copy a single file. `fs::copy` carries permission bits across.
fn copy_file(source: &Path, dest: &Path, options: CopyOptions) -> io::Result<u64> {
    let bytes = fs::copy(source, dest)?;
    if options.preserve_metadata {
        preserve_times(source, dest);
    }
    Ok(bytes)
}

/// Copy access and modification times. Failures are logged, not returned:
/// some filesystems cannot store them.
fn preserve_times(source: &Path, dest: &Path) {
    let Ok(metadata) = fs::metadata(source) else {
        return;
    };
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(e) = filetime::set_file_times(dest, atime, mtime) {
        tracing::debug!(target: "transfer", "could not preserve times on {}: {e}", dest.display());
    }
}

/// Remove a file, symlink or whole directory tree.
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Move an entry, renaming in place when possible and falling back to
/// copy-then-delete across filesystems.
///
/// Returns the number of bytes moved.
pub(crate) fn move_entry(source: &Path, dest: &Path, options: CopyOptions) -> io::Result<u64> {
    let size = entry_size(source);

    match fs::rename(source, dest) {
        Ok(()) => Ok(size),
        Err(e) if is_cross_device(&e) => {
            tracing::debug!(
                target: "transfer",
                "{} is on another filesystem; copying instead",
                dest.display()
            );
            let options = CopyOptions {
                preserve_metadata: true,
                ..options
            };
            copy_entry(source, dest, options)?;
            remove_path(source).inspect_err(|e| {
                tracing::warn!(
                    target: "transfer",
                    "copied {} to {} but could not remove the source ({e}); both now exist",
                    source.display(),
                    dest.display()
                );
            })?;
            Ok(size)
        }
        Err(e) => Err(e),
    }
}

fn is_cross_device(error: &io::Error) -> bool {
    // EXDEV on unix, ERROR_NOT_SAME_DEVICE on Windows.
    let raw_cross_device = if cfg!(windows) { 17 } else { 18 };
    error.kind() == io::ErrorKind::CrossesDevices || error.raw_os_error() == Some(raw_cross_device)
}

/// Get the size of a file or the total size of a directory tree.
pub(crate) fn entry_size(path: &Path) -> u64 {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return 0;
    };
    if !metadata.is_dir() {
        return metadata.len();
    }
    fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry_size(&entry.path()))
                .sum()
        })
        .unwrap_or(0)
}

/// Check whether two paths name the same filesystem location.
pub(crate) fn same_path(a: &Path, b: &Path) -> bool {
    let resolve = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| normalize_path(p));
    resolve(a) == resolve(b)
}

/// Check whether something (including a dangling symlink) occupies `path`.
pub(crate) fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
