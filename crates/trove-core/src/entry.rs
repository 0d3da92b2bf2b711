//! Filesystem entry types and path helpers.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Type of filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file, symlink, or any other non-directory node.
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// A filesystem node as seen by the host at listing time.
///
/// Entries are never cached across operations: size and timestamps are
/// re-read from disk whenever an engine needs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute, normalized path.
    pub path: PathBuf,
    /// File or directory.
    pub kind: EntryKind,
    /// Basename of `path`.
    pub name: CompactString,
}

impl Entry {
    /// Create an entry without touching the filesystem.
    pub fn new(path: impl AsRef<Path>, kind: EntryKind) -> Self {
        let path = normalize_path(path.as_ref());
        let name = path
            .file_name()
            .map(|n| CompactString::from(n.to_string_lossy()))
            .unwrap_or_default();
        Self { path, kind, name }
    }

    /// Read an entry from disk. Symlinks are not followed.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::symlink_metadata(path)?;
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Ok(Self::new(path, kind))
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// List the children of `dir`, directories first, then by name.
///
/// Children that vanish between `read_dir` and `stat` are silently dropped.
pub fn list_directory(dir: impl AsRef<Path>) -> io::Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| Entry::from_path(entry.path()).ok())
        .collect();

    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(entries)
}

/// Lexically normalize a path: drop `.` components, resolve `..` against
/// preceding normal components and strip trailing separators.
///
/// The filesystem is not consulted, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Check whether `path` is `ancestor` itself or lies somewhere beneath it.
///
/// Both paths are canonicalized when they exist, so symlinked spellings of
/// the same directory compare equal; otherwise the lexical form is used.
pub fn is_same_or_descendant(path: &Path, ancestor: &Path) -> bool {
    let resolve = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| normalize_path(p));
    resolve(path).starts_with(resolve(ancestor))
}
