//! Bulk rename: a small rule language, a pure preview, and a batch apply.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trove_core::OpError;

use crate::batch::{BatchOutcome, BatchResult, Interruption};
use crate::fs_util;
use crate::progress::{BatchControl, OperationProgress, OperationType};

/// How to derive a new name from an old one.
///
/// Every rule is a pure function of the old name and its 1-based position
/// in the batch; none of them look at the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenameRule {
    /// Put text in front of the name.
    AddPrefix(String),
    /// Put text after the stem, before the extension.
    AddSuffix(String),
    /// Replace every occurrence of `find`.
    FindReplace { find: String, replace: String },
    /// Delete every occurrence of a literal pattern.
    RemovePattern(String),
    /// Replace the stem with a zero-padded counter, keeping the extension.
    Numbering { start: u64, pad_width: usize },
    /// Build the name from `{name}` (stem), `{ext}` (extension without the
    /// dot) and `{n}` (position). `.{ext}` disappears for names without an
    /// extension.
    Template(String),
}

impl RenameRule {
    /// Compute the new name for `old_name` at 1-based `position`.
    pub fn apply(&self, old_name: &str, position: usize) -> String {
        let (stem, ext) = split_name(old_name);
        let dotted_ext = ext.map(|e| format!(".{e}")).unwrap_or_default();

        match self {
            Self::AddPrefix(prefix) => format!("{prefix}{old_name}"),
            Self::AddSuffix(suffix) => format!("{stem}{suffix}{dotted_ext}"),
            Self::FindReplace { find, replace } => {
                if find.is_empty() {
                    old_name.to_string()
                } else {
                    old_name.replace(find.as_str(), replace)
                }
            }
            Self::RemovePattern(pattern) => {
                if pattern.is_empty() {
                    old_name.to_string()
                } else {
                    old_name.replace(pattern.as_str(), "")
                }
            }
            Self::Numbering { start, pad_width } => {
                let number = start.saturating_add(position.saturating_sub(1) as u64);
                let width = *pad_width;
                format!("{number:0width$}{dotted_ext}")
            }
            Self::Template(template) => expand_template(template, stem, ext, position),
        }
    }
}

/// Expand `{name}`, `{ext}` and `{n}` in one left-to-right pass, so text
/// taken from the old name is copied as-is and never expanded again.
fn expand_template(template: &str, stem: &str, ext: Option<&str>, position: usize) -> String {
    let mut out = String::with_capacity(template.len() + stem.len());
    let mut rest = template;

    while !rest.is_empty() {
        if ext.is_none() {
            if let Some(tail) = rest.strip_prefix(".{ext}") {
                rest = tail;
                continue;
            }
        }

        if let Some(tail) = rest.strip_prefix("{name}") {
            out.push_str(stem);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("{ext}") {
            out.push_str(ext.unwrap_or(""));
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("{n}") {
            out.push_str(&position.to_string());
            rest = tail;
        } else {
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                out.push(ch);
            }
            rest = chars.as_str();
        }
    }

    out
}

/// Split a file name into stem and extension. A leading dot is part of the
/// stem, so ".bashrc" has no extension.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// One line of a rename preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePreview {
    pub path: PathBuf,
    pub old_name: String,
    pub new_name: String,
}

impl RenamePreview {
    /// Check if the rule leaves this name as it is.
    pub fn is_unchanged(&self) -> bool {
        self.old_name == self.new_name
    }
}

/// Compute the new name of every path without touching the filesystem.
///
/// Calling this twice on the same input gives the same output.
pub fn preview(paths: &[PathBuf], rule: &RenameRule) -> Vec<RenamePreview> {
    paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let old_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let new_name = rule.apply(&old_name, index + 1);
            RenamePreview {
                path: path.clone(),
                old_name,
                new_name,
            }
        })
        .collect()
}

/// Applies rename rules to batches of paths.
///
/// Each path is renamed within its own directory. An existing target is
/// never overwritten: the item is skipped and recorded instead.
#[derive(Debug, Default)]
pub struct RenameEngine {
    control: BatchControl,
}

impl RenameEngine {
    /// Create an engine with no progress sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach cancellation and progress hooks.
    pub fn with_control(mut self, control: BatchControl) -> Self {
        self.control = control;
        self
    }

    /// Compute the new names without touching the filesystem.
    pub fn preview(&self, paths: &[PathBuf], rule: &RenameRule) -> Vec<RenamePreview> {
        preview(paths, rule)
    }

    /// Rename every path according to `rule`.
    ///
    /// Items that are not renamed are recorded as failures:
    /// - the rule produced an empty name: [`OpError::EmptyName`]
    /// - the rule left the name unchanged: [`OpError::NoOpTarget`]
    /// - the new name is not a valid file name: [`OpError::InvalidName`]
    /// - something already exists under the new name: [`OpError::AlreadyExists`]
    pub fn apply(&mut self, paths: &[PathBuf], rule: &RenameRule) -> BatchOutcome {
        let mut result = BatchResult::new(OperationType::Rename);
        let mut progress = OperationProgress::new(OperationType::Rename, paths.len());

        for (index, item) in preview(paths, rule).into_iter().enumerate() {
            if self.control.is_cancelled() {
                if index == 0 {
                    tracing::info!(target: "rename", "rename cancelled before start");
                    return BatchOutcome::Cancelled;
                }
                result.interrupt(Interruption::Cancelled, &paths[index..]);
                break;
            }

            progress.set_current(Some(item.path.clone()));
            self.control.report(&progress);

            match rename_one(&item.path, &item.new_name) {
                Ok(()) => {
                    tracing::debug!(target: "rename", "{} -> {}", item.old_name, item.new_name);
                    result.record_success(0);
                }
                Err(error) => {
                    tracing::warn!(target: "rename", "{} not renamed: {error}", item.path.display());
                    result.record_failure(&item.path, error);
                }
            }

            progress.complete_item(0);
            self.control.report(&progress);
        }

        tracing::info!(target: "rename", "{}", result.summary());
        BatchOutcome::Completed(result)
    }
}

fn rename_one(path: &Path, new_name: &str) -> Result<(), OpError> {
    let old_name = match path.file_name() {
        Some(name) => name.to_str().ok_or_else(|| {
            OpError::InvalidName(format!("{} is not valid UTF-8", path.display()))
        })?,
        None => {
            return Err(OpError::InvalidName(format!(
                "{} has no file name",
                path.display()
            )));
        }
    };

    if new_name.is_empty() {
        return Err(OpError::EmptyName);
    }
    if new_name == old_name {
        return Err(OpError::NoOpTarget);
    }
    validate_filename(new_name).map_err(OpError::InvalidName)?;

    fs::symlink_metadata(path).map_err(|e| OpError::io_at_source(&e))?;

    let new_path = path.parent().unwrap_or(Path::new("")).join(new_name);
    if fs_util::exists(&new_path) {
        return Err(OpError::AlreadyExists);
    }

    fs::rename(path, &new_path).map_err(|e| OpError::io(&e))
}

/// Validate a single file name for use inside a directory.
pub fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 bytes)".into());
    }

    // Check for invalid characters
    let invalid_chars = ['/', '\0'];
    for c in invalid_chars {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{}'", c.escape_default()));
        }
    }

    #[cfg(target_os = "windows")]
    {
        let windows_invalid = ['\\', ':', '*', '?', '"', '<', '>', '|'];
        for c in windows_invalid {
            if name.contains(c) {
                return Err(format!("Name cannot contain '{}'", c));
            }
        }

        let reserved = [
            "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
            "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
        ];
        let upper_name = name.to_uppercase();
        let base_name = upper_name.split('.').next().unwrap_or("");
        if reserved.contains(&base_name) {
            return Err("Reserved filename".into());
        }
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    Ok(())
}
