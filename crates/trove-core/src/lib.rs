//! Core types for trove.
//!
//! This crate holds the state that outlives a single file operation: the
//! selection, the clipboard and its history, and the configuration shared
//! by the engines in `trove-ops`, together with the error taxonomy those
//! engines report.

mod clipboard;
mod config;
mod entry;
mod error;
mod selection;

pub use clipboard::{Clipboard, ClipboardKind, ClipboardOperation, HistoryEntry};
pub use config::{DecisionScope, OpsConfig, OpsConfigBuilder};
pub use entry::{Entry, EntryKind, is_same_or_descendant, list_directory, normalize_path};
pub use error::{ItemFailure, OpError};
pub use selection::{PathSet, Rect, SelectionChanged, paths_in_rect, rubber_band_select};
