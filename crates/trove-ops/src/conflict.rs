//! Conflict detection and resolution for transfers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use trove_core::DecisionScope;

/// A transfer target that already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The source path being transferred.
    pub source: PathBuf,
    /// The destination path that is already taken.
    pub destination: PathBuf,
    /// The kind of conflict.
    pub kind: ConflictKind,
}

impl Conflict {
    /// Create a new conflict.
    pub fn new(source: PathBuf, destination: PathBuf, kind: ConflictKind) -> Self {
        Self {
            source,
            destination,
            kind,
        }
    }

    /// Build a conflict for `destination`, classifying what occupies it.
    pub fn at(source: &Path, destination: &Path) -> Self {
        let kind = if destination.is_dir() {
            ConflictKind::DirectoryExists
        } else {
            ConflictKind::FileExists
        };
        Self::new(source.to_path_buf(), destination.to_path_buf(), kind)
    }
}

/// What occupies the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// A file already exists at the destination.
    FileExists,
    /// A directory already exists at the destination.
    DirectoryExists,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileExists => write!(f, "File already exists"),
            Self::DirectoryExists => write!(f, "Directory already exists"),
        }
    }
}

/// How to resolve a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictDecision {
    /// Remove the existing item, then transfer.
    Overwrite,
    /// Transfer under a different name in the same destination directory.
    RenameAs(String),
    /// Leave both items alone.
    Skip,
    /// Stop the batch. Items already transferred stay where they are.
    Abort,
}

/// Information handed to a resolver alongside the conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveContext {
    /// More than one source in this transfer.
    pub is_batch: bool,
    /// Whether the answer will be reused for later conflicts.
    pub scope: DecisionScope,
    /// Zero on the first prompt for this item; incremented each time a
    /// proposed `RenameAs` name was empty, invalid, or also taken.
    pub attempt: u32,
}

impl ResolveContext {
    /// Check if the decision will be cached for the rest of the batch.
    pub fn applies_to_all(&self) -> bool {
        self.is_batch && self.scope == DecisionScope::ApplyToAll
    }
}

/// Decides what to do when a transfer target already exists.
///
/// Only called when the destination exists. For a single-item transfer the
/// useful answers are Overwrite, RenameAs and Abort; in a batch with
/// [`DecisionScope::ApplyToAll`] the first Overwrite, Skip or Abort is reused
/// for every later conflict without calling the resolver again.
pub trait ConflictResolver {
    fn resolve(&mut self, conflict: &Conflict, context: ResolveContext) -> ConflictDecision;
}

impl<F> ConflictResolver for F
where
    F: FnMut(&Conflict, ResolveContext) -> ConflictDecision,
{
    fn resolve(&mut self, conflict: &Conflict, context: ResolveContext) -> ConflictDecision {
        self(conflict, context)
    }
}

/// Answers every conflict with the same decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedResolver(pub ConflictDecision);

impl ConflictResolver for FixedResolver {
    fn resolve(&mut self, _conflict: &Conflict, _context: ResolveContext) -> ConflictDecision {
        self.0.clone()
    }
}

/// Keeps both items by giving the incoming one a free `name (n).ext` name.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoRenameResolver;

impl ConflictResolver for AutoRenameResolver {
    fn resolve(&mut self, conflict: &Conflict, _context: ResolveContext) -> ConflictDecision {
        let renamed = auto_rename_path(&conflict.destination);
        let name = renamed
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ConflictDecision::RenameAs(name)
    }
}

/// Per-batch memory of an "apply to all" decision.
#[derive(Debug)]
pub(crate) struct BatchPolicy {
    scope: DecisionScope,
    is_batch: bool,
    cached: Option<ConflictDecision>,
}

impl BatchPolicy {
    pub(crate) fn new(scope: DecisionScope, item_count: usize) -> Self {
        Self {
            scope,
            is_batch: item_count > 1,
            cached: None,
        }
    }

    /// Get the decision for `conflict`, consulting the resolver only when
    /// no batch-wide decision has been made yet.
    ///
    /// `RenameAs` is never cached: a single name cannot serve several items.
    pub(crate) fn decide(
        &mut self,
        conflict: &Conflict,
        resolver: &mut dyn ConflictResolver,
        attempt: u32,
    ) -> ConflictDecision {
        if let Some(decision) = &self.cached {
            return decision.clone();
        }

        let context = ResolveContext {
            is_batch: self.is_batch,
            scope: self.scope,
            attempt,
        };
        let decision = resolver.resolve(conflict, context);

        if context.applies_to_all() && !matches!(decision, ConflictDecision::RenameAs(_)) {
            self.cached = Some(decision.clone());
        }
        decision
    }
}

/// Generate an auto-renamed path to avoid conflicts.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc.
pub fn auto_rename_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let extension = path.extension().and_then(|e| e.to_str());

    let candidate = |suffix: String| match extension {
        Some(ext) => parent.join(format!("{stem} ({suffix}).{ext}")),
        None => parent.join(format!("{stem} ({suffix})")),
    };

    for i in 1..1000 {
        let new_path = candidate(i.to_string());
        if new_path.symlink_metadata().is_err() {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    candidate(timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> Conflict {
        Conflict::new(
            PathBuf::from("/src/a.txt"),
            PathBuf::from("/dst/a.txt"),
            ConflictKind::FileExists,
        )
    }

    #[test]
    fn test_auto_rename_path() {
        let path = PathBuf::from("/tmp/test.txt");
        let renamed = auto_rename_path(&path);
        assert!(renamed.to_string_lossy().contains("test (1).txt"));
    }

    #[test]
    fn test_auto_rename_no_extension() {
        let path = PathBuf::from("/tmp/testfile");
        let renamed = auto_rename_path(&path);
        assert!(renamed.to_string_lossy().contains("testfile (1)"));
    }

    #[test]
    fn test_auto_rename_skips_taken_names() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"").unwrap();
        std::fs::write(tmp.path().join("a (1).txt"), b"").unwrap();

        let renamed = auto_rename_path(&tmp.path().join("a.txt"));
        assert_eq!(renamed, tmp.path().join("a (2).txt"));
    }

    #[test]
    fn test_policy_caches_in_batch() {
        let mut calls = 0;
        let mut resolver = |_: &Conflict, ctx: ResolveContext| {
            calls += 1;
            assert!(ctx.is_batch);
            ConflictDecision::Overwrite
        };

        let mut policy = BatchPolicy::new(DecisionScope::ApplyToAll, 3);
        for _ in 0..3 {
            assert_eq!(policy.decide(&conflict(), &mut resolver, 0), ConflictDecision::Overwrite);
        }
        assert_eq!(calls, 1);
    }

    fn count_calls(policy: &mut BatchPolicy, decision: ConflictDecision) -> usize {
        let mut calls = 0;
        let mut resolver = |_: &Conflict, _: ResolveContext| {
            calls += 1;
            decision.clone()
        };
        policy.decide(&conflict(), &mut resolver, 0);
        policy.decide(&conflict(), &mut resolver, 0);
        calls
    }

    #[test]
    fn test_policy_single_item_not_cached() {
        let mut policy = BatchPolicy::new(DecisionScope::ApplyToAll, 1);
        assert_eq!(count_calls(&mut policy, ConflictDecision::Skip), 2);
    }

    #[test]
    fn test_policy_per_item_scope() {
        let mut policy = BatchPolicy::new(DecisionScope::PerItem, 5);
        assert_eq!(count_calls(&mut policy, ConflictDecision::Overwrite), 2);
    }

    #[test]
    fn test_policy_never_caches_rename() {
        let mut policy = BatchPolicy::new(DecisionScope::ApplyToAll, 2);
        let decision = ConflictDecision::RenameAs("b.txt".to_string());
        assert_eq!(count_calls(&mut policy, decision), 2);
    }

    #[test]
    fn test_auto_rename_resolver() {
        let mut resolver = AutoRenameResolver;
        let context = ResolveContext {
            is_batch: false,
            scope: DecisionScope::ApplyToAll,
            attempt: 0,
        };
        assert_eq!(
            resolver.resolve(&conflict(), context),
            ConflictDecision::RenameAs("a (1).txt".to_string())
        );
    }
}
