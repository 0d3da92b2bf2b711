use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use trove_core::{
    Clipboard, ClipboardKind, DecisionScope, Entry, EntryKind, OpsConfig, PathSet, Rect,
    list_directory, rubber_band_select,
};

/// Small deterministic generator so the replay test needs no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn test_path_set_matches_reference_set() {
    let pool: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("/dir/item{i}"))).collect();

    for seed in 1..20u64 {
        let mut rng = Lcg(seed);
        let mut set = PathSet::new();
        let mut reference: BTreeSet<PathBuf> = BTreeSet::new();

        for _ in 0..200 {
            let path = &pool[(rng.next() % pool.len() as u64) as usize];
            match rng.next() % 3 {
                0 => {
                    set.add(path);
                    reference.insert(path.clone());
                }
                1 => {
                    set.remove(path);
                    reference.remove(path);
                }
                _ => {
                    set.toggle(path);
                    if !reference.remove(path) {
                        reference.insert(path.clone());
                    }
                }
            }
            assert_eq!(set.members(), &reference, "seed {seed}");
        }
    }
}

#[test]
fn test_selection_events_track_every_mutation() {
    let mut set = PathSet::new();
    set.add("/a");
    set.toggle("/b");
    set.remove("/missing");

    let events = set.drain_events();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.last().unwrap().paths,
        vec![PathBuf::from("/a"), PathBuf::from("/b")]
    );
}

#[test]
fn test_rubber_band_without_hits_clears() {
    let a = PathBuf::from("/d/a");
    let layout = [(a.as_path(), Rect::new(0.0, 0.0, 10.0, 10.0))];

    let mut set = PathSet::new();
    set.add(&a);
    rubber_band_select(&mut set, &Rect::new(100.0, 100.0, 5.0, 5.0), layout, false);
    assert!(set.is_empty());
}

#[test]
fn test_clipboard_history_default_capacity() {
    let mut clipboard = Clipboard::default();
    assert_eq!(clipboard.capacity(), 50);

    for i in 0..60 {
        clipboard.copy(vec![PathBuf::from(format!("/f{i}"))]);
    }
    assert_eq!(clipboard.history_len(), 50);

    let newest = clipboard.recall(0).unwrap();
    assert_eq!(newest.operation.kind, ClipboardKind::Copy);
    assert_eq!(newest.operation.paths, vec![PathBuf::from("/f59")]);
}

#[test]
fn test_entry_from_path() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("sub");
    fs::create_dir(&dir).unwrap();
    fs::write(tmp.path().join("file.txt"), b"data").unwrap();

    let entry = Entry::from_path(&dir).unwrap();
    assert_eq!(entry.kind, EntryKind::Directory);
    assert_eq!(entry.name, "sub");

    let listing = list_directory(tmp.path()).unwrap();
    assert_eq!(listing.len(), 2);
    assert!(Entry::from_path(tmp.path().join("missing")).is_err());
}

#[test]
fn test_config_builder_defaults() {
    let config = OpsConfig::builder().build().unwrap();
    assert_eq!(config.batch_scope, DecisionScope::ApplyToAll);
    assert_eq!(config.clipboard_history, 50);
    assert!(config.preserve_metadata);
}
