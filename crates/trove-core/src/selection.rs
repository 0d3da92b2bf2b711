//! Selection state: a set of normalized absolute paths.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entry::normalize_path;

/// Notification emitted after every mutation, carrying the full set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChanged {
    /// Every selected path after the mutation, in sorted order.
    pub paths: Vec<PathBuf>,
}

/// The set of selected paths.
///
/// Paths are normalized on the way in, so `/a/./b` and `/a/b` are the same
/// member. Every mutating call queues a [`SelectionChanged`] which the host
/// picks up through [`PathSet::drain_events`].
#[derive(Debug, Clone, Default)]
pub struct PathSet {
    members: BTreeSet<PathBuf>,
    events: Vec<SelectionChanged>,
}

impl PathSet {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path.
    pub fn add(&mut self, path: impl AsRef<Path>) {
        self.members.insert(normalize_path(path.as_ref()));
        self.emit();
    }

    /// Remove a path. Removing an absent path is a no-op (the event is
    /// still emitted).
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        self.members.remove(&normalize_path(path.as_ref()));
        self.emit();
    }

    /// Remove the path if selected, otherwise add it.
    pub fn toggle(&mut self, path: impl AsRef<Path>) {
        let path = normalize_path(path.as_ref());
        if !self.members.remove(&path) {
            self.members.insert(path);
        }
        self.emit();
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.members.clear();
        self.emit();
    }

    /// Swap the whole set in one step.
    pub fn replace<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.members = paths
            .into_iter()
            .map(|p| normalize_path(p.as_ref()))
            .collect();
        self.emit();
    }

    /// Union the given paths into the set.
    pub fn extend<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.members
            .extend(paths.into_iter().map(|p| normalize_path(p.as_ref())));
        self.emit();
    }

    /// The current members.
    pub fn members(&self) -> &BTreeSet<PathBuf> {
        &self.members
    }

    /// Selected paths in sorted order, ready to hand to an engine.
    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.members.iter().cloned().collect()
    }

    /// Check if a path is selected.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.members.contains(&normalize_path(path.as_ref()))
    }

    /// Number of selected paths.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Take the queued change notifications, oldest first.
    pub fn drain_events(&mut self) -> Vec<SelectionChanged> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self) {
        self.events.push(SelectionChanged {
            paths: self.to_vec(),
        });
    }
}

/// An axis-aligned screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle spanning two corner points in any order, as
    /// produced by a drag that may go up or left.
    pub fn from_points(a: (f32, f32), b: (f32, f32)) -> Self {
        let (x0, x1) = if a.0 <= b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let (y0, y1) = if a.1 <= b.1 { (a.1, b.1) } else { (b.1, a.1) };
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check whether two rectangles overlap. Rectangles that merely share
    /// an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Paths whose on-screen rectangle intersects `drag`.
pub fn paths_in_rect<'a, I>(drag: &Rect, layout: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = (&'a Path, Rect)>,
{
    layout
        .into_iter()
        .filter(|(_, rect)| drag.intersects(rect))
        .map(|(path, _)| path.to_path_buf())
        .collect()
}

/// Apply one frame of rubber-band selection.
///
/// Without the modifier the selection becomes exactly the hit paths; with
/// it the hits are added to whatever was already selected.
pub fn rubber_band_select<'a, I>(set: &mut PathSet, drag: &Rect, layout: I, additive: bool)
where
    I: IntoIterator<Item = (&'a Path, Rect)>,
{
    let hits = paths_in_rect(drag, layout);
    if additive {
        set.extend(hits);
    } else {
        set.replace(hits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let mut set = PathSet::new();
        set.toggle("/a");
        assert!(set.contains("/a"));
        set.toggle("/a");
        assert!(!set.contains("/a"));
    }

    #[test]
    fn test_normalized_uniqueness() {
        let mut set = PathSet::new();
        set.add("/home/user/./docs");
        set.add("/home/user/docs/");
        assert_eq!(set.len(), 1);
        assert!(set.contains("/home/user/tmp/../docs"));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut set = PathSet::new();
        set.add("/a");
        set.remove("/b");
        assert_eq!(set.to_vec(), vec![PathBuf::from("/a")]);
    }

    #[test]
    fn test_every_mutation_emits_full_set() {
        let mut set = PathSet::new();
        set.add("/a");
        set.add("/b");
        set.replace(["/c"]);
        set.clear();

        let events = set.drain_events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].paths, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(events[2].paths, vec![PathBuf::from("/c")]);
        assert!(events[3].paths.is_empty());
        assert!(set.drain_events().is_empty());
    }

    #[test]
    fn test_rect_from_points() {
        let rect = Rect::from_points((10.0, 20.0), (0.0, 5.0));
        assert_eq!(rect, Rect::new(0.0, 5.0, 10.0, 15.0));
    }

    #[test]
    fn test_rect_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.0, 9.0, 5.0, 5.0)));
    }

    #[test]
    fn test_rubber_band_replace_and_union() {
        let a = PathBuf::from("/d/a");
        let b = PathBuf::from("/d/b");
        let c = PathBuf::from("/d/c");
        let layout = [
            (a.as_path(), Rect::new(0.0, 0.0, 50.0, 20.0)),
            (b.as_path(), Rect::new(0.0, 20.0, 50.0, 20.0)),
            (c.as_path(), Rect::new(0.0, 40.0, 50.0, 20.0)),
        ];

        let mut set = PathSet::new();
        set.add("/elsewhere");

        let drag = Rect::from_points((5.0, 5.0), (30.0, 25.0));
        rubber_band_select(&mut set, &drag, layout, false);
        assert_eq!(set.to_vec(), vec![a.clone(), b.clone()]);

        let drag = Rect::from_points((5.0, 45.0), (30.0, 50.0));
        rubber_band_select(&mut set, &drag, layout, true);
        assert_eq!(set.to_vec(), vec![a, b, c]);
    }
}
