//! The breakpoint index (§4.5): `CanonicalPath -> sorted set of lines`.
//!
//! No conditions, hit counts, logpoints, or function breakpoints — those
//! are explicit Non-goals here. The whole point of this module is that
//! the hot path (every line event under `RUN`/`OVER`) costs one lookup in
//! the common case where the current path has no breakpoints at all.

use std::collections::{BTreeMap, BTreeSet};

use rdbg_core::CanonicalPath;

/// `CanonicalPath -> sorted line numbers`. A path is never present with an
/// empty line set (pruned on deletion) — this is the invariant §8 tests.
#[derive(Debug, Default)]
pub struct BreakpointIndex {
    by_path: BTreeMap<CanonicalPath, BTreeSet<u32>>,
}

impl BreakpointIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a breakpoint. Returns `true` if it was not already present.
    pub fn insert(&mut self, path: CanonicalPath, line: u32) -> bool {
        self.by_path.entry(path).or_default().insert(line)
    }

    /// Remove a breakpoint, pruning the path entry if it becomes empty.
    /// Returns `true` if a breakpoint was actually removed.
    pub fn remove(&mut self, path: &CanonicalPath, line: u32) -> bool {
        let Some(lines) = self.by_path.get_mut(path) else {
            return false;
        };
        let removed = lines.remove(&line);
        if lines.is_empty() {
            self.by_path.remove(path);
        }
        removed
    }

    /// Whether `(path, line)` is a breakpoint. The hot-path query: a
    /// `BTreeMap::get` miss here is the common case and costs one
    /// `O(log P)` probe with no allocation.
    pub fn contains(&self, path: &CanonicalPath, line: u32) -> bool {
        self.by_path
            .get(path)
            .is_some_and(|lines| lines.contains(&line))
    }

    /// Whether the index holds no breakpoints at all — drives the `RUN`
    /// hook-disable optimization.
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// All breakpoints in `(path, line)` lexicographic order, as `lb`
    /// reports them.
    pub fn list_sorted(&self) -> Vec<(&CanonicalPath, u32)> {
        self.by_path
            .iter()
            .flat_map(|(path, lines)| lines.iter().map(move |&line| (path, line)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> CanonicalPath {
        CanonicalPath::from_trusted(s)
    }

    #[test]
    fn insert_and_contains() {
        let mut idx = BreakpointIndex::new();
        assert!(idx.insert(p("a.lua"), 3));
        assert!(idx.contains(&p("a.lua"), 3));
        assert!(!idx.contains(&p("a.lua"), 4));
    }

    #[test]
    fn empty_line_set_is_pruned() {
        let mut idx = BreakpointIndex::new();
        idx.insert(p("a.lua"), 1);
        idx.insert(p("a.lua"), 3);
        idx.insert(p("b.lua"), 2);

        assert!(idx.remove(&p("a.lua"), 1));
        assert!(idx.remove(&p("a.lua"), 3));
        assert!(!idx.is_empty());

        let listing = idx.list_sorted();
        assert!(listing.iter().all(|(path, _)| path.as_str() != "a.lua"));
    }

    #[test]
    fn list_sorted_by_path_then_line() {
        let mut idx = BreakpointIndex::new();
        idx.insert(p("a.lua"), 3);
        idx.insert(p("a.lua"), 1);
        idx.insert(p("b.lua"), 2);

        let listing: Vec<(String, u32)> = idx
            .list_sorted()
            .into_iter()
            .map(|(p, l)| (p.as_str().to_string(), l))
            .collect();
        assert_eq!(
            listing,
            vec![
                ("a.lua".to_string(), 1),
                ("a.lua".to_string(), 3),
                ("b.lua".to_string(), 2),
            ]
        );
    }

    #[test]
    fn removing_unknown_breakpoint_is_a_no_op() {
        let mut idx = BreakpointIndex::new();
        assert!(!idx.remove(&p("a.lua"), 1));
    }
}
