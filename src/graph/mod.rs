//! Graph store: insertion-ordered module records plus entry points.
//!
//! The store is an arena keyed by path. Records hold paths, never direct
//! handles to other records, so forward/inverse edge cycles are plain data
//! and release is a localized map operation.
//!
//! Iteration order of the store is part of the public contract: records
//! iterate in the order they were created, or in the canonical depth-first
//! order after [`reorder_graph`].

mod module;
mod reorder;
mod snapshot;

pub use module::Module;
pub use reorder::reorder_graph;
pub use snapshot::{GraphSnapshot, ModuleSnapshot};

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashSet;

/// The dependency graph of a bundle: every module reachable from the entry
/// points, with ordered forward edges and inverse-edge bookkeeping.
///
/// Mutation happens only through the traversal engine; between traversal
/// calls the graph is read-only.
#[derive(Debug)]
pub struct Graph<T> {
    /// path → record, in creation order. Iteration order is observable.
    dependencies: IndexMap<PathBuf, Module<T>>,
    /// Declared roots, in caller order. Immune to reference-count release.
    entry_points: IndexSet<PathBuf>,
}

impl<T> Graph<T> {
    /// Create an empty graph rooted at the given entry points.
    pub fn with_entry_points(entry_points: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dependencies: IndexMap::new(),
            entry_points: entry_points.into_iter().collect(),
        }
    }

    /// Declared entry paths, in caller order.
    #[inline]
    pub fn entry_points(&self) -> &IndexSet<PathBuf> {
        &self.entry_points
    }

    /// True if `path` was declared as a root.
    #[inline]
    pub fn is_entry_point(&self, path: &Path) -> bool {
        self.entry_points.contains(path)
    }

    /// Declare another root between traversals. The next incremental
    /// traversal that lists it as dirty will expand it.
    pub fn add_entry_point(&mut self, path: PathBuf) {
        self.entry_points.insert(path);
    }

    /// Look up a module record by path.
    #[inline]
    pub fn get(&self, path: &Path) -> Option<&Module<T>> {
        self.dependencies.get(path)
    }

    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.dependencies.contains_key(path)
    }

    /// Number of modules currently in the graph.
    #[inline]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Iterate records in store order.
    pub fn modules(&self) -> impl Iterator<Item = &Module<T>> {
        self.dependencies.values()
    }

    /// Iterate module paths in store order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.dependencies.keys().map(PathBuf::as_path)
    }

    /// Direct referrers of `path`: the modules whose dependency list
    /// currently targets it.
    pub fn inverse_dependencies_of(&self, path: &Path) -> Option<&FxHashSet<PathBuf>> {
        self.dependencies
            .get(path)
            .map(Module::inverse_dependencies)
    }

    /// Every module that transitively imports `path`, in store order per
    /// breadth level. Watch-mode callers use this to turn one changed file
    /// into a dirty set. The module itself is not included.
    pub fn transitive_dependents(&self, path: &Path) -> Vec<PathBuf> {
        let mut seen = FxHashSet::default();
        seen.insert(path.to_path_buf());
        let mut out = Vec::new();
        let mut queue = VecDeque::from([path.to_path_buf()]);

        while let Some(current) = queue.pop_front() {
            let Some(module) = self.get(&current) else {
                continue;
            };
            // Inverse sets are unordered; walk referrers in store order so
            // the result is stable.
            let mut referrers: Vec<&PathBuf> = module.inverse_dependencies().iter().collect();
            referrers.sort_by_key(|r| self.dependencies.get_index_of(r.as_path()));

            for referrer in referrers {
                if seen.insert(referrer.clone()) {
                    out.push(referrer.clone());
                    queue.push_back(referrer.clone());
                }
            }
        }
        out
    }

    // =========================================================================
    // Engine-only mutation
    // =========================================================================

    pub(crate) fn get_mut(&mut self, path: &Path) -> Option<&mut Module<T>> {
        self.dependencies.get_mut(path)
    }

    /// Append a freshly created record. Its store position is its creation
    /// slot and stays fixed until [`reorder_graph`].
    pub(crate) fn insert(&mut self, module: Module<T>) {
        self.dependencies.insert(module.path().to_path_buf(), module);
    }

    /// Remove a record, preserving the store order of the remainder.
    pub(crate) fn remove(&mut self, path: &Path) -> Option<Module<T>> {
        self.dependencies.shift_remove(path)
    }

    /// Drop every record. Entry points are caller state and survive.
    pub(crate) fn clear(&mut self) {
        self.dependencies.clear();
    }

    pub(crate) fn index_of(&self, path: &Path) -> Option<usize> {
        self.dependencies.get_index_of(path)
    }

    /// Replace the store with a reordered map. Used by [`reorder_graph`].
    pub(crate) fn replace_store(&mut self, dependencies: IndexMap<PathBuf, Module<T>>) {
        self.dependencies = dependencies;
    }

    pub(crate) fn take_store(&mut self) -> IndexMap<PathBuf, Module<T>> {
        std::mem::take(&mut self.dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    fn insert_module(graph: &mut Graph<()>, p: &str, deps: &[(&str, &str)]) {
        let mut module = Module::new(path(p), ());
        module.set_dependencies(
            deps.iter()
                .map(|(name, target)| (name.to_string(), path(target)))
                .collect(),
        );
        graph.insert(module);
    }

    #[test]
    fn store_iterates_in_insertion_order() {
        let mut graph = Graph::with_entry_points([path("/bundle")]);
        insert_module(&mut graph, "/bundle", &[]);
        insert_module(&mut graph, "/foo", &[]);
        insert_module(&mut graph, "/bar", &[]);

        let order: Vec<_> = graph.paths().map(Path::to_path_buf).collect();
        assert_eq!(order, vec![path("/bundle"), path("/foo"), path("/bar")]);
    }

    #[test]
    fn remove_preserves_order_of_remainder() {
        let mut graph = Graph::with_entry_points([path("/a")]);
        insert_module(&mut graph, "/a", &[]);
        insert_module(&mut graph, "/b", &[]);
        insert_module(&mut graph, "/c", &[]);

        graph.remove(&path("/b"));

        let order: Vec<_> = graph.paths().map(Path::to_path_buf).collect();
        assert_eq!(order, vec![path("/a"), path("/c")]);
    }

    #[test]
    fn entry_points_keep_caller_order() {
        let graph: Graph<()> = Graph::with_entry_points([path("/b"), path("/a")]);
        let entries: Vec<_> = graph.entry_points().iter().cloned().collect();
        assert_eq!(entries, vec![path("/b"), path("/a")]);
        assert!(graph.is_entry_point(&path("/a")));
        assert!(!graph.is_entry_point(&path("/c")));
    }

    #[test]
    fn transitive_dependents_walks_inverse_edges() {
        // /bundle → /foo → /shared, /other → /shared
        let mut graph = Graph::with_entry_points([path("/bundle"), path("/other")]);
        insert_module(&mut graph, "/bundle", &[("./foo", "/foo")]);
        insert_module(&mut graph, "/foo", &[("./shared", "/shared")]);
        insert_module(&mut graph, "/shared", &[]);
        insert_module(&mut graph, "/other", &[("./shared", "/shared")]);

        graph.get_mut(&path("/foo")).unwrap().add_inverse(path("/bundle"));
        graph.get_mut(&path("/shared")).unwrap().add_inverse(path("/foo"));
        graph.get_mut(&path("/shared")).unwrap().add_inverse(path("/other"));

        let dependents = graph.transitive_dependents(&path("/shared"));
        assert_eq!(dependents, vec![path("/foo"), path("/other"), path("/bundle")]);
    }

    #[test]
    fn transitive_dependents_terminates_on_cycles() {
        let mut graph = Graph::with_entry_points([path("/a")]);
        insert_module(&mut graph, "/a", &[("./b", "/b")]);
        insert_module(&mut graph, "/b", &[("./a", "/a")]);
        graph.get_mut(&path("/b")).unwrap().add_inverse(path("/a"));
        graph.get_mut(&path("/a")).unwrap().add_inverse(path("/b"));

        let dependents = graph.transitive_dependents(&path("/a"));
        assert_eq!(dependents, vec![path("/b")]);
    }
}
