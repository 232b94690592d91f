//! Canonical depth-first ordering of the graph store.

use std::path::PathBuf;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use super::Graph;

/// Rewrite the store's iteration order to the depth-first pre-order
/// visitation rooted at the entry points: entries in declaration order,
/// each record's children in its dependency order, already-visited records
/// skipped.
///
/// Records unreachable from any entry are dropped from the rewritten map.
/// Idempotent: reordering an already-canonical graph changes nothing.
pub fn reorder_graph<T>(graph: &mut Graph<T>) {
    let mut order: Vec<PathBuf> = Vec::with_capacity(graph.len());
    let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
    let mut stack: Vec<PathBuf> = Vec::new();

    for entry in graph.entry_points() {
        stack.push(entry.clone());
        while let Some(path) = stack.pop() {
            if !visited.insert(path.clone()) {
                continue;
            }
            let Some(module) = graph.get(&path) else {
                // Tolerate entries (or edges) with no record; nothing to visit.
                continue;
            };
            order.push(path);
            // Push children reversed so the first dependency pops first.
            for target in module.dependencies().values().rev() {
                if !visited.contains(target) {
                    stack.push(target.clone());
                }
            }
        }
    }

    let mut old = graph.take_store();
    let mut reordered: IndexMap<PathBuf, _> = IndexMap::with_capacity(order.len());
    for path in order {
        if let Some(module) = old.swap_remove(&path) {
            reordered.insert(path, module);
        }
    }
    // Whatever is left in `old` was unreachable and is dropped here.
    graph.replace_store(reordered);
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::super::Module;
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

    fn key_order(graph: &Graph<()>) -> Vec<PathBuf> {
        graph.paths().map(Path::to_path_buf).collect()
    }

    #[test]
    fn rewrites_to_depth_first_preorder() {
        // Store order is scrambled on purpose; /a → /0 → {/1, /2}, /1 → /2,
        // /b → /3.
        let mut graph = Graph::with_entry_points([path("/a"), path("/b")]);
        insert_module(&mut graph, "/2", &[]);
        insert_module(&mut graph, "/b", &[("./3", "/3")]);
        insert_module(&mut graph, "/0", &[("./1", "/1"), ("./2", "/2")]);
        insert_module(&mut graph, "/a", &[("./0", "/0")]);
        insert_module(&mut graph, "/3", &[]);
        insert_module(&mut graph, "/1", &[("./2", "/2")]);

        reorder_graph(&mut graph);

        assert_eq!(
            key_order(&graph),
            vec![path("/a"), path("/0"), path("/1"), path("/2"), path("/b"), path("/3")]
        );
    }

    #[test]
    fn reorder_is_idempotent() {
        let mut graph = Graph::with_entry_points([path("/a")]);
        insert_module(&mut graph, "/b", &[]);
        insert_module(&mut graph, "/a", &[("./b", "/b")]);

        reorder_graph(&mut graph);
        let first = key_order(&graph);
        reorder_graph(&mut graph);
        assert_eq!(key_order(&graph), first);
    }

    #[test]
    fn unreachable_records_are_pruned() {
        let mut graph = Graph::with_entry_points([path("/a")]);
        insert_module(&mut graph, "/a", &[]);
        insert_module(&mut graph, "/orphan", &[]);

        reorder_graph(&mut graph);

        assert_eq!(key_order(&graph), vec![path("/a")]);
        assert!(!graph.contains(&path("/orphan")));
    }

    #[test]
    fn cycles_terminate() {
        let mut graph = Graph::with_entry_points([path("/a")]);
        insert_module(&mut graph, "/a", &[("./b", "/b")]);
        insert_module(&mut graph, "/b", &[("./a", "/a")]);

        reorder_graph(&mut graph);

        assert_eq!(key_order(&graph), vec![path("/a"), path("/b")]);
    }

    #[test]
    fn missing_entry_is_tolerated() {
        let mut graph = Graph::with_entry_points([path("/gone"), path("/a")]);
        insert_module(&mut graph, "/a", &[]);

        reorder_graph(&mut graph);

        assert_eq!(key_order(&graph), vec![path("/a")]);
    }
}
