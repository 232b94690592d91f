//! A single module record in the dependency graph.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// One discovered module: its canonical path, the ordered list of named
/// edges to other modules, the set of modules pointing back at it, and the
/// artifact its transform produced.
///
/// # Invariants
/// - `dependencies` preserves the textual order of the most recent transform
/// - A freshly constructed record has no edges in either direction
#[derive(Debug, Clone)]
pub struct Module<T> {
    path: PathBuf,
    /// Dependency name (as written in source) → resolved target path.
    dependencies: IndexMap<String, PathBuf>,
    /// Paths of modules whose dependency list targets this one.
    inverse_dependencies: FxHashSet<PathBuf>,
    /// Opaque transform artifact, stored verbatim.
    output: T,
}

impl<T> Module<T> {
    /// Create a fresh record with no edges in either direction.
    pub(crate) fn new(path: PathBuf, output: T) -> Self {
        Self {
            path,
            dependencies: IndexMap::new(),
            inverse_dependencies: FxHashSet::default(),
            output,
        }
    }

    /// Canonical path identifying this module.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Named edges to other modules, in source textual order.
    ///
    /// The same target may appear under two different names; both entries
    /// are retained.
    #[inline]
    pub fn dependencies(&self) -> &IndexMap<String, PathBuf> {
        &self.dependencies
    }

    /// Paths of the modules that currently list this one as a dependency.
    #[inline]
    pub fn inverse_dependencies(&self) -> &FxHashSet<PathBuf> {
        &self.inverse_dependencies
    }

    /// The transform artifact for this module.
    #[inline]
    pub fn output(&self) -> &T {
        &self.output
    }

    /// True if any edge, under any name, targets `path`.
    pub fn depends_on(&self, path: &Path) -> bool {
        self.dependencies.values().any(|target| target == path)
    }

    /// Replace the dependency list wholesale.
    ///
    /// Inverse sets of the old and new targets are the traversal engine's
    /// responsibility, not this record's.
    pub(crate) fn set_dependencies(&mut self, dependencies: IndexMap<String, PathBuf>) {
        self.dependencies = dependencies;
    }

    /// Replace the transform artifact after a re-transform.
    pub(crate) fn set_output(&mut self, output: T) {
        self.output = output;
    }

    /// Record that `referrer` holds an edge into this module. Idempotent.
    pub(crate) fn add_inverse(&mut self, referrer: PathBuf) {
        self.inverse_dependencies.insert(referrer);
    }

    /// Drop `referrer` from the inverse set. Idempotent.
    ///
    /// Returns true when the set is now empty, the signal the engine uses
    /// to release orphaned records.
    pub(crate) fn remove_inverse(&mut self, referrer: &Path) -> bool {
        self.inverse_dependencies.remove(referrer);
        self.inverse_dependencies.is_empty()
    }
}
