//! Per-call delta bookkeeping.

use std::path::{Path, PathBuf};

use indexmap::IndexSet;

/// The observable result of one traversal call.
///
/// `added` holds every module whose record was created or re-transformed:
/// newly created records first (store-creation order), then re-transformed
/// dirty records (caller's dirty order). `deleted` holds every released
/// path, in release order. The two sets are always disjoint.
///
/// Records themselves stay owned by the graph; fetch them with
/// [`Graph::get`](crate::Graph::get).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: IndexSet<PathBuf>,
    pub deleted: IndexSet<PathBuf>,
}

impl Delta {
    /// True when the call changed nothing and re-transformed nothing.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

/// Call-scoped accumulator enforcing the cancellation rules: a module both
/// created and released within one call lands in neither set, whichever
/// order the two events happened in.
#[derive(Debug, Default)]
pub(crate) struct DeltaBuilder {
    /// Records created this call, in store-creation order.
    created: IndexSet<PathBuf>,
    /// Dirty records re-transformed this call, in caller order.
    modified: IndexSet<PathBuf>,
    /// Records released this call that existed before it.
    released: IndexSet<PathBuf>,
}

impl DeltaBuilder {
    /// A record was created. Cancels a same-call release: the path existed
    /// at call start, was released, and exists again: net, no delta entry.
    pub(crate) fn record_created(&mut self, path: &Path) {
        if !self.released.shift_remove(path) {
            self.created.insert(path.to_path_buf());
        }
    }

    /// A dirty record was re-transformed (its edges may be unchanged).
    pub(crate) fn record_modified(&mut self, path: &Path) {
        self.modified.insert(path.to_path_buf());
    }

    /// A record was released. Cancels a same-call creation: the path did
    /// not exist at call start and does not exist now.
    pub(crate) fn record_released(&mut self, path: &Path) {
        self.modified.shift_remove(path);
        if !self.created.shift_remove(path) {
            self.released.insert(path.to_path_buf());
        }
    }

    pub(crate) fn finish(self) -> Delta {
        let mut added = self.created;
        added.extend(self.modified);
        Delta {
            added,
            deleted: self.released,
        }
    }
}
