//! Traversal engine: initial and incremental dependency discovery.
//!
//! # Concurrency model
//!
//! Transforms of distinct modules run as spawned tokio tasks; every graph
//! mutation happens on the single task driving the traversal. A child's
//! expansion task is spawned the moment its parent's dependency list is
//! known, but results are consumed strictly in depth-first dependency
//! order. Observable order (store keys, delta order, progress events) is
//! therefore a pure function of the prior graph state, the dirty set, the
//! entry list, and each module's reported dependency list, never of task
//! completion order.
//!
//! # Error semantics
//!
//! A collaborator failure aborts the call and is surfaced unchanged. An
//! aborted initial traversal leaves the graph empty; an aborted
//! incremental traversal keeps the partially-applied prefix, and retrying
//! with the same dirty set replays the same failure.

mod delta;


pub use delta::Delta;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::task::JoinHandle;

use crate::debug;
use crate::error::TraverseError;
use crate::graph::{Graph, Module};
use crate::loader::{LoadedModule, ModuleLoader, load_shallow};
use crate::progress::{ProgressCounter, ProgressSender};

/// What a traversal call needs besides the graph: the collaborator handle
/// and an optional progress sink.
#[derive(Debug)]
pub struct TraverseOptions<L: ModuleLoader> {
    pub loader: Arc<L>,
    pub progress: Option<ProgressSender>,
}

impl<L: ModuleLoader> TraverseOptions<L> {
    pub fn new(loader: Arc<L>) -> Self {
        Self {
            loader,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = Some(sender);
        self
    }
}

/// Discover every module reachable from the graph's entry points.
///
/// The graph must be empty and have at least one entry point. On success
/// `deleted` is empty and `added` lists every module now in the store, in
/// store order. On failure the graph is left empty: a partial initial
/// graph is never observable.
pub async fn initial_traverse_dependencies<L: ModuleLoader>(
    graph: &mut Graph<L::Output>,
    options: &TraverseOptions<L>,
) -> Result<Delta, TraverseError> {
    assert!(
        graph.is_empty(),
        "initial traversal requires an empty graph"
    );
    assert!(
        !graph.entry_points().is_empty(),
        "initial traversal requires at least one entry point"
    );

    let result = {
        let mut traverser = Traverser::new(graph, options);
        match traverser.expand_entries().await {
            Ok(()) => Ok(traverser.into_delta()),
            Err(err) => {
                traverser.abort_in_flight();
                Err(err)
            }
        }
    };

    match result {
        Ok(delta) => {
            debug!("traverse"; "initial traversal discovered {} module(s)", delta.added.len());
            Ok(delta)
        }
        Err(err) => {
            graph.clear();
            Err(err)
        }
    }
}

/// Re-expand a batch of dirtied paths and compute the resulting delta.
///
/// Each dirty path is processed in caller order: paths present in the
/// graph are re-transformed and their edge lists diffed; paths that are
/// declared entry points but not yet in the graph are expanded; anything
/// else is a stale notification and is skipped.
pub async fn traverse_dependencies<L: ModuleLoader>(
    dirty: &[PathBuf],
    graph: &mut Graph<L::Output>,
    options: &TraverseOptions<L>,
) -> Result<Delta, TraverseError> {
    let mut traverser = Traverser::new(graph, options);
    match traverser.process_dirty(dirty).await {
        Ok(()) => {
            traverser.collapse_unreachable();
            let delta = traverser.into_delta();
            debug!("traverse"; "delta: {} added, {} deleted", delta.added.len(), delta.deleted.len());
            Ok(delta)
        }
        Err(err) => {
            traverser.abort_in_flight();
            Err(err)
        }
    }
}

// =============================================================================
// Traverser
// =============================================================================

type ExpansionTask<T> = JoinHandle<Result<LoadedModule<T>, TraverseError>>;

/// Single-call traversal state. Owns the graph mutably for the duration of
/// the call; everything else in here is bookkeeping that dies with it.
struct Traverser<'g, L: ModuleLoader> {
    graph: &'g mut Graph<L::Output>,
    loader: Arc<L>,
    progress: ProgressCounter,
    /// Expansion tasks spawned for paths not yet in the store. A path's
    /// task is spawned at most once; consuming it removes the entry.
    in_flight: FxHashMap<PathBuf, ExpansionTask<L::Output>>,
    /// Targets that survived an inverse-edge removal with a non-empty
    /// inverse set. Checked for unreachable cycles once the call is
    /// quiescent.
    collapse_candidates: FxHashSet<PathBuf>,
    /// Records created by the dirty unit currently being applied, in
    /// creation order. Rolled back if the unit fails partway.
    unit_created: Vec<PathBuf>,
    delta: delta::DeltaBuilder,
}

impl<'g, L: ModuleLoader> Traverser<'g, L> {
    fn new(graph: &'g mut Graph<L::Output>, options: &TraverseOptions<L>) -> Self {
        Self {
            graph,
            loader: Arc::clone(&options.loader),
            progress: ProgressCounter::new(options.progress.clone()),
            in_flight: FxHashMap::default(),
            collapse_candidates: FxHashSet::default(),
            unit_created: Vec::new(),
            delta: delta::DeltaBuilder::default(),
        }
    }

    fn into_delta(self) -> Delta {
        self.delta.finish()
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Expand every entry point, in declaration order.
    async fn expand_entries(&mut self) -> Result<(), TraverseError> {
        let entries: Vec<PathBuf> = self.graph.entry_points().iter().cloned().collect();
        for entry in &entries {
            self.spawn_expansion(entry);
        }
        for entry in &entries {
            // An entry reachable from an earlier entry is already expanded.
            if self.graph.contains(entry) {
                continue;
            }
            let loaded = self.await_expansion(entry).await?;
            self.expand_new_module(entry.clone(), loaded).await?;
        }
        Ok(())
    }

    /// Start a transform task for `path` unless its record exists or a task
    /// is already running. Spawning is the module's discovery event.
    fn spawn_expansion(&mut self, path: &Path) {
        if self.graph.contains(path) || self.in_flight.contains_key(path) {
            return;
        }
        let loader = Arc::clone(&self.loader);
        let owned = path.to_path_buf();
        let handle = tokio::spawn(async move { load_shallow(loader.as_ref(), &owned).await });
        self.in_flight.insert(path.to_path_buf(), handle);
        self.progress.module_discovered();
    }

    async fn await_expansion(
        &mut self,
        path: &Path,
    ) -> Result<LoadedModule<L::Output>, TraverseError> {
        let handle = self
            .in_flight
            .remove(path)
            .unwrap_or_else(|| panic!("no expansion in flight for `{}`", path.display()));
        handle.await.expect("module expansion task panicked")
    }

    /// Insert a freshly loaded record and expand its children depth-first.
    ///
    /// Every child's slot (and transform task) is reserved before the
    /// first child is descended into, so slow siblings cannot reorder the
    /// store behind fast ones.
    fn expand_new_module<'a>(
        &'a mut self,
        path: PathBuf,
        loaded: LoadedModule<L::Output>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TraverseError>> + Send + 'a>> {
        Box::pin(async move {
            let mut module = Module::new(path.clone(), loaded.output);
            module.set_dependencies(loaded.dependencies.clone());
            self.graph.insert(module);
            self.unit_created.push(path.clone());
            self.delta.record_created(&path);

            for target in loaded.dependencies.values() {
                self.spawn_expansion(target);
            }
            // Finished means transform returned and children enqueued, not
            // that the subtree below completed; the descent reports its own
            // events.
            self.progress.module_finished();

            for target in loaded.dependencies.values() {
                self.add_edge(&path, target).await?;
            }
            Ok(())
        })
    }

    /// Ensure `target` has a record and holds the reverse edge to `parent`.
    /// Unknown targets are expanded (recursively) first.
    async fn add_edge(&mut self, parent: &Path, target: &Path) -> Result<(), TraverseError> {
        if !self.graph.contains(target) {
            self.spawn_expansion(target);
            let loaded = self.await_expansion(target).await?;
            self.expand_new_module(target.to_path_buf(), loaded).await?;
        }
        let module = self
            .graph
            .get_mut(target)
            .expect("edge target missing right after expansion");
        module.add_inverse(parent.to_path_buf());
        Ok(())
    }

    // =========================================================================
    // Incremental re-expansion
    // =========================================================================

    async fn process_dirty(&mut self, dirty: &[PathBuf]) -> Result<(), TraverseError> {
        for path in dirty {
            if self.graph.contains(path) {
                self.refresh_module(path).await?;
            } else if self.graph.is_entry_point(path) {
                self.unit_created.clear();
                self.spawn_expansion(path);
                let loaded = self.await_expansion(path).await?;
                if let Err(err) = self.expand_new_module(path.clone(), loaded).await {
                    self.rollback_unit(path, &[]);
                    return Err(err);
                }
            } else {
                // Stale notification: the module was never discovered, or an
                // earlier dirty path in this batch already released it.
                debug!("traverse"; "skipping dirty `{}`: not in graph", path.display());
            }
        }
        Ok(())
    }

    /// Re-transform one dirty module and apply its edge diff.
    ///
    /// Edges are keyed by `(name, target)`: the same target listed under
    /// two names is two distinct edges, and removing one alias must not
    /// drop the target's inbound reference while the other remains.
    async fn refresh_module(&mut self, path: &Path) -> Result<(), TraverseError> {
        self.progress.module_discovered();

        let loader = Arc::clone(&self.loader);
        let loaded = load_shallow(loader.as_ref(), path).await?;

        let previous = self
            .graph
            .get(path)
            .expect("dirty module vanished mid-call")
            .dependencies()
            .clone();

        let added: Vec<(String, PathBuf)> = loaded
            .dependencies
            .iter()
            .filter(|&(name, target)| previous.get(name.as_str()) != Some(target))
            .map(|(name, target)| (name.clone(), target.clone()))
            .collect();
        let removed: Vec<(String, PathBuf)> = previous
            .iter()
            .filter(|&(name, target)| loaded.dependencies.get(name.as_str()) != Some(target))
            .map(|(name, target)| (name.clone(), target.clone()))
            .collect();

        // New edges first: a target removed under one name and re-added
        // under another never sees its inbound count reach zero.
        self.unit_created.clear();
        for (_, target) in &added {
            self.spawn_expansion(target);
        }
        for (_, target) in &added {
            if let Err(err) = self.add_edge(path, target).await {
                self.rollback_unit(path, &added);
                return Err(err);
            }
        }

        // Install the new list before disconnecting old edges so the alias
        // check below consults the current truth.
        {
            let module = self
                .graph
                .get_mut(path)
                .expect("dirty module vanished mid-call");
            module.set_dependencies(loaded.dependencies);
            module.set_output(loaded.output);
        }

        for (_, target) in &removed {
            self.remove_edge(path, target);
        }

        self.delta.record_modified(path);
        self.progress.module_finished();
        Ok(())
    }

    // =========================================================================
    // Release
    // =========================================================================

    /// Drop one `(name, target)` edge of `parent`.
    fn remove_edge(&mut self, parent: &Path, target: &Path) {
        // Another alias of the same target may survive in the new list; the
        // inbound reference stays until the last alias is gone.
        if self
            .graph
            .get(parent)
            .is_some_and(|module| module.depends_on(target))
        {
            return;
        }
        self.drop_inverse(parent, target);
    }

    /// Remove `parent` from `target`'s inverse set and release the target
    /// if that was its last referrer.
    fn drop_inverse(&mut self, parent: &Path, target: &Path) {
        let Some(module) = self.graph.get_mut(target) else {
            // Already released earlier in this call.
            return;
        };
        let now_empty = module.remove_inverse(parent);
        if !now_empty {
            // Still referenced. A cycle could be all that holds it; settle
            // that once the batch is done.
            self.collapse_candidates.insert(target.to_path_buf());
            return;
        }
        if self.graph.is_entry_point(target) {
            return;
        }
        self.release(target);
    }

    /// Release `path`: remove its record and recursively disconnect its
    /// outbound edges, releasing any child orphaned by the disconnect.
    fn release(&mut self, path: &Path) {
        // Remove the record before disconnecting children so a cycle back
        // into this module terminates instead of recursing forever.
        let module = self
            .graph
            .remove(path)
            .expect("releasing a module that is not in the graph");
        self.delta.record_released(path);

        let mut disconnected: FxHashSet<&PathBuf> = FxHashSet::default();
        for target in module.dependencies().values() {
            // Two aliases of one target hold a single inbound reference.
            if disconnected.insert(target) {
                self.drop_inverse(path, target);
            }
        }
    }

    /// Release every module no longer reachable from the entry points.
    ///
    /// Reference counting alone cannot release a cycle whose members keep
    /// each other's inverse sets non-empty; any target that survived an
    /// inverse-edge removal is a candidate root. One mark pass from the
    /// entries settles all of them, in store order.
    fn collapse_unreachable(&mut self) {
        let graph = &*self.graph;
        self.collapse_candidates.retain(|path| graph.contains(path));
        if self.collapse_candidates.is_empty() {
            return;
        }

        let mut reachable = FxHashSet::default();
        let mut stack: Vec<PathBuf> = self.graph.entry_points().iter().cloned().collect();
        while let Some(path) = stack.pop() {
            if !reachable.insert(path.clone()) {
                continue;
            }
            if let Some(module) = self.graph.get(&path) {
                for target in module.dependencies().values() {
                    if !reachable.contains(target) {
                        stack.push(target.clone());
                    }
                }
            }
        }

        let doomed: Vec<PathBuf> = self
            .graph
            .paths()
            .filter(|path| !reachable.contains(*path))
            .map(Path::to_path_buf)
            .collect();
        for path in &doomed {
            let module = self
                .graph
                .remove(path)
                .expect("unreachable module vanished during sweep");
            self.delta.record_released(path);
            // A doomed module may point at survivors; scrub its reverse
            // edges out of them.
            let mut disconnected: FxHashSet<&PathBuf> = FxHashSet::default();
            for target in module.dependencies().values() {
                if disconnected.insert(target)
                    && let Some(survivor) = self.graph.get_mut(target)
                {
                    survivor.remove_inverse(path);
                }
            }
        }

        if !doomed.is_empty() {
            debug!("graph"; "collapsed {} unreachable module(s)", doomed.len());
        }
        self.collapse_candidates.clear();
    }

    // =========================================================================
    // Failure
    // =========================================================================

    /// Undo the partial effects of one failed dirty unit: records it
    /// created are dropped and the inverse references it added to
    /// pre-existing targets are scrubbed. Dirty units that completed
    /// earlier in the batch keep their effects; retrying with the same
    /// dirty set re-runs this unit from scratch and observes the same
    /// failure.
    fn rollback_unit(&mut self, parent: &Path, added: &[(String, PathBuf)]) {
        let created = std::mem::take(&mut self.unit_created);
        for path in created.iter().rev() {
            let Some(module) = self.graph.remove(path) else {
                continue;
            };
            let mut disconnected: FxHashSet<&PathBuf> = FxHashSet::default();
            for target in module.dependencies().values() {
                if disconnected.insert(target)
                    && let Some(survivor) = self.graph.get_mut(target)
                {
                    survivor.remove_inverse(path);
                }
            }
        }

        for (_, target) in added {
            // A pre-existing alias of the same target keeps the edge.
            if self
                .graph
                .get(parent)
                .is_some_and(|module| module.depends_on(target))
            {
                continue;
            }
            if let Some(module) = self.graph.get_mut(target) {
                module.remove_inverse(parent);
            }
        }
    }

    /// Cancel outstanding expansion tasks after an error; their results
    /// are unobservable either way.
    fn abort_in_flight(&mut self) {
        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
    }
}
