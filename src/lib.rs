//! Tangle - incremental module dependency graph engine for JavaScript
//! bundling.
//!
//! From a set of entry paths, tangle discovers every reachable module
//! through an external resolver+transformer (the [`ModuleLoader`] seam),
//! records each module's ordered dependency list, and on later runs
//! computes the minimal added/deleted delta for a batch of dirtied files.
//!
//! - [`initial_traverse_dependencies`] builds the graph from its entry
//!   points.
//! - [`traverse_dependencies`] re-expands a dirty set and reports the
//!   delta, releasing modules whose last referrer disappeared.
//! - [`reorder_graph`] rewrites the store's observable iteration order
//!   into the canonical entry-rooted depth-first sequence.
//!
//! Cycles are data, not errors. The graph is never persisted. Source
//! content is never interpreted here - transformation and resolution stay
//! behind the loader seam, and their failures propagate to the caller
//! verbatim.

mod error;
mod graph;
mod loader;
pub mod logger;
mod progress;
mod traversal;

pub use error::TraverseError;
pub use graph::{Graph, GraphSnapshot, Module, ModuleSnapshot, reorder_graph};
pub use loader::{ModuleLoader, TransformResult};
pub use progress::{Progress, ProgressSender};
pub use traversal::{
    Delta, TraverseOptions, initial_traverse_dependencies, traverse_dependencies,
};
