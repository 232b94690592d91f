//! Serializable debug view of the graph.
//!
//! Diagnostics only: outputs are opaque and omitted, and nothing here is
//! read back. The shape mirrors what the traversal engine guarantees, so a
//! dumped snapshot doubles as a fixture when reporting graph bugs.

use serde::Serialize;

use super::Graph;

/// A point-in-time view of the store, in store order.
#[derive(Debug, Serialize)]
pub struct GraphSnapshot {
    pub entry_points: Vec<String>,
    pub modules: Vec<ModuleSnapshot>,
}

/// One record: ordered named edges plus the (sorted) inverse set.
#[derive(Debug, Serialize)]
pub struct ModuleSnapshot {
    pub path: String,
    /// `(name, target)` pairs in source textual order.
    pub dependencies: Vec<(String, String)>,
    /// Referrer paths, sorted for stable output.
    pub inverse_dependencies: Vec<String>,
}

impl GraphSnapshot {
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<T> Graph<T> {
    /// Capture the current store as a serializable snapshot.
    pub fn snapshot(&self) -> GraphSnapshot {
        let modules = self
            .modules()
            .map(|module| {
                let mut inverse: Vec<String> = module
                    .inverse_dependencies()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                inverse.sort();

                ModuleSnapshot {
                    path: module.path().display().to_string(),
                    dependencies: module
                        .dependencies()
                        .iter()
                        .map(|(name, target)| (name.clone(), target.display().to_string()))
                        .collect(),
                    inverse_dependencies: inverse,
                }
            })
            .collect();

        GraphSnapshot {
            entry_points: self
                .entry_points()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            modules,
        }
    }
}
