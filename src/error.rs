//! Traversal error types.

use std::path::PathBuf;

use thiserror::Error;

/// A traversal call failed. Collaborator errors are carried verbatim as the
/// source; the variants record which module or edge the engine was working
/// on when the collaborator failed.
///
/// Internal invariant breakage (an edge whose target record is missing, an
/// inverse set out of sync) is a programmer error and panics instead of
/// surfacing here.
#[derive(Debug, Error)]
pub enum TraverseError {
    /// The resolver could not map a dependency name to a module path.
    #[error("cannot resolve `{specifier}` from `{from}`")]
    Resolve {
        from: PathBuf,
        specifier: String,
        #[source]
        source: anyhow::Error,
    },

    /// The transformer could not read or parse a module.
    #[error("cannot transform `{path}`")]
    Transform {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl TraverseError {
    /// The module path the failure is attributed to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Resolve { from, .. } => from,
            Self::Transform { path, .. } => path,
        }
    }

    #[inline]
    pub fn is_resolve(&self) -> bool {
        matches!(self, Self::Resolve { .. })
    }

    #[inline]
    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_edge() {
        let err = TraverseError::Resolve {
            from: PathBuf::from("/foo"),
            specifier: "./bar".to_string(),
            source: anyhow::anyhow!("no such module"),
        };
        let display = format!("{err}");
        assert!(display.contains("./bar"));
        assert!(display.contains("/foo"));
        assert!(err.is_resolve());
        assert_eq!(err.path(), &PathBuf::from("/foo"));
    }
}
