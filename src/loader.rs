//! Collaborator contract and the shallow dependency resolver.
//!
//! The engine never touches the filesystem. Everything it knows about a
//! module comes through a [`ModuleLoader`]: `transform` turns a path into
//! the ordered list of dependency names plus an opaque artifact, `resolve`
//! turns one of those names into the canonical path of the target module.
//! [`load_shallow`] composes the two into a module's current edge list.

use std::future::Future;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::TraverseError;

/// What the transformer reports for one module: the dependency names in
/// source textual order, and the produced artifact (code, source map,
/// whatever the pipeline carries; the engine stores it verbatim).
#[derive(Debug, Clone)]
pub struct TransformResult<T> {
    pub dependencies: Vec<String>,
    pub output: T,
}

/// The external resolve+transform collaborators.
///
/// Both calls may suspend; transforms of distinct modules run concurrently
/// while all graph mutation stays on the single traversing task. Failures
/// are reported as plain [`anyhow::Error`] values and propagate to the
/// traversal caller unchanged, wrapped with the failing path or edge.
pub trait ModuleLoader: Send + Sync + 'static {
    /// Opaque artifact type stored on each module record.
    type Output: Send + 'static;

    /// Read and parse `path`, returning its dependency names in textual
    /// order plus the artifact.
    fn transform(
        &self,
        path: &Path,
    ) -> impl Future<Output = anyhow::Result<TransformResult<Self::Output>>> + Send;

    /// Map a dependency name, as written in `from`'s source, to the
    /// canonical path of the target module.
    fn resolve(
        &self,
        from: &Path,
        specifier: &str,
    ) -> impl Future<Output = anyhow::Result<PathBuf>> + Send;
}

/// A module as reported by the collaborators right now: every dependency
/// name mapped to its resolved target, in textual order.
#[derive(Debug)]
pub(crate) struct LoadedModule<T> {
    pub dependencies: IndexMap<String, PathBuf>,
    pub output: T,
}

/// Transform `path` and resolve each reported name, preserving textual
/// order. Names resolve sequentially so a failure is always attributed to
/// the first unresolvable edge.
pub(crate) async fn load_shallow<L: ModuleLoader>(
    loader: &L,
    path: &Path,
) -> Result<LoadedModule<L::Output>, TraverseError> {
    let TransformResult {
        dependencies,
        output,
    } = loader
        .transform(path)
        .await
        .map_err(|source| TraverseError::Transform {
            path: path.to_path_buf(),
            source,
        })?;

    let mut resolved = IndexMap::with_capacity(dependencies.len());
    for name in dependencies {
        let target =
            loader
                .resolve(path, &name)
                .await
                .map_err(|source| TraverseError::Resolve {
                    from: path.to_path_buf(),
                    specifier: name.clone(),
                    source,
                })?;
        resolved.insert(name, target);
    }

    Ok(LoadedModule {
        dependencies: resolved,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Loader over a static table: `path → (dep names, resolved targets)`.
    struct TableLoader;

    impl ModuleLoader for TableLoader {
        type Output = &'static str;

        async fn transform(&self, path: &Path) -> anyhow::Result<TransformResult<&'static str>> {
            match path.to_str() {
                Some("/bundle") => Ok(TransformResult {
                    dependencies: vec!["./foo".to_string(), "./bar".to_string()],
                    output: "bundle code",
                }),
                Some("/broken") => Err(anyhow::anyhow!("parse error")),
                _ => Ok(TransformResult {
                    dependencies: vec![],
                    output: "leaf",
                }),
            }
        }

        async fn resolve(&self, _from: &Path, specifier: &str) -> anyhow::Result<PathBuf> {
            match specifier {
                "./foo" => Ok(PathBuf::from("/foo")),
                "./bar" => Ok(PathBuf::from("/bar")),
                other => Err(anyhow::anyhow!("unknown specifier `{other}`")),
            }
        }
    }

    #[tokio::test]
    async fn resolves_names_in_textual_order() {
        let loaded = load_shallow(&TableLoader, Path::new("/bundle")).await.unwrap();
        let pairs: Vec<_> = loaded
            .dependencies
            .iter()
            .map(|(name, target)| (name.as_str(), target.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("./foo", PathBuf::from("/foo")),
                ("./bar", PathBuf::from("/bar")),
            ]
        );
        assert_eq!(loaded.output, "bundle code");
    }

    #[tokio::test]
    async fn transform_failure_is_attributed_to_the_module() {
        let err = load_shallow(&TableLoader, Path::new("/broken"))
            .await
            .unwrap_err();
        assert!(err.is_transform());
        assert_eq!(err.path(), &PathBuf::from("/broken"));
    }
}
