//! JSON snapshots of forests and their referencing resources
//!
//! Layout under the data directory:
//! - `<namespace>.forest.json`: [`ForestSnapshot`]
//! - `<namespace>.refs.json`: list of [`ReferencingResource`]
//!
//! Namespaces like `operator/basic` map `/` to `__` in file names.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::ForestSnapshot;
use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::error_ext::{IoResultExt, JsonResultExt};
use crate::infrastructure::references::ReferencingResource;
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::InfraResult;

const FOREST_SUFFIX: &str = ".forest.json";
const REFS_SUFFIX: &str = ".refs.json";

pub struct SnapshotStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

/// Reject namespaces that would escape the data directory or collide on disk.
pub fn validate_namespace(namespace: &str) -> InfraResult<()> {
    let valid_chars = namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    let valid_segments = namespace
        .split('/')
        .all(|segment| !segment.is_empty() && !segment.contains("__"));
    if namespace.is_empty() || !valid_chars || !valid_segments {
        return Err(DomainError::invalid(
            "namespace",
            format!("'{namespace}' must be slash-separated [A-Za-z0-9_-] segments"),
        )
        .into());
    }
    Ok(())
}

fn file_stem(namespace: &str) -> String {
    namespace.replace('/', "__")
}

impl SnapshotStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn forest_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}{}", file_stem(namespace), FOREST_SUFFIX))
    }

    pub fn references_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}{}", file_stem(namespace), REFS_SUFFIX))
    }

    pub fn exists(&self, namespace: &str) -> bool {
        self.fs.exists(&self.forest_path(namespace))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load_forest(&self, namespace: &str) -> InfraResult<ForestSnapshot> {
        validate_namespace(namespace)?;
        let path = self.forest_path(namespace);
        if !self.fs.exists(&path) {
            return Err(ApplicationError::UnknownNamespace(namespace.to_string()).into());
        }
        let content = self
            .fs
            .read_to_string(&path)
            .with_path_context("read forest snapshot", &path)?;
        let snapshot: ForestSnapshot =
            serde_json::from_str(&content).with_path_context("parse forest snapshot", &path)?;
        if snapshot.namespace != namespace {
            return Err(DomainError::invalid(
                "namespace",
                format!(
                    "{} holds namespace '{}', expected '{}'",
                    path.display(),
                    snapshot.namespace,
                    namespace
                ),
            )
            .into());
        }
        debug!("loaded {} root nodes from {}", snapshot.nodes.len(), path.display());
        Ok(snapshot)
    }

    #[instrument(level = "debug", skip(self, snapshot), fields(namespace = %snapshot.namespace))]
    pub fn save_forest(&self, snapshot: &ForestSnapshot) -> InfraResult<PathBuf> {
        validate_namespace(&snapshot.namespace)?;
        let path = self.forest_path(&snapshot.namespace);
        let content = serde_json::to_string_pretty(snapshot)
            .with_path_context("encode forest snapshot", &path)?;
        self.fs
            .write_atomic(&path, &content)
            .with_path_context("write forest snapshot", &path)?;
        Ok(path)
    }

    /// Missing file means nothing references the namespace yet.
    pub fn load_references(&self, namespace: &str) -> InfraResult<Vec<ReferencingResource>> {
        validate_namespace(namespace)?;
        let path = self.references_path(namespace);
        if !self.fs.exists(&path) {
            return Ok(Vec::new());
        }
        let content = self
            .fs
            .read_to_string(&path)
            .with_path_context("read references", &path)?;
        serde_json::from_str(&content).with_path_context("parse references", &path)
    }

    pub fn save_references(
        &self,
        namespace: &str,
        resources: &[ReferencingResource],
    ) -> InfraResult<PathBuf> {
        validate_namespace(namespace)?;
        let path = self.references_path(namespace);
        let content =
            serde_json::to_string_pretty(resources).with_path_context("encode references", &path)?;
        self.fs
            .write_atomic(&path, &content)
            .with_path_context("write references", &path)?;
        Ok(path)
    }

    /// Namespaces with a forest snapshot in the data directory, sorted.
    pub fn list_namespaces(&self) -> InfraResult<Vec<String>> {
        if !self.fs.exists(&self.dir) {
            return Ok(Vec::new());
        }
        let mut namespaces: Vec<String> = self
            .fs
            .list_dir(&self.dir)
            .with_path_context("list data dir", &self.dir)?
            .iter()
            .filter_map(|name| name.strip_suffix(FOREST_SUFFIX))
            .map(|stem| stem.replace("__", "/"))
            .collect();
        namespaces.sort();
        Ok(namespaces)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").field("dir", &self.dir).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("menu")]
    #[case("operator/basic")]
    #[case("workflow-category")]
    fn given_valid_namespace_when_validating_then_ok(#[case] ns: &str) {
        assert!(validate_namespace(ns).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("../etc")]
    #[case("a//b")]
    #[case("a__b")]
    #[case("/abs")]
    fn given_invalid_namespace_when_validating_then_err(#[case] ns: &str) {
        assert!(validate_namespace(ns).is_err());
    }

    #[test]
    fn given_nested_namespace_when_building_path_then_slashes_are_mapped() {
        let store = SnapshotStore::new(
            Arc::new(crate::infrastructure::traits::RealFileSystem),
            "/data",
        );
        assert_eq!(
            store.forest_path("operator/basic"),
            PathBuf::from("/data/operator__basic.forest.json")
        );
    }
}
