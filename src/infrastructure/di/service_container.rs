//! Service container for dependency injection
//!
//! Wires the namespace registry to snapshot persistence and the
//! per-namespace reference stores.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::application::services::{ForestRegistry, ForestService};
use crate::application::ApplicationError;
use crate::config::Settings;
use crate::domain::TreeKind;
use crate::infrastructure::references::{CascadePolicy, InMemoryReferenceStore, ReferencingResource};
use crate::infrastructure::snapshot::{validate_namespace, SnapshotStore};
use crate::infrastructure::traits::{FileSystem, RealFileSystem, ReferenceStore};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
///
/// Namespaces are loaded from disk on first use and cached.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub snapshots: SnapshotStore,

    pub registry: ForestRegistry,

    references: Mutex<BTreeMap<String, Arc<InMemoryReferenceStore>>>,
    policy: CascadePolicy,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> InfraResult<Self> {
        let policy = CascadePolicy::try_from(&settings.cascade)?;
        let snapshots = SnapshotStore::new(Arc::clone(&fs), settings.data_dir.clone());
        let registry = ForestRegistry::new(settings.listing.clone());
        Ok(Self {
            settings: Arc::new(settings),
            fs,
            snapshots,
            registry,
            references: Mutex::new(BTreeMap::new()),
            policy,
        })
    }

    /// Create and persist an empty namespace.
    pub fn init_namespace(&self, namespace: &str, kind: TreeKind) -> InfraResult<Arc<ForestService>> {
        validate_namespace(namespace)?;
        if self.snapshots.exists(namespace) {
            return Err(ApplicationError::NamespaceExists(namespace.to_string()).into());
        }
        let service = {
            let mut published = self.references.lock();
            let references = self.reference_store(Vec::new());
            let service = self.registry.create_namespace_with_references(
                namespace,
                kind,
                Arc::clone(&references) as Arc<dyn ReferenceStore>,
            )?;
            published.insert(namespace.to_string(), references);
            service
        };
        self.save(namespace)?;
        info!("initialized namespace '{}' in {}", namespace, self.snapshots.dir().display());
        Ok(service)
    }

    /// Get a namespace, loading its snapshot on first use.
    ///
    /// Loads are serialized on the reference map, so a namespace's engine
    /// and its published reference store are always the same instance.
    pub fn open(&self, namespace: &str) -> InfraResult<Arc<ForestService>> {
        if let Ok(service) = self.registry.get(namespace) {
            return Ok(service);
        }
        let mut published = self.references.lock();
        if let Ok(service) = self.registry.get(namespace) {
            return Ok(service);
        }
        let snapshot = self.snapshots.load_forest(namespace)?;
        let resources = self.snapshots.load_references(namespace)?;
        debug!(
            "opening '{}' with {} referencing resources",
            namespace,
            resources.len()
        );
        let references = self.reference_store(resources);
        let service = self
            .registry
            .load_namespace(snapshot, Arc::clone(&references) as Arc<dyn ReferenceStore>)?;
        published.insert(namespace.to_string(), references);
        Ok(service)
    }

    /// Reference store of an opened namespace.
    pub fn references(&self, namespace: &str) -> InfraResult<Arc<InMemoryReferenceStore>> {
        self.open(namespace)?;
        self.references
            .lock()
            .get(namespace)
            .cloned()
            .ok_or_else(|| ApplicationError::UnknownNamespace(namespace.to_string()).into())
    }

    /// Persist a namespace's forest and referencing resources.
    pub fn save(&self, namespace: &str) -> InfraResult<()> {
        let service = self.registry.get(namespace)?;
        let path = self.snapshots.save_forest(&service.snapshot())?;
        if let Some(references) = self.references.lock().get(namespace) {
            self.snapshots
                .save_references(namespace, &references.resources())?;
        }
        debug!("saved '{}' to {}", namespace, path.display());
        Ok(())
    }

    pub fn list_namespaces(&self) -> InfraResult<Vec<String>> {
        self.snapshots.list_namespaces()
    }

    fn reference_store(&self, resources: Vec<ReferencingResource>) -> Arc<InMemoryReferenceStore> {
        Arc::new(InMemoryReferenceStore::with_resources(self.policy, resources))
    }
}
