//! Namespace registry
//!
//! Menus, each operator type's categories, task and workflow categories all
//! live in separate namespaces. Each namespace has its own lock, so work on
//! different namespaces never contends.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::application::services::forest::{ForestService, ForestSnapshot};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::ListingConfig;
use crate::domain::TreeKind;
use crate::infrastructure::traits::{NoopReferenceStore, ReferenceStore};

#[derive(Debug, Default)]
pub struct ForestRegistry {
    listing: ListingConfig,
    forests: RwLock<BTreeMap<String, Arc<ForestService>>>,
}

impl ForestRegistry {
    pub fn new(listing: ListingConfig) -> Self {
        Self {
            listing,
            forests: RwLock::new(BTreeMap::new()),
        }
    }

    fn insert(&self, service: ForestService) -> ApplicationResult<Arc<ForestService>> {
        let mut forests = self.forests.write();
        if forests.contains_key(service.namespace()) {
            return Err(ApplicationError::NamespaceExists(
                service.namespace().to_string(),
            ));
        }
        let service = Arc::new(service);
        forests.insert(service.namespace().to_string(), Arc::clone(&service));
        info!("registered namespace '{}' ({})", service.namespace(), service.kind());
        Ok(service)
    }

    /// Register an empty namespace that nothing references.
    pub fn create_namespace(&self, namespace: &str, kind: TreeKind) -> ApplicationResult<Arc<ForestService>> {
        self.create_namespace_with_references(namespace, kind, Arc::new(NoopReferenceStore))
    }

    pub fn create_namespace_with_references(
        &self,
        namespace: &str,
        kind: TreeKind,
        references: Arc<dyn ReferenceStore>,
    ) -> ApplicationResult<Arc<ForestService>> {
        self.insert(ForestService::new(
            namespace,
            kind,
            self.listing.clone(),
            references,
        ))
    }

    /// Register a namespace from a persisted snapshot.
    pub fn load_namespace(
        &self,
        snapshot: ForestSnapshot,
        references: Arc<dyn ReferenceStore>,
    ) -> ApplicationResult<Arc<ForestService>> {
        self.insert(ForestService::from_snapshot(
            snapshot,
            self.listing.clone(),
            references,
        )?)
    }

    pub fn get(&self, namespace: &str) -> ApplicationResult<Arc<ForestService>> {
        self.forests
            .read()
            .get(namespace)
            .cloned()
            .ok_or_else(|| ApplicationError::UnknownNamespace(namespace.to_string()))
    }

    pub fn remove(&self, namespace: &str) -> ApplicationResult<Arc<ForestService>> {
        self.forests
            .write()
            .remove(namespace)
            .ok_or_else(|| ApplicationError::UnknownNamespace(namespace.to_string()))
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.forests.read().keys().cloned().collect()
    }
}
