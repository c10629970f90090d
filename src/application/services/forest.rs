//! Forest service
//!
//! One namespace's engine behind one lock. Each method is one logical
//! operation of the external interface and takes and returns plain data.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::application::engine::MutationEngine;
use crate::application::ApplicationResult;
use crate::config::ListingConfig;
use crate::domain::projector;
use crate::domain::{
    BatchDeleteOutcome, CopyTarget, DomainError, ListQuery, MoveTarget, Node, NodeDraft, NodeId,
    NodePatch, NodeStatus, NodeStore, Page, SortItem, SortOutcome, TreeKind,
};
use crate::infrastructure::traits::ReferenceStore;

/// Plain-data copy of a namespace, as exported and persisted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ForestSnapshot {
    pub namespace: String,
    pub kind: TreeKind,
    pub nodes: Vec<Node>,
}

/// Serializes every read and write against one namespace.
pub struct ForestService {
    namespace: String,
    kind: TreeKind,
    listing: ListingConfig,
    engine: Mutex<MutationEngine>,
}

impl ForestService {
    /// Create a service over an empty forest.
    pub fn new(
        namespace: impl Into<String>,
        kind: TreeKind,
        listing: ListingConfig,
        references: Arc<dyn ReferenceStore>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
            listing,
            engine: Mutex::new(MutationEngine::new(kind, references)),
        }
    }

    /// Create a service over a loaded forest; fails if the forest breaks an invariant.
    pub fn from_snapshot(
        snapshot: ForestSnapshot,
        listing: ListingConfig,
        references: Arc<dyn ReferenceStore>,
    ) -> ApplicationResult<Self> {
        let store = NodeStore::from_roots(snapshot.nodes);
        let engine = MutationEngine::with_store(snapshot.kind, store, references)?;
        Ok(Self {
            namespace: snapshot.namespace,
            kind: snapshot.kind,
            listing,
            engine: Mutex::new(engine),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn node_count(&self) -> usize {
        self.engine.lock().store().len()
    }

    pub fn snapshot(&self) -> ForestSnapshot {
        ForestSnapshot {
            namespace: self.namespace.clone(),
            kind: self.kind,
            nodes: self.get_tree(),
        }
    }

    // ---- reads ----

    pub fn get_tree(&self) -> Vec<Node> {
        projector::nested_view(self.engine.lock().store()).to_vec()
    }

    /// Forest copy with siblings ordered by `sort`.
    pub fn sorted_tree(&self) -> Vec<Node> {
        projector::sorted_view(self.engine.lock().store().roots())
    }

    /// Flattened listing. A `page_size` of 0 in the query falls back to the
    /// configured default.
    #[instrument(level = "debug", skip(self))]
    pub fn list_flattened(&self, query: &ListQuery) -> ApplicationResult<Page<Node>> {
        let flat = projector::flatten(self.engine.lock().store().roots());
        let mut query = query.clone();
        if query.page_size == 0 {
            query.page_size = self.listing.page_size;
        }
        Ok(projector::filter_and_paginate(
            flat,
            &query,
            self.listing.case_sensitive,
        )?)
    }

    pub fn get_by_id(&self, id: NodeId) -> ApplicationResult<Node> {
        let engine = self.engine.lock();
        let node = engine.navigator().find_by_id(id)?.clone();
        Ok(node)
    }

    pub fn ancestor_path(&self, id: NodeId) -> Vec<String> {
        self.engine.lock().navigator().ancestor_path(id)
    }

    pub fn leaf_ids(&self) -> Vec<NodeId> {
        self.engine.lock().navigator().leaf_ids()
    }

    pub fn subtree_ids(&self, id: NodeId) -> ApplicationResult<Vec<NodeId>> {
        Ok(self.engine.lock().navigator().collect_subtree_ids(id)?)
    }

    pub fn keep_alive_names(&self) -> BTreeSet<String> {
        projector::keep_alive_names(&projector::flatten(self.engine.lock().store().roots()))
    }

    pub fn check_name_available(
        &self,
        name: &str,
        parent: Option<NodeId>,
        exclude: Option<NodeId>,
    ) -> bool {
        self.engine
            .lock()
            .guard()
            .check_sibling_name_unique(parent, name, exclude)
            .is_ok()
    }

    /// Only meaningful for menu namespaces.
    pub fn check_path_available(&self, path: &str, exclude: Option<NodeId>) -> ApplicationResult<bool> {
        if !self.kind.enforces_unique_paths() {
            return Err(DomainError::invalid(
                "path",
                format!("namespace '{}' has no paths", self.namespace),
            )
            .into());
        }
        Ok(self
            .engine
            .lock()
            .guard()
            .check_global_path_unique(path, exclude)
            .is_ok())
    }

    // ---- writes ----

    pub fn create(&self, parent: Option<NodeId>, draft: NodeDraft) -> ApplicationResult<Node> {
        Ok(self.engine.lock().create(parent, draft)?)
    }

    pub fn rename(&self, id: NodeId, new_label: &str) -> ApplicationResult<Node> {
        Ok(self.engine.lock().rename(id, new_label)?)
    }

    pub fn update(&self, id: NodeId, patch: NodePatch) -> ApplicationResult<Node> {
        Ok(self.engine.lock().update(id, patch)?)
    }

    pub fn set_status(&self, id: NodeId, status: NodeStatus) -> ApplicationResult<Node> {
        Ok(self.engine.lock().set_status(id, status)?)
    }

    pub fn set_visibility(&self, id: NodeId, visible: bool) -> ApplicationResult<Node> {
        Ok(self.engine.lock().set_visibility(id, visible)?)
    }

    pub fn copy(&self, id: NodeId, label: &str, target: CopyTarget) -> ApplicationResult<Node> {
        Ok(self.engine.lock().copy(id, label, target)?)
    }

    pub fn delete(&self, id: NodeId, cascade: bool) -> ApplicationResult<Vec<NodeId>> {
        Ok(self.engine.lock().delete_one(id, cascade)?)
    }

    pub fn delete_batch(&self, ids: &[NodeId], cascade: bool) -> BatchDeleteOutcome {
        self.engine.lock().delete_batch(ids, cascade)
    }

    pub fn move_node(&self, id: NodeId, target: MoveTarget) -> ApplicationResult<()> {
        Ok(self.engine.lock().move_node(id, target)?)
    }

    pub fn update_sort(&self, items: &[SortItem]) -> SortOutcome {
        self.engine.lock().update_sort(items)
    }

    pub fn export(&self) -> Vec<Node> {
        self.get_tree()
    }

    pub fn import(&self, nodes: Vec<Node>) -> ApplicationResult<Vec<NodeId>> {
        debug!("import into '{}'", self.namespace);
        Ok(self.engine.lock().import(nodes)?)
    }
}

impl std::fmt::Debug for ForestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForestService")
            .field("namespace", &self.namespace)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
