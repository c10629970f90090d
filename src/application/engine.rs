//! Mutation engine: create, rename, move, delete and re-rank tree nodes.
//!
//! Every operation runs its guard checks first and only then touches the
//! store, so a failed operation leaves the forest exactly as it was.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::domain::projector;
use crate::domain::{
    BatchDeleteOutcome, BatchItemError, CopyTarget, DomainError, DomainResult, MovePosition,
    MoveTarget, Node, NodeDraft, NodeId, NodePatch, NodeStatus, NodeStore, Position, SortItem,
    SortOutcome, TreeKind, TreeNavigator, ValidationGuard,
};
use crate::infrastructure::traits::ReferenceStore;

/// Single owner of one namespace's forest.
pub struct MutationEngine {
    store: NodeStore,
    kind: TreeKind,
    references: Arc<dyn ReferenceStore>,
}

impl MutationEngine {
    pub fn new(kind: TreeKind, references: Arc<dyn ReferenceStore>) -> Self {
        Self {
            store: NodeStore::new(),
            kind,
            references,
        }
    }

    /// Adopt an existing forest after checking its integrity.
    pub fn with_store(
        kind: TreeKind,
        store: NodeStore,
        references: Arc<dyn ReferenceStore>,
    ) -> DomainResult<Self> {
        ValidationGuard::new(&store, kind).check_integrity()?;
        Ok(Self {
            store,
            kind,
            references,
        })
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn navigator(&self) -> TreeNavigator<'_> {
        TreeNavigator::new(&self.store)
    }

    pub fn guard(&self) -> ValidationGuard<'_> {
        ValidationGuard::new(&self.store, self.kind)
    }

    fn level_under(&self, parent: Option<NodeId>) -> DomainResult<u32> {
        match parent {
            None => Ok(1),
            Some(id) => self
                .store
                .get(id)
                .map(|p| p.level + 1)
                .ok_or(DomainError::ParentNotFound(id)),
        }
    }

    fn attach(&mut self, parent: Option<NodeId>, node: Node) -> DomainResult<()> {
        match parent {
            Some(parent_id) => self.store.insert_child(parent_id, node),
            None => {
                self.store.insert_root(node);
                Ok(())
            }
        }
    }

    #[instrument(level = "debug", skip(self, draft), fields(label = %draft.label))]
    pub fn create(&mut self, parent: Option<NodeId>, draft: NodeDraft) -> DomainResult<Node> {
        let guard = self.guard();
        guard.check_label(&draft.label)?;
        guard.check_payload_kind(&draft.payload)?;
        guard.check_parent_exists(parent)?;
        guard.check_sibling_name_unique(parent, &draft.label, None)?;
        guard.check_payload_path(&draft.payload, None)?;

        let node = Node::from_draft(self.store.next_id(), parent, self.level_under(parent)?, draft);
        self.attach(parent, node.clone())?;
        info!("created node {} under {:?}", node.id, parent);
        Ok(node)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn rename(&mut self, id: NodeId, new_label: &str) -> DomainResult<Node> {
        let guard = self.guard();
        guard.check_label(new_label)?;
        let parent = self.navigator().find_by_id(id)?.parent_id;
        guard.check_sibling_name_unique(parent, new_label, Some(id))?;

        let node = self.store.get_mut(id).ok_or(DomainError::NotFound(id))?;
        node.label = new_label.to_string();
        node.touch(Utc::now());
        Ok(node.detached())
    }

    /// Replace sort, status and/or payload of a node.
    #[instrument(level = "debug", skip(self, patch))]
    pub fn update(&mut self, id: NodeId, patch: NodePatch) -> DomainResult<Node> {
        let guard = self.guard();
        guard.check_exists(id)?;
        if let Some(payload) = &patch.payload {
            guard.check_payload_kind(payload)?;
            guard.check_payload_path(payload, Some(id))?;
        }

        let node = self.store.get_mut(id).ok_or(DomainError::NotFound(id))?;
        if let Some(sort) = patch.sort {
            node.sort = sort;
        }
        if let Some(status) = patch.status {
            node.status = status;
        }
        if let Some(payload) = patch.payload {
            node.payload = payload;
        }
        node.touch(Utc::now());
        Ok(node.detached())
    }

    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) -> DomainResult<Node> {
        self.update(
            id,
            NodePatch {
                status: Some(status),
                ..NodePatch::default()
            },
        )
    }

    /// Menu-only visibility toggle.
    pub fn set_visibility(&mut self, id: NodeId, visible: bool) -> DomainResult<Node> {
        let node = self.store.get_mut(id).ok_or(DomainError::NotFound(id))?;
        let menu = node
            .payload
            .as_menu_mut()
            .ok_or_else(|| DomainError::invalid("visible", "visibility applies to menu nodes only"))?;
        menu.visible = visible;
        node.touch(Utc::now());
        Ok(node.detached())
    }

    /// Duplicate a node without its children.
    #[instrument(level = "debug", skip(self))]
    pub fn copy(&mut self, id: NodeId, label: &str, target: CopyTarget) -> DomainResult<Node> {
        let source = self.navigator().find_by_id(id)?;
        let destination = match target {
            CopyTarget::Beside => source.parent_id,
            CopyTarget::Parent(parent) => parent,
        };
        let new_id = self.store.next_id();

        let mut payload = source.payload.clone();
        if let Some(menu) = payload.as_menu_mut() {
            if !menu.path.is_empty() {
                menu.path = format!("{}_copy_{}", menu.path, new_id);
            }
        }

        let draft = NodeDraft {
            label: label.to_string(),
            sort: source.sort,
            status: source.status,
            payload,
        };
        self.create(destination, draft)
    }

    /// Reparent or reposition a node together with its subtree.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, id: NodeId, target: MoveTarget) -> DomainResult<()> {
        let navigator = self.navigator();
        let guard = self.guard();
        let subject = navigator.find_by_id(id)?;
        let origin = navigator
            .find_parent_and_index(id)
            .ok_or(DomainError::NotFound(id))?;

        let destination = match target {
            MoveTarget::Parent(parent) => {
                if let Some(parent_id) = parent {
                    guard.check_exists(parent_id)?;
                }
                parent
            }
            MoveTarget::Relative {
                anchor,
                position: MovePosition::Inner,
            } => {
                guard.check_exists(anchor)?;
                Some(anchor)
            }
            MoveTarget::Relative { anchor, .. } => {
                if anchor == id {
                    debug!("move_node: node {} positioned relative to itself, nothing to do", id);
                    return Ok(());
                }
                navigator
                    .find_parent_and_index(anchor)
                    .ok_or(DomainError::NotFound(anchor))?
                    .parent
            }
        };

        if let Some(parent_id) = destination {
            guard.check_not_descendant(parent_id, id)?;
        }
        if destination != origin.parent {
            guard.check_sibling_name_unique(destination, &subject.label, Some(id))?;
        }
        let level = self.level_under(destination)?;

        // All checks passed; detach, then reinsert at the resolved slot.
        let mut node = self.store.remove_by_id(id)?;
        let index = match target {
            MoveTarget::Relative {
                anchor,
                position: position @ (MovePosition::Before | MovePosition::After),
            } => match self.navigator().find_parent_and_index(anchor) {
                Some(slot) if position == MovePosition::Before => slot.index,
                Some(slot) => slot.index + 1,
                None => {
                    self.restore(node, origin);
                    return Err(DomainError::NotFound(anchor));
                }
            },
            _ => usize::MAX,
        };

        node.parent_id = destination;
        node.relevel(level);
        node.touch(Utc::now());
        self.store.insert_at(destination, index, node)?;
        info!("moved node {} to {:?}", id, destination);
        Ok(())
    }

    fn restore(&mut self, node: Node, origin: Position) {
        let id = node.id;
        if let Err(e) = self.store.insert_at(origin.parent, origin.index, node) {
            warn!("failed to restore node {} after aborted move: {}", id, e);
        }
    }

    /// Delete a node; with `cascade` its whole subtree goes too.
    ///
    /// The reference store is told about every id in the subtree before
    /// the subtree is detached. Returns those ids.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_one(&mut self, id: NodeId, cascade: bool) -> DomainResult<Vec<NodeId>> {
        self.guard().check_deletable(id, cascade)?;
        let ids = self.navigator().collect_subtree_ids(id)?;

        let fallback = self.resolve_fallback(&ids);
        self.references.purge_or_reassign(&ids, fallback);
        self.store.remove_by_id(id)?;
        info!("deleted node {} ({} nodes removed)", id, ids.len());
        Ok(ids)
    }

    /// The store's reassign target, if it exists and survives deleting `ids`.
    fn resolve_fallback(&self, ids: &[NodeId]) -> Option<NodeId> {
        let target = self.references.reassign_target()?;
        if ids.contains(&target) {
            warn!("reassign target {} is being deleted, purging instead", target);
            None
        } else if !self.navigator().contains(target) {
            warn!("reassign target {} is not in this forest, purging instead", target);
            None
        } else {
            Some(target)
        }
    }

    /// Delete each id independently, collecting per-id failures.
    pub fn delete_batch(&mut self, ids: &[NodeId], cascade: bool) -> BatchDeleteOutcome {
        let mut outcome = BatchDeleteOutcome::default();
        for &id in ids {
            match self.delete_one(id, cascade) {
                Ok(_) => outcome.deleted_ids.push(id),
                Err(e) => {
                    debug!("delete_batch: {} failed: {}", id, e);
                    outcome.errors.push(BatchItemError::new(id, &e));
                }
            }
        }
        outcome
    }

    /// Overwrite `sort` values. Storage order is unchanged; unknown ids are
    /// reported in `skipped`.
    pub fn update_sort(&mut self, items: &[SortItem]) -> SortOutcome {
        let now = Utc::now();
        let mut outcome = SortOutcome::default();
        for item in items {
            match self.store.get_mut(item.id) {
                Some(node) => {
                    node.sort = item.sort;
                    node.touch(now);
                    outcome.updated.push(item.id);
                }
                None => outcome.skipped.push(item.id),
            }
        }
        if !outcome.skipped.is_empty() {
            debug!("update_sort: skipped unknown ids {:?}", outcome.skipped);
        }
        outcome
    }

    /// Append a forest fragment as new roots, with fresh ids from `next_id()`.
    ///
    /// The fragment is validated node by node against a scratch copy and
    /// swapped in only if every node passes. Returns the new root ids.
    #[instrument(level = "debug", skip(self, nodes), fields(roots = nodes.len()))]
    pub fn import(&mut self, nodes: Vec<Node>) -> DomainResult<Vec<NodeId>> {
        let mut next = self.store.next_id().0;
        let fragment = projector::renumber(nodes, None, 1, &mut next);
        let root_ids: Vec<NodeId> = fragment.iter().map(|n| n.id).collect();

        let mut scratch = self.store.clone();
        for node in projector::flatten(&fragment) {
            let guard = ValidationGuard::new(&scratch, self.kind);
            guard.check_label(&node.label)?;
            guard.check_payload_kind(&node.payload)?;
            guard.check_sibling_name_unique(node.parent_id, &node.label, None)?;
            guard.check_payload_path(&node.payload, None)?;
            match node.parent_id {
                Some(parent_id) => scratch.insert_child(parent_id, node)?,
                None => scratch.insert_root(node),
            }
        }

        self.store = scratch;
        info!("imported {} root nodes", root_ids.len());
        Ok(root_ids)
    }
}
