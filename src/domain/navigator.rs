//! Read-only traversal over a [`NodeStore`].

use tracing::instrument;

use crate::domain::entities::{Node, NodeId, Position};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::store::{DepthFirst, NodeStore};

/// Path returned by [`TreeNavigator::ancestor_path`] when the id does not resolve.
pub const UNCATEGORIZED: &str = "Uncategorized";

pub struct TreeNavigator<'a> {
    store: &'a NodeStore,
}

impl<'a> TreeNavigator<'a> {
    pub fn new(store: &'a NodeStore) -> Self {
        Self { store }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.store.get(id).is_some()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn find_by_id(&self, id: NodeId) -> DomainResult<&'a Node> {
        self.store.get(id).ok_or(DomainError::NotFound(id))
    }

    /// Owning parent and index among siblings.
    ///
    /// Root-level nodes yield `Some(Position { parent: None, .. })`;
    /// `None` means the id is absent.
    #[instrument(level = "trace", skip(self))]
    pub fn find_parent_and_index(&self, id: NodeId) -> Option<Position> {
        locate(self.store.roots(), None, id)
    }

    /// Siblings under `parent` (the root list for `None`); empty when
    /// `parent` does not resolve.
    pub fn siblings(&self, parent: Option<NodeId>) -> &'a [Node] {
        self.store.children_of(parent).unwrap_or(&[])
    }

    /// All ids in the subtree rooted at `id`, `id` first, depth-first.
    #[instrument(level = "trace", skip(self))]
    pub fn collect_subtree_ids(&self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        let node = self.find_by_id(id)?;
        Ok(DepthFirst::new(std::slice::from_ref(node))
            .map(|n| n.id)
            .collect())
    }

    /// Ids of nodes without children under `nodes`, depth-first.
    pub fn collect_leaf_ids(nodes: &[Node]) -> Vec<NodeId> {
        DepthFirst::new(nodes)
            .filter(|n| n.is_leaf())
            .map(|n| n.id)
            .collect()
    }

    pub fn leaf_ids(&self) -> Vec<NodeId> {
        Self::collect_leaf_ids(self.store.roots())
    }

    /// Ids from the root down to `id` inclusive, `None` if absent.
    pub fn ancestor_ids(&self, id: NodeId) -> Option<Vec<NodeId>> {
        let mut trail = Vec::new();
        if trail_to(self.store.roots(), id, &mut trail) {
            Some(trail.iter().map(|n| n.id).collect())
        } else {
            None
        }
    }

    /// Labels from the root down to `id` inclusive.
    /// Falls back to `[UNCATEGORIZED]` when `id` cannot be resolved.
    #[instrument(level = "debug", skip(self))]
    pub fn ancestor_path(&self, id: NodeId) -> Vec<String> {
        let mut trail = Vec::new();
        if trail_to(self.store.roots(), id, &mut trail) {
            trail.iter().map(|n| n.label.clone()).collect()
        } else {
            vec![UNCATEGORIZED.to_string()]
        }
    }

    /// Number of levels of the deepest branch, 0 for an empty forest.
    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            1 + node.children.iter().map(depth_of).max().unwrap_or(0)
        }
        self.store.roots().iter().map(depth_of).max().unwrap_or(0)
    }
}

fn locate(nodes: &[Node], parent: Option<NodeId>, id: NodeId) -> Option<Position> {
    if let Some(index) = nodes.iter().position(|n| n.id == id) {
        return Some(Position { parent, index });
    }
    nodes
        .iter()
        .find_map(|n| locate(&n.children, Some(n.id), id))
}

fn trail_to<'a>(nodes: &'a [Node], id: NodeId, trail: &mut Vec<&'a Node>) -> bool {
    for node in nodes {
        trail.push(node);
        if node.id == id || trail_to(&node.children, id, trail) {
            return true;
        }
        trail.pop();
    }
    false
}
