//! Canonical in-memory forest for one tree namespace.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::entities::{Node, NodeId};
use crate::domain::error::{DomainError, DomainResult};

/// Owns the forest as nested, by-value containers.
///
/// Primitive operations only: lookup, insert, remove, iterate. Nothing here
/// validates names or cascades; that belongs to the guard and the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeStore {
    roots: Vec<Node>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    /// Adopt an existing forest. Nesting is authoritative: every node's
    /// `parent_id` and `level` are rewritten from its position.
    pub fn from_roots(mut roots: Vec<Node>) -> Self {
        for root in &mut roots {
            root.parent_id = None;
            root.relevel(1);
        }
        Self { roots }
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<Node> {
        self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of nodes in the whole forest.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.iter().find(|node| node.id == id)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        find_mut(&mut self.roots, id)
    }

    /// Children of `parent`, or the root list for `None`.
    /// Returns `None` when `parent` does not resolve.
    pub fn children_of(&self, parent: Option<NodeId>) -> Option<&[Node]> {
        match parent {
            None => Some(&self.roots),
            Some(id) => self.get(id).map(|node| node.children.as_slice()),
        }
    }

    fn children_of_mut(&mut self, parent: Option<NodeId>) -> Option<&mut Vec<Node>> {
        match parent {
            None => Some(&mut self.roots),
            Some(id) => self.get_mut(id).map(|node| &mut node.children),
        }
    }

    pub fn insert_root(&mut self, node: Node) {
        self.roots.push(node);
    }

    /// Append `node` as the last child of `parent_id`.
    pub fn insert_child(&mut self, parent_id: NodeId, node: Node) -> DomainResult<()> {
        let parent = self
            .get_mut(parent_id)
            .ok_or(DomainError::NotFound(parent_id))?;
        parent.children.push(node);
        Ok(())
    }

    /// Splice `node` into the children of `parent` (root list for `None`).
    /// `index` is clamped to the end of the list.
    pub fn insert_at(&mut self, parent: Option<NodeId>, index: usize, node: Node) -> DomainResult<()> {
        let siblings = self
            .children_of_mut(parent)
            .ok_or_else(|| DomainError::NotFound(parent.unwrap_or(node.id)))?;
        let index = index.min(siblings.len());
        siblings.insert(index, node);
        Ok(())
    }

    /// Detach a single node (with its subtree) from wherever it lives.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_by_id(&mut self, id: NodeId) -> DomainResult<Node> {
        remove_from(&mut self.roots, id).ok_or(DomainError::NotFound(id))
    }

    /// `max(id) + 1` over the current forest, `1` when empty.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.iter().map(|node| node.id.0).max().map_or(1, |max| max + 1))
    }

    /// Depth-first pre-order traversal over all roots.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst::new(&self.roots)
    }
}

fn find_mut(nodes: &mut [Node], id: NodeId) -> Option<&mut Node> {
    for node in nodes.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove_from(nodes: &mut Vec<Node>, id: NodeId) -> Option<Node> {
    if let Some(index) = nodes.iter().position(|node| node.id == id) {
        return Some(nodes.remove(index));
    }
    nodes
        .iter_mut()
        .find_map(|node| remove_from(&mut node.children, id))
}

/// Pre-order iterator: parent first, then its children left to right.
pub struct DepthFirst<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> DepthFirst<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        Self {
            stack: nodes.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        for child in current.children.iter().rev() {
            self.stack.push(child);
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CategoryPayload, NodeStatus, Payload};
    use chrono::Utc;

    fn leaf(id: u64, label: &str) -> Node {
        let now = Utc::now();
        Node {
            id: NodeId(id),
            parent_id: None,
            label: label.to_string(),
            sort: 0,
            level: 0,
            status: NodeStatus::Enabled,
            created_at: now,
            updated_at: now,
            payload: Payload::Category(CategoryPayload::default()),
            children: Vec::new(),
        }
    }

    fn sample() -> NodeStore {
        let mut a = leaf(1, "a");
        let mut b = leaf(2, "b");
        b.children.push(leaf(4, "d"));
        a.children.push(b);
        a.children.push(leaf(3, "c"));
        NodeStore::from_roots(vec![a, leaf(5, "e")])
    }

    #[test]
    fn given_nested_roots_when_adopting_then_parent_and_level_follow_nesting() {
        let store = sample();
        let d = store.get(NodeId(4)).unwrap();
        assert_eq!(d.parent_id, Some(NodeId(2)));
        assert_eq!(d.level, 3);
        assert_eq!(store.get(NodeId(5)).unwrap().level, 1);
    }

    #[test]
    fn given_forest_when_iterating_then_pre_order() {
        let ids: Vec<u64> = sample().iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![1, 2, 4, 3, 5]);
    }

    #[test]
    fn given_highest_id_removed_when_next_id_then_derived_from_current_max() {
        let mut store = sample();
        assert_eq!(store.next_id(), NodeId(6));
        store.remove_by_id(NodeId(5)).unwrap();
        assert_eq!(store.next_id(), NodeId(5));
        assert_eq!(NodeStore::new().next_id(), NodeId(1));
    }

    #[test]
    fn given_missing_parent_when_inserting_child_then_not_found() {
        let mut store = sample();
        let err = store.insert_child(NodeId(42), leaf(6, "f")).unwrap_err();
        assert_eq!(err, DomainError::NotFound(NodeId(42)));
    }

    #[test]
    fn given_nested_node_when_removing_then_subtree_detached_as_unit() {
        let mut store = sample();
        let removed = store.remove_by_id(NodeId(2)).unwrap();
        assert_eq!(removed.children.len(), 1);
        assert!(store.get(NodeId(4)).is_none());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn given_index_past_end_when_inserting_at_then_appends() {
        let mut store = sample();
        store.insert_at(Some(NodeId(1)), 99, leaf(6, "f")).unwrap();
        let children: Vec<u64> = store.get(NodeId(1)).unwrap().children.iter().map(|n| n.id.0).collect();
        assert_eq!(children, vec![2, 3, 6]);
    }
}
