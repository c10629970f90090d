//! Pure pre-mutation checks. Nothing in here mutates the forest.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::entities::{NodeId, Payload, TreeKind};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::navigator::TreeNavigator;
use crate::domain::store::NodeStore;

pub struct ValidationGuard<'a> {
    store: &'a NodeStore,
    kind: TreeKind,
}

impl<'a> ValidationGuard<'a> {
    pub fn new(store: &'a NodeStore, kind: TreeKind) -> Self {
        Self { store, kind }
    }

    fn navigator(&self) -> TreeNavigator<'a> {
        TreeNavigator::new(self.store)
    }

    pub fn check_label(&self, label: &str) -> DomainResult<()> {
        if label.trim().is_empty() {
            return Err(DomainError::invalid("label", "must not be empty"));
        }
        Ok(())
    }

    pub fn check_payload_kind(&self, payload: &Payload) -> DomainResult<()> {
        if payload.kind() != self.kind {
            return Err(DomainError::invalid(
                "payload",
                format!("{} payload not accepted by a {} tree", payload.kind(), self.kind),
            ));
        }
        Ok(())
    }

    pub fn check_exists(&self, id: NodeId) -> DomainResult<()> {
        self.navigator().find_by_id(id).map(|_| ())
    }

    pub fn check_parent_exists(&self, parent: Option<NodeId>) -> DomainResult<()> {
        match parent {
            Some(id) if !self.navigator().contains(id) => Err(DomainError::ParentNotFound(id)),
            _ => Ok(()),
        }
    }

    pub fn check_sibling_name_unique(
        &self,
        parent: Option<NodeId>,
        name: &str,
        exclude: Option<NodeId>,
    ) -> DomainResult<()> {
        let taken = self
            .navigator()
            .siblings(parent)
            .iter()
            .any(|sibling| sibling.label == name && Some(sibling.id) != exclude);
        if taken {
            debug!("check_sibling_name_unique: '{}' taken under {:?}", name, parent);
            return Err(DomainError::DuplicateName {
                parent,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn check_global_path_unique(&self, path: &str, exclude: Option<NodeId>) -> DomainResult<()> {
        let taken = self
            .store
            .iter()
            .any(|node| node.unique_path() == Some(path) && Some(node.id) != exclude);
        if taken {
            return Err(DomainError::DuplicatePath(path.to_string()));
        }
        Ok(())
    }

    /// Checks path uniqueness only where the tree kind requires it.
    pub fn check_payload_path(&self, payload: &Payload, exclude: Option<NodeId>) -> DomainResult<()> {
        match payload.unique_path() {
            Some(path) if self.kind.enforces_unique_paths() => {
                self.check_global_path_unique(path, exclude)
            }
            _ => Ok(()),
        }
    }

    /// Rejects a move whose new parent is the subject or lies inside its subtree.
    pub fn check_not_descendant(&self, candidate_parent: NodeId, subject: NodeId) -> DomainResult<()> {
        let subtree = self.navigator().collect_subtree_ids(subject)?;
        if subtree.contains(&candidate_parent) {
            return Err(DomainError::CyclicMove {
                subject,
                target: candidate_parent,
            });
        }
        Ok(())
    }

    pub fn check_deletable(&self, id: NodeId, cascade: bool) -> DomainResult<()> {
        let node = self.navigator().find_by_id(id)?;
        if !node.is_leaf() && !cascade {
            return Err(DomainError::HasChildren(id));
        }
        Ok(())
    }

    /// Structural integrity of an adopted forest: unique ids, payloads of
    /// the right kind, sibling names and (for menus) paths unique.
    pub fn check_integrity(&self) -> DomainResult<()> {
        let mut ids = HashSet::new();
        let mut paths = HashSet::new();
        for node in self.store.iter() {
            if !ids.insert(node.id) {
                return Err(DomainError::invalid("id", format!("duplicate node id {}", node.id)));
            }
            self.check_label(&node.label)?;
            self.check_payload_kind(&node.payload)?;
            if self.kind.enforces_unique_paths() {
                if let Some(path) = node.unique_path() {
                    if !paths.insert(path) {
                        return Err(DomainError::DuplicatePath(path.to_string()));
                    }
                }
            }
        }
        for parent in std::iter::once(None).chain(self.store.iter().map(|n| Some(n.id))) {
            let mut names = HashSet::new();
            for sibling in self.navigator().siblings(parent) {
                if !names.insert(sibling.label.as_str()) {
                    return Err(DomainError::DuplicateName {
                        parent,
                        name: sibling.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
