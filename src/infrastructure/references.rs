//! Resources holding a foreign key into a category forest
//!
//! Operators carry a `categoryId`; deleting a category purges them or moves
//! them onto a fallback node, depending on the configured policy.

use std::collections::HashSet;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::{CascadeConfig, CascadeMode};
use crate::domain::NodeId;
use crate::infrastructure::traits::ReferenceStore;

/// A resource pointing at one node (e.g. an operator and its category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencingResource {
    pub id: u64,
    pub name: String,
    pub category_id: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePolicy {
    /// Drop every resource pointing at a deleted node.
    Purge,
    /// Point resources at `target` instead.
    Reassign { target: NodeId },
}

impl TryFrom<&CascadeConfig> for CascadePolicy {
    type Error = ApplicationError;

    fn try_from(config: &CascadeConfig) -> ApplicationResult<Self> {
        match (config.policy, config.reassign_to) {
            (CascadeMode::Purge, _) => Ok(Self::Purge),
            (CascadeMode::Reassign, Some(target)) => Ok(Self::Reassign {
                target: NodeId(target),
            }),
            (CascadeMode::Reassign, None) => Err(ApplicationError::Config {
                message: "reassign policy needs a target node id".into(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct InMemoryReferenceStore {
    policy: CascadePolicy,
    resources: Mutex<Vec<ReferencingResource>>,
}

impl InMemoryReferenceStore {
    pub fn new(policy: CascadePolicy) -> Self {
        Self::with_resources(policy, Vec::new())
    }

    pub fn with_resources(policy: CascadePolicy, resources: Vec<ReferencingResource>) -> Self {
        Self {
            policy,
            resources: Mutex::new(resources),
        }
    }

    pub fn policy(&self) -> CascadePolicy {
        self.policy
    }

    /// Add a resource; the id is assigned as max + 1.
    pub fn add(&self, name: impl Into<String>, category_id: NodeId) -> ReferencingResource {
        let mut resources = self.resources.lock();
        let id = resources.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let resource = ReferencingResource {
            id,
            name: name.into(),
            category_id,
        };
        resources.push(resource.clone());
        resource
    }

    pub fn resources(&self) -> Vec<ReferencingResource> {
        self.resources.lock().clone()
    }

    /// Resources whose category is any of `ids` (e.g. all leaf ids of a subtree).
    pub fn by_categories(&self, ids: &[NodeId]) -> Vec<ReferencingResource> {
        let wanted: HashSet<NodeId> = ids.iter().copied().collect();
        self.resources
            .lock()
            .iter()
            .filter(|r| wanted.contains(&r.category_id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.lock().is_empty()
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn reassign_target(&self) -> Option<NodeId> {
        match self.policy {
            CascadePolicy::Reassign { target } => Some(target),
            CascadePolicy::Purge => None,
        }
    }

    fn purge_or_reassign(&self, ids: &[NodeId], fallback: Option<NodeId>) {
        let doomed: HashSet<NodeId> = ids.iter().copied().collect();
        let mut resources = self.resources.lock();
        match fallback {
            Some(target) if !doomed.contains(&target) => {
                let mut moved = 0usize;
                for resource in resources.iter_mut().filter(|r| doomed.contains(&r.category_id)) {
                    resource.category_id = target;
                    moved += 1;
                }
                debug!("reassigned {} resources to {}", moved, target);
            }
            _ => {
                let before = resources.len();
                resources.retain(|r| !doomed.contains(&r.category_id));
                debug!("purged {} resources", before - resources.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(policy: CascadePolicy) -> InMemoryReferenceStore {
        let store = InMemoryReferenceStore::new(policy);
        store.add("csv-reader", NodeId(9));
        store.add("json-reader", NodeId(10));
        store.add("shell", NodeId(11));
        store
    }

    #[test]
    fn given_purge_policy_when_ids_deleted_then_matching_resources_dropped() {
        let store = store(CascadePolicy::Purge);

        store.purge_or_reassign(&[NodeId(9), NodeId(10)], store.reassign_target());

        let names: Vec<_> = store.resources().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["shell"]);
    }

    #[test]
    fn given_reassign_policy_when_ids_deleted_then_resources_move_to_target() {
        let store = store(CascadePolicy::Reassign { target: NodeId(1) });

        store.purge_or_reassign(&[NodeId(9)], store.reassign_target());

        assert_eq!(store.len(), 3);
        assert_eq!(store.by_categories(&[NodeId(1)]).len(), 1);
    }

    #[test]
    fn given_reassign_target_among_deleted_when_cascading_then_purges() {
        let store = store(CascadePolicy::Reassign { target: NodeId(9) });

        store.purge_or_reassign(&[NodeId(9), NodeId(11)], Some(NodeId(9)));

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn given_no_fallback_when_reassign_policy_cascades_then_purges() {
        let store = store(CascadePolicy::Reassign { target: NodeId(99) });

        store.purge_or_reassign(&[NodeId(9)], None);

        assert_eq!(store.len(), 2);
        assert!(store.by_categories(&[NodeId(99)]).is_empty());
    }

    #[test]
    fn given_reassign_mode_without_target_when_converting_then_config_error() {
        let config = CascadeConfig {
            policy: CascadeMode::Reassign,
            reassign_to: None,
        };
        assert!(CascadePolicy::try_from(&config).is_err());
    }
}
