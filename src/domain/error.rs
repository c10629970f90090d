//! Domain-level errors (no external dependencies)

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entities::NodeId;

/// Domain errors represent tree invariant violations.
/// Every variant is detected before the forest is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("parent node not found: {0}")]
    ParentNotFound(NodeId),

    #[error("name '{name}' already used by a sibling under {}", parent_label(.parent))]
    DuplicateName {
        parent: Option<NodeId>,
        name: String,
    },

    #[error("path already in use: {0}")]
    DuplicatePath(String),

    #[error("node {0} has children, delete with cascade")]
    HasChildren(NodeId),

    #[error("cannot move node {subject} into its own subtree (target {target})")]
    CyclicMove { subject: NodeId, target: NodeId },

    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },
}

fn parent_label(parent: &Option<NodeId>) -> String {
    match parent {
        Some(id) => format!("node {}", id),
        None => "root".to_string(),
    }
}

impl DomainError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::ParentNotFound(_) => ErrorKind::ParentNotFound,
            DomainError::DuplicateName { .. } => ErrorKind::DuplicateName,
            DomainError::DuplicatePath(_) => ErrorKind::DuplicatePath,
            DomainError::HasChildren(_) => ErrorKind::HasChildren,
            DomainError::CyclicMove { .. } => ErrorKind::CyclicMove,
            DomainError::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }
}

/// Stable, serializable error discriminant for transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    ParentNotFound,
    DuplicateName,
    DuplicatePath,
    HasChildren,
    CyclicMove,
    InvalidInput,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
