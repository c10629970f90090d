//! Domain layer: tree entities and algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod guard;
pub mod navigator;
pub mod projector;
pub mod store;

pub use entities::*;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use guard::ValidationGuard;
pub use navigator::{TreeNavigator, UNCATEGORIZED};
pub use store::{DepthFirst, NodeStore};
