//! Application layer: engine and services
//!
//! This layer orchestrates domain logic and depends on boundary traits.

pub mod engine;
pub mod error;
pub mod services;

pub use engine::MutationEngine;
pub use error::{ApplicationError, ApplicationResult};
