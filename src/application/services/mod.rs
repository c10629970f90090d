//! Application services
//!
//! Concrete service implementations that orchestrate the engine.
//! Services depend on boundary traits (ReferenceStore, FileSystem)
//! but are themselves concrete structs, not traits.

mod forest;
mod registry;

pub use forest::{ForestService, ForestSnapshot};
pub use registry::ForestRegistry;
