//! Hierarchical tree management for menus and category forests.
//!
//! The domain layer holds the forest and its invariants, the application
//! layer serializes operations per namespace, and the infrastructure layer
//! persists snapshots and the resources pointing into a forest.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
