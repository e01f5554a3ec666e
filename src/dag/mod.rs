// src/dag/mod.rs

//! Task definitions and the dependency graph that owns them.
//!
//! - [`task`] holds the registration spec and the per-task record (definition
//!   plus mutable runtime state).
//! - [`graph`] holds the arena of records keyed by name, dependency
//!   validation, cycle detection and topological planning.

pub mod graph;
pub mod task;

pub use graph::{DependencyGraph, SharedGraph, TaskId};
pub use task::{TaskRecord, TaskSpec, TaskState};
