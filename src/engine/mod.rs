// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the [`Orchestrator`] facade (registration, planning, runs, reset)
//! - the [`Scheduler`] that dispatches tasks sequentially or over a bounded
//!   worker pool
//! - the [`RetryPolicy`] attempt loop
//! - [`StatusReporter`] snapshots
//! - the [`EventSink`] every notable step is reported to

pub mod events;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod status;

pub use crate::types::{RunMode, TaskName, TaskStatus, TaskValue};
pub use events::{EventSink, OrchestratorEvent, TracingSink};
pub use orchestrator::{DEFAULT_MAX_WORKERS, Orchestrator, OrchestratorSettings, TaskHandle};
pub use retry::{DEFAULT_RETRY_DELAY, RetryPolicy};
pub use scheduler::{RunOutcome, Scheduler};
pub use status::{StatusReporter, StatusSnapshot, TaskSnapshot, format_duration};
