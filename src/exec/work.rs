// src/exec/work.rs

//! The unit-of-work abstraction executed by the scheduler.
//!
//! The engine never looks inside a work item: it only calls
//! [`Work::invoke`] and records the value or the error. Arguments are bound
//! when the work item is built, typically by capturing them in a closure:
//!
//! ```
//! use serde_json::json;
//! use taskdag::exec::Work;
//!
//! let input = 20;
//! let work = move || -> anyhow::Result<serde_json::Value> { Ok(json!(input + 1)) };
//! assert_eq!(work.invoke().unwrap(), json!(21));
//! ```

use std::sync::Arc;

use crate::types::TaskValue;

/// A single, synchronous, possibly blocking unit of work.
///
/// Implementations must be callable more than once: the retry policy invokes
/// the same work item again after a failed attempt.
pub trait Work: Send + Sync {
    fn invoke(&self) -> anyhow::Result<TaskValue>;
}

impl<F> Work for F
where
    F: Fn() -> anyhow::Result<TaskValue> + Send + Sync,
{
    fn invoke(&self) -> anyhow::Result<TaskValue> {
        self()
    }
}

/// Shared, type-erased work item as stored in the task graph.
pub type SharedWork = Arc<dyn Work>;
