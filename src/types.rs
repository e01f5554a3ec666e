use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Opaque value produced by a successful unit of work.
pub type TaskValue = serde_json::Value;

/// Lifecycle state of a single task.
///
/// - `Pending`: registered (or reset) and not yet attempted in this run.
/// - `Running`: an attempt is in progress.
/// - `Completed`: the last attempt succeeded; a result is stored.
/// - `Failed`: the last attempt failed; an error message is stored.
/// - `Skipped`: reserved for tasks deliberately left out of a run. The
///   scheduler itself never assigns it; fail-fast leaves undispatched tasks
///   `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run dispatches tasks.
///
/// - `Sequential`: strict topological order, one task at a time.
/// - `Parallel`: independent tasks run concurrently on a bounded worker pool
///   (default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Sequential,
    Parallel,
}

impl RunMode {
    pub fn is_parallel(self) -> bool {
        matches!(self, RunMode::Parallel)
    }
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Parallel
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Sequential => f.write_str("sequential"),
            RunMode::Parallel => f.write_str("parallel"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(RunMode::Sequential),
            "parallel" => Ok(RunMode::Parallel),
            other => Err(format!(
                "invalid run mode: {other} (expected \"sequential\" or \"parallel\")"
            )),
        }
    }
}
