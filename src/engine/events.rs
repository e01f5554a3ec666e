// src/engine/events.rs

//! Structured events emitted by the orchestrator and the injected sink that
//! receives them.
//!
//! The engine never logs through a global; it reports every notable step to
//! an [`EventSink`] handed in at construction. [`TracingSink`] is the
//! production sink and forwards to `tracing`. Tests can record events instead.

use std::time::Duration;

use tracing::{Level, debug, error, info, warn};

use crate::engine::status::format_duration;
use crate::types::{RunMode, TaskName};

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    TaskRegistered {
        task: TaskName,
        dependencies: Vec<TaskName>,
    },
    TaskRemoved {
        task: TaskName,
    },
    RunStarted {
        mode: RunMode,
        tasks: usize,
        max_workers: usize,
    },
    PlanComputed {
        order: Vec<TaskName>,
    },
    AttemptStarted {
        task: TaskName,
        attempt: u32,
        max_attempts: u32,
    },
    /// A non-terminal failure: another attempt follows after `retry_in`.
    AttemptFailed {
        task: TaskName,
        attempt: u32,
        max_attempts: u32,
        error: String,
        retry_in: Duration,
    },
    TaskCompleted {
        task: TaskName,
        attempts: u32,
        duration: Option<Duration>,
    },
    /// Retries exhausted.
    TaskFailed {
        task: TaskName,
        attempts: u32,
        error: String,
    },
    /// An attempt outlived its advisory timeout. Nothing is interrupted.
    TimeoutExceeded {
        task: TaskName,
        attempt: u32,
        timeout: Duration,
        elapsed: Duration,
    },
    RunFinished {
        success: bool,
        completed: usize,
        failed: usize,
        duration: Option<Duration>,
    },
    Reset,
}

impl OrchestratorEvent {
    /// Severity the event should be reported at.
    pub fn level(&self) -> Level {
        match self {
            OrchestratorEvent::TaskRegistered { .. }
            | OrchestratorEvent::TaskRemoved { .. }
            | OrchestratorEvent::AttemptStarted { .. } => Level::DEBUG,
            OrchestratorEvent::RunStarted { .. }
            | OrchestratorEvent::PlanComputed { .. }
            | OrchestratorEvent::TaskCompleted { .. }
            | OrchestratorEvent::Reset => Level::INFO,
            OrchestratorEvent::AttemptFailed { .. } | OrchestratorEvent::TimeoutExceeded { .. } => {
                Level::WARN
            }
            OrchestratorEvent::TaskFailed { .. } => Level::ERROR,
            OrchestratorEvent::RunFinished { success, .. } => {
                if *success {
                    Level::INFO
                } else {
                    Level::ERROR
                }
            }
        }
    }

    /// Task the event is about, if any.
    pub fn task(&self) -> Option<&str> {
        match self {
            OrchestratorEvent::TaskRegistered { task, .. }
            | OrchestratorEvent::TaskRemoved { task }
            | OrchestratorEvent::AttemptStarted { task, .. }
            | OrchestratorEvent::AttemptFailed { task, .. }
            | OrchestratorEvent::TaskCompleted { task, .. }
            | OrchestratorEvent::TaskFailed { task, .. }
            | OrchestratorEvent::TimeoutExceeded { task, .. } => Some(task.as_str()),
            _ => None,
        }
    }
}

/// Receiver for orchestrator events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &OrchestratorEvent);
}

/// Default sink: structured `tracing` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &OrchestratorEvent) {
        match event {
            OrchestratorEvent::TaskRegistered { task, dependencies } => {
                debug!(task = %task, deps = ?dependencies, "task registered");
            }
            OrchestratorEvent::TaskRemoved { task } => {
                debug!(task = %task, "task removed");
            }
            OrchestratorEvent::RunStarted {
                mode,
                tasks,
                max_workers,
            } => {
                info!(%mode, tasks, max_workers, "starting run");
            }
            OrchestratorEvent::PlanComputed { order } => {
                info!(order = %order.join(" -> "), "execution order planned");
            }
            OrchestratorEvent::AttemptStarted {
                task,
                attempt,
                max_attempts,
            } => {
                if *attempt > 1 {
                    warn!(task = %task, attempt, max_attempts, "retrying task");
                } else {
                    debug!(task = %task, attempt, max_attempts, "starting task");
                }
            }
            OrchestratorEvent::AttemptFailed {
                task,
                attempt,
                max_attempts,
                error,
                retry_in,
            } => {
                warn!(
                    task = %task,
                    attempt,
                    max_attempts,
                    error = %error,
                    retry_in = %format_duration(*retry_in),
                    "attempt failed; will retry"
                );
            }
            OrchestratorEvent::TaskCompleted {
                task,
                attempts,
                duration,
            } => {
                info!(
                    task = %task,
                    attempts,
                    duration = %duration.map(format_duration).unwrap_or_default(),
                    "task completed"
                );
            }
            OrchestratorEvent::TaskFailed {
                task,
                attempts,
                error,
            } => {
                error!(task = %task, attempts, error = %error, "task failed; retries exhausted");
            }
            OrchestratorEvent::TimeoutExceeded {
                task,
                attempt,
                timeout,
                elapsed,
            } => {
                warn!(
                    task = %task,
                    attempt,
                    timeout = %format_duration(*timeout),
                    elapsed = %format_duration(*elapsed),
                    "attempt exceeded its advisory timeout"
                );
            }
            OrchestratorEvent::RunFinished {
                success,
                completed,
                failed,
                duration,
            } => {
                let duration = duration.map(format_duration).unwrap_or_default();
                if *success {
                    info!(completed, failed, duration = %duration, "run finished");
                } else {
                    error!(completed, failed, duration = %duration, "run failed");
                }
            }
            OrchestratorEvent::Reset => {
                info!("orchestrator reset");
            }
        }
    }
}
