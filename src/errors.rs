// src/errors.rs

//! Crate-wide error types.
//!
//! The taxonomy follows who can recover from what:
//! - [`RegistrationError`] and [`ValidationError`] are returned synchronously
//!   to the caller that registered or planned the tasks.
//! - [`ExecutionError`] is fatal to a run and comes out of `run()`.
//! - [`StateError`] reports misuse of the orchestrator while a run is active.
//!
//! [`TaskdagError`] wraps all of them plus config/IO failures for callers that
//! only want a single error type.

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("task '{0}' already exists")]
    DuplicateTask(TaskName),

    #[error("task '{0}' not found")]
    TaskNotFound(TaskName),

    #[error("cannot remove task '{task}': required by {}", .dependents.join(", "))]
    DependentsExist {
        task: TaskName,
        dependents: Vec<TaskName>,
    },

    #[error("task '{0}' cannot depend on itself")]
    SelfDependency(TaskName),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task '{task}' depends on '{dependency}' which does not exist")]
    UnknownDependency {
        task: TaskName,
        dependency: TaskName,
    },

    #[error("cyclic dependency detected among tasks: {}", .members.join(", "))]
    CyclicDependency { members: Vec<TaskName> },

    #[error("validation failed: {}", .errors.join("; "))]
    Invalid { errors: Vec<String> },
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("task '{task}' failed after {attempts} attempt(s): {cause:#}")]
    TaskFailed {
        task: TaskName,
        attempts: u32,
        #[source]
        cause: anyhow::Error,
    },

    #[error("no task is ready but {} task(s) never completed: {}", .remaining.len(), .remaining.join(", "))]
    Stalled { remaining: Vec<TaskName> },

    #[error("a worker was lost before reporting back: {message}")]
    WorkerLost { message: String },
}

impl ExecutionError {
    /// Name of the task this error is about, if any.
    pub fn task(&self) -> Option<&str> {
        match self {
            ExecutionError::TaskFailed { task, .. } => Some(task.as_str()),
            ExecutionError::Stalled { .. } | ExecutionError::WorkerLost { .. } => None,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("cannot reset while a run is in progress")]
    CannotResetWhileRunning,

    #[error("cannot change the task graph while a run is in progress")]
    GraphLocked,
}

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdagError>;
