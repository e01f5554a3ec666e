// src/dag/task.rs

//! Task definitions and their per-run state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::exec::{SharedWork, Work};
use crate::types::{TaskName, TaskStatus, TaskValue};

/// Everything needed to register a task.
///
/// ```
/// use std::time::Duration;
/// use taskdag::dag::TaskSpec;
///
/// let spec = TaskSpec::from_fn("report", || Ok(serde_json::json!("done")))
///     .after("extract")
///     .after("transform")
///     .retries(2)
///     .timeout(Duration::from_secs(30))
///     .description("Build the weekly report");
/// assert_eq!(spec.name(), "report");
/// ```
pub struct TaskSpec {
    name: TaskName,
    work: SharedWork,
    dependencies: Vec<TaskName>,
    retry_limit: u32,
    timeout: Option<Duration>,
    description: Option<String>,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>, work: impl Work + 'static) -> Self {
        Self::from_shared(name, Arc::new(work))
    }

    /// Like [`TaskSpec::new`], but lets closures infer their signature.
    pub fn from_fn<F>(name: impl Into<TaskName>, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<TaskValue> + Send + Sync + 'static,
    {
        Self::from_shared(name, Arc::new(f))
    }

    pub fn from_shared(name: impl Into<TaskName>, work: SharedWork) -> Self {
        Self {
            name: name.into(),
            work,
            dependencies: Vec::new(),
            retry_limit: 0,
            timeout: None,
            description: None,
        }
    }

    /// Add a dependency: this task waits until `dep` has completed.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    pub fn after_all<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Number of extra attempts after the first failure.
    pub fn retries(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Advisory timeout. Attempts are never interrupted; overruns are only
    /// reported.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("retry_limit", &self.retry_limit)
            .field("timeout", &self.timeout)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Mutable runtime state of a task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskState {
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Attempts made in the current run.
    pub attempts: u32,
    /// Set only while `status == Completed`.
    pub result: Option<TaskValue>,
    /// Set only while `status == Failed`.
    pub last_error: Option<String>,
}

impl TaskState {
    /// `end_time - start_time` when both are set.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

/// A registered task: immutable definition plus runtime state.
pub struct TaskRecord {
    name: TaskName,
    work: SharedWork,
    dependencies: Vec<TaskName>,
    retry_limit: u32,
    timeout: Option<Duration>,
    description: String,
    state: TaskState,
}

impl TaskRecord {
    /// Build a record from a spec. Duplicate dependencies collapse into one,
    /// keeping the order of first mention.
    pub fn from_spec(spec: TaskSpec) -> Self {
        let mut dependencies: Vec<TaskName> = Vec::with_capacity(spec.dependencies.len());
        for dep in spec.dependencies {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }

        let description = spec
            .description
            .unwrap_or_else(|| format!("Task: {}", spec.name));

        Self {
            name: spec.name,
            work: spec.work,
            dependencies,
            retry_limit: spec.retry_limit,
            timeout: spec.timeout,
            description,
            state: TaskState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn work(&self) -> SharedWork {
        Arc::clone(&self.work)
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// `retry_limit + 1`.
    pub fn max_attempts(&self) -> u32 {
        self.retry_limit.saturating_add(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status
    }

    /// Enter `Running` for a new attempt and return the attempt number
    /// (1-based).
    pub fn begin_attempt(&mut self) -> u32 {
        self.state.status = TaskStatus::Running;
        self.state.start_time = Some(Utc::now());
        self.state.end_time = None;
        self.state.last_error = None;
        self.state.attempts += 1;
        self.state.attempts
    }

    /// Record a successful attempt.
    pub fn complete(&mut self, value: TaskValue) {
        self.state.status = TaskStatus::Completed;
        self.state.result = Some(value);
        self.state.end_time = Some(Utc::now());
    }

    /// Record a failed attempt. Any previous result stays untouched.
    pub fn fail(&mut self, error: String) {
        self.state.status = TaskStatus::Failed;
        self.state.last_error = Some(error);
        self.state.end_time = Some(Utc::now());
    }

    /// Back to `Pending` with no timestamps, result, error or attempts.
    pub fn reset(&mut self) {
        self.state = TaskState::default();
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("retry_limit", &self.retry_limit)
            .field("timeout", &self.timeout)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
