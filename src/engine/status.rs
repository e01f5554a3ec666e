// src/engine/status.rs

//! Read-only status snapshots.
//!
//! A [`StatusReporter`] is a cheap, cloneable handle onto the graph and the
//! run bookkeeping. It can be moved into another task or thread and queried
//! while a run is in progress. Each snapshot is taken under a single read
//! lock; a task caught mid-attempt simply shows up as `Running`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::dag::{DependencyGraph, SharedGraph, TaskRecord};
use crate::types::{TaskName, TaskStatus};

/// Run-level bookkeeping shared between the orchestrator and reporters.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    window: Mutex<RunWindow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunWindow {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip `running` from false to true. Returns `false` if a run was
    /// already active.
    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn window(&self) -> RunWindow {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stamp_start(&self) {
        let mut w = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        w.start_time = Some(Utc::now());
        w.end_time = None;
    }

    pub fn stamp_end(&self) {
        let mut w = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        w.end_time = Some(Utc::now());
    }

    pub fn clear_window(&self) {
        *self.window.lock().unwrap_or_else(PoisonError::into_inner) = RunWindow::default();
    }
}

/// Per-task entry of a [`StatusSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub name: TaskName,
    pub description: String,
    pub dependencies: Vec<TaskName>,
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Option<Duration>,
    pub attempts: u32,
    /// Error message, only when `status == Failed`.
    pub error: Option<String>,
}

impl TaskSnapshot {
    pub fn from_record(task: &TaskRecord) -> Self {
        let state = task.state();
        Self {
            name: task.name().to_string(),
            description: task.description().to_string(),
            dependencies: task.dependencies().to_vec(),
            status: state.status,
            start_time: state.start_time,
            end_time: state.end_time,
            duration: state.duration(),
            attempts: state.attempts,
            error: match state.status {
                TaskStatus::Failed => state.last_error.clone(),
                _ => None,
            },
        }
    }
}

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    /// Tasks in registration order.
    pub tasks: Vec<TaskSnapshot>,
}

impl StatusSnapshot {
    pub fn build(graph: &DependencyGraph, run: &RunState) -> Self {
        let tasks: Vec<TaskSnapshot> = graph.records().map(TaskSnapshot::from_record).collect();
        let window = run.window();

        Self {
            is_running: run.is_running(),
            start_time: window.start_time,
            end_time: window.end_time,
            total_tasks: tasks.len(),
            completed_tasks: count(&tasks, TaskStatus::Completed),
            failed_tasks: count(&tasks, TaskStatus::Failed),
            tasks,
        }
    }

    pub fn task(&self, name: &str) -> Option<&TaskSnapshot> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Wall-clock duration of the run, once it has ended.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

fn count(tasks: &[TaskSnapshot], status: TaskStatus) -> usize {
    tasks.iter().filter(|t| t.status == status).count()
}

fn serialize_secs<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => s.serialize_some(&d.as_secs_f64()),
        None => s.serialize_none(),
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "tasks: {} total, {} completed, {} failed{}",
            self.total_tasks,
            self.completed_tasks,
            self.failed_tasks,
            if self.is_running { " (running)" } else { "" }
        )?;
        if let Some(d) = self.duration() {
            writeln!(f, "run duration: {}", format_duration(d))?;
        }

        let width = self.tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);
        for t in &self.tasks {
            let duration = t.duration.map(format_duration).unwrap_or_else(|| "-".into());
            write!(
                f,
                "  {:<width$}  {:<9}  attempts={}  {}",
                t.name,
                t.status.as_str(),
                t.attempts,
                duration,
            )?;
            if let Some(ref err) = t.error {
                write!(f, "  error: {err}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Cloneable read-only handle used to take snapshots.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    graph: SharedGraph,
    run: Arc<RunState>,
}

impl StatusReporter {
    pub fn new(graph: SharedGraph, run: Arc<RunState>) -> Self {
        Self { graph, run }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let graph = self.graph.read();
        StatusSnapshot::build(&graph, &self.run)
    }

    /// Status of a single task, if registered.
    pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
        self.graph.read().get(name).map(|t| t.status())
    }
}

/// Human-readable duration: `"1.50s"`, `"2m 3.00s"`, `"1h 0m 5.00s"`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs_f64();
    if total < 60.0 {
        return format!("{total:.2}s");
    }

    let minutes = (total / 60.0).floor() as u64;
    let seconds = total - (minutes as f64) * 60.0;
    if minutes < 60 {
        return format!("{minutes}m {seconds:.2}s");
    }

    let hours = minutes / 60;
    let minutes = minutes % 60;
    format!("{hours}h {minutes}m {seconds:.2}s")
}
