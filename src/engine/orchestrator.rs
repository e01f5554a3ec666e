// src/engine/orchestrator.rs

//! Public entry point: register tasks, plan, run, inspect, reset.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::config::ConfigFile;
use crate::dag::{DependencyGraph, SharedGraph, TaskSpec};
use crate::engine::events::{EventSink, OrchestratorEvent, TracingSink};
use crate::engine::retry::{DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::engine::scheduler::Scheduler;
use crate::engine::status::{RunState, StatusReporter, StatusSnapshot, TaskSnapshot};
use crate::errors::{Result, StateError};
use crate::exec::CommandWork;
use crate::types::{RunMode, TaskName, TaskValue};

/// Default size of the worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Knobs that apply to every run of an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Worker pool size for [`RunMode::Parallel`]. Values below 1 are treated
    /// as 1.
    pub max_workers: usize,
    /// Fixed pause between attempts of a failing task.
    pub retry_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl OrchestratorSettings {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Handle returned by [`Orchestrator::register`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    name: TaskName,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Owns the task graph and drives runs over it.
///
/// All methods take `&self`, so an `Arc<Orchestrator>` can be shared between
/// the task awaiting [`Orchestrator::run`] and tasks polling
/// [`Orchestrator::status`].
pub struct Orchestrator {
    graph: SharedGraph,
    run: Arc<RunState>,
    results: Mutex<HashMap<TaskName, TaskValue>>,
    settings: OrchestratorSettings,
    sink: Arc<dyn EventSink>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorSettings::default())
    }
}

impl Orchestrator {
    /// Orchestrator reporting through [`TracingSink`].
    pub fn new(settings: OrchestratorSettings) -> Self {
        Self::with_sink(settings, Arc::new(TracingSink))
    }

    pub fn with_sink(settings: OrchestratorSettings, sink: Arc<dyn EventSink>) -> Self {
        Self {
            graph: SharedGraph::new(DependencyGraph::new()),
            run: Arc::new(RunState::default()),
            results: Mutex::new(HashMap::new()),
            settings,
            sink,
        }
    }

    /// Build an orchestrator whose tasks run the shell commands of a
    /// validated config. Commands run in `workdir`.
    pub fn from_config(
        cfg: &ConfigFile,
        workdir: &Path,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let orch = Self::with_sink(cfg.settings(), sink);

        for (name, task) in cfg.task.iter() {
            let work = CommandWork::new(name.clone(), task.cmd.clone()).current_dir(workdir);
            let mut spec = TaskSpec::new(name.clone(), work)
                .after_all(task.after.iter().cloned())
                .retries(task.retries);
            if let Some(timeout) = task.timeout_duration() {
                spec = spec.timeout(timeout);
            }
            if let Some(ref description) = task.description {
                spec = spec.description(description.clone());
            }
            orch.register(spec)?;
        }

        Ok(orch)
    }

    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    pub fn len(&self) -> usize {
        self.graph.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.read().is_empty()
    }

    /// Task names in registration order.
    pub fn task_names(&self) -> Vec<TaskName> {
        self.graph.read().names().map(str::to_string).collect()
    }

    pub fn task(&self, name: &str) -> Option<TaskSnapshot> {
        self.graph.read().get(name).map(TaskSnapshot::from_record)
    }

    pub fn register(&self, spec: TaskSpec) -> Result<TaskHandle> {
        let name = spec.name().to_string();
        let dependencies = spec.dependencies().to_vec();
        {
            // The running flag only flips under this lock; see `begin_run`.
            let mut graph = self.graph.write();
            if self.run.is_running() {
                return Err(StateError::GraphLocked.into());
            }
            graph.add_task(spec)?;
        }

        self.sink.emit(&OrchestratorEvent::TaskRegistered {
            task: name.clone(),
            dependencies,
        });
        Ok(TaskHandle { name })
    }

    /// Remove a task nothing depends on.
    pub fn unregister(&self, name: &str) -> Result<()> {
        {
            let mut graph = self.graph.write();
            if self.run.is_running() {
                return Err(StateError::GraphLocked.into());
            }
            graph.remove_task(name)?;
        }
        self.sink.emit(&OrchestratorEvent::TaskRemoved {
            task: name.to_string(),
        });
        Ok(())
    }

    /// Dependency problems as human-readable messages; empty when valid.
    pub fn validate(&self) -> Vec<String> {
        self.graph
            .read()
            .validate()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Validate and compute the execution order.
    pub fn plan(&self) -> Result<Vec<TaskName>> {
        let graph = self.graph.read();
        let order = graph.plan()?;
        Ok(order
            .into_iter()
            .map(|id| graph.task(id).name().to_string())
            .collect())
    }

    /// Run every task once, from a fresh state.
    ///
    /// Returns the results of all tasks on success. On the first terminal
    /// failure the run stops dispatching, waits for in-flight attempts, and
    /// returns the failure; [`Orchestrator::results`] still holds whatever
    /// completed.
    pub async fn run(&self, mode: RunMode) -> Result<HashMap<TaskName, TaskValue>> {
        let outcome = {
            let _guard = self.begin_run()?;
            let outcome = self.run_planned(mode).await;
            self.run.stamp_end();
            outcome
        };

        // Taken once the guard is gone, so sinks that query status see the
        // run as finished.
        let snapshot = self.status();
        self.sink.emit(&OrchestratorEvent::RunFinished {
            success: outcome.is_ok(),
            completed: snapshot.completed_tasks,
            failed: snapshot.failed_tasks,
            duration: snapshot.duration(),
        });

        outcome
    }

    /// Mark the run as started and wipe the previous run's state.
    ///
    /// The flag flips while the graph write lock is held, so a concurrent
    /// `register`/`unregister` either finishes before the plan is taken or
    /// sees the run and fails with `GraphLocked`.
    fn begin_run(&self) -> Result<RunGuard<'_>> {
        let mut graph = self.graph.write();
        let guard = RunGuard::acquire(&self.run)?;

        self.run.stamp_start();
        self.lock_results().clear();
        graph.reset_all();
        Ok(guard)
    }

    async fn run_planned(&self, mode: RunMode) -> Result<HashMap<TaskName, TaskValue>> {
        let (order, names) = {
            let graph = self.graph.read();
            let order = graph.plan()?;
            let names: Vec<TaskName> = order
                .iter()
                .map(|&id| graph.task(id).name().to_string())
                .collect();
            (order, names)
        };

        let scheduler = Scheduler::new(
            self.graph.clone(),
            RetryPolicy::fixed(self.settings.retry_delay),
            Arc::clone(&self.sink),
            self.settings.max_workers,
        );

        self.sink.emit(&OrchestratorEvent::RunStarted {
            mode,
            tasks: order.len(),
            max_workers: scheduler.max_workers(),
        });
        self.sink.emit(&OrchestratorEvent::PlanComputed { order: names });

        let outcome = scheduler.run(mode, &order).await;
        *self.lock_results() = outcome.results.clone();

        Ok(outcome.into_result()?)
    }

    /// Results of the tasks that completed in the last run.
    pub fn results(&self) -> HashMap<TaskName, TaskValue> {
        self.lock_results().clone()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.reporter().snapshot()
    }

    /// Detached handle for taking snapshots from elsewhere.
    pub fn reporter(&self) -> StatusReporter {
        StatusReporter::new(self.graph.clone(), Arc::clone(&self.run))
    }

    /// Return every task to `Pending` and forget the last run.
    pub fn reset(&self) -> Result<()> {
        {
            let mut graph = self.graph.write();
            if self.run.is_running() {
                return Err(StateError::CannotResetWhileRunning.into());
            }
            graph.reset_all();
        }
        self.lock_results().clear();
        self.run.clear_window();
        self.sink.emit(&OrchestratorEvent::Reset);
        Ok(())
    }

    fn lock_results(&self) -> std::sync::MutexGuard<'_, HashMap<TaskName, TaskValue>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tasks", &self.task_names())
            .field("running", &self.is_running())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Marks the orchestrator as running for as long as it lives, so a dropped
/// `run()` future cannot leave it stuck.
struct RunGuard<'a> {
    run: &'a RunState,
}

impl<'a> RunGuard<'a> {
    fn acquire(run: &'a RunState) -> std::result::Result<Self, StateError> {
        if !run.try_begin() {
            return Err(StateError::AlreadyRunning);
        }
        debug!("run guard acquired");
        Ok(Self { run })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.run.end();
    }
}
