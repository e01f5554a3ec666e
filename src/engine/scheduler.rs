// src/engine/scheduler.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::{SharedGraph, TaskId};
use crate::engine::events::EventSink;
use crate::engine::retry::RetryPolicy;
use crate::errors::ExecutionError;
use crate::types::{RunMode, TaskName, TaskValue};

/// What a run produced: results of every completed task, plus the error
/// that stopped it, if any.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub results: HashMap<TaskName, TaskValue>,
    pub error: Option<ExecutionError>,
}

impl RunOutcome {
    pub fn into_result(self) -> Result<HashMap<TaskName, TaskValue>, ExecutionError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// Drives one run over a planned order.
///
/// Both modes share the same contract:
/// - a task never starts before all its dependencies are `Completed`
/// - the first terminal failure stops new dispatch (fail-fast); attempts
///   already in flight are allowed to finish
/// - `results` only ever holds completed tasks
#[derive(Clone)]
pub struct Scheduler {
    graph: SharedGraph,
    retry: RetryPolicy,
    sink: Arc<dyn EventSink>,
    max_workers: usize,
}

impl Scheduler {
    pub fn new(
        graph: SharedGraph,
        retry: RetryPolicy,
        sink: Arc<dyn EventSink>,
        max_workers: usize,
    ) -> Self {
        Self {
            graph,
            retry,
            sink,
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Execute `order`, which must be a topological order of the graph.
    pub async fn run(&self, mode: RunMode, order: &[TaskId]) -> RunOutcome {
        match mode {
            RunMode::Sequential => self.run_sequential(order).await,
            RunMode::Parallel => self.run_parallel(order).await,
        }
    }

    async fn run_sequential(&self, order: &[TaskId]) -> RunOutcome {
        info!(tasks = order.len(), "running tasks sequentially");
        let mut outcome = RunOutcome::default();

        for &id in order {
            let name = self.graph.read().task(id).name().to_string();
            match self.retry.execute(&self.graph, &self.sink, id).await {
                Ok(value) => {
                    outcome.results.insert(name, value);
                }
                Err(err) => {
                    warn!(task = %name, "terminal failure; stopping sequential run");
                    outcome.error = Some(err);
                    break;
                }
            }
        }

        outcome
    }

    /// Bounded-parallel execution.
    ///
    /// The `JoinSet` is the worker pool: it never holds more than
    /// `max_workers` futures. The coordinator fills free slots from the
    /// ready set, then sleeps in `join_next()` until a worker finishes.
    async fn run_parallel(&self, order: &[TaskId]) -> RunOutcome {
        info!(
            tasks = order.len(),
            max_workers = self.max_workers,
            "running tasks in parallel"
        );

        let mut outcome = RunOutcome::default();
        let mut pool: JoinSet<(TaskName, Result<TaskValue, ExecutionError>)> = JoinSet::new();
        let mut dispatched: HashSet<TaskId> = HashSet::new();

        loop {
            if outcome.error.is_none() {
                self.dispatch_ready(order, &mut dispatched, &mut pool);
            }

            let Some(joined) = pool.join_next().await else {
                break;
            };

            match joined {
                Ok((name, Ok(value))) => {
                    debug!(task = %name, "worker finished");
                    outcome.results.insert(name, value);
                }
                Ok((name, Err(err))) => {
                    if outcome.error.is_none() {
                        warn!(
                            task = %name,
                            in_flight = pool.len(),
                            "terminal failure; no new tasks will be dispatched"
                        );
                        outcome.error = Some(err);
                    } else {
                        debug!(task = %name, error = %err, "additional failure after fail-fast");
                    }
                }
                Err(join_err) => {
                    warn!(error = %join_err, "worker future aborted");
                    if outcome.error.is_none() {
                        outcome.error = Some(ExecutionError::WorkerLost {
                            message: join_err.to_string(),
                        });
                    }
                }
            }
        }

        if outcome.error.is_none() {
            let remaining = self.graph.read().incomplete();
            if !remaining.is_empty() {
                warn!(?remaining, "no task ready and nothing in flight; giving up");
                outcome.error = Some(ExecutionError::Stalled { remaining });
            }
        }

        outcome
    }

    fn dispatch_ready(
        &self,
        order: &[TaskId],
        dispatched: &mut HashSet<TaskId>,
        pool: &mut JoinSet<(TaskName, Result<TaskValue, ExecutionError>)>,
    ) {
        let free = self.max_workers.saturating_sub(pool.len());
        if free == 0 {
            return;
        }

        let ready: Vec<(TaskId, TaskName)> = {
            let graph = self.graph.read();
            graph
                .ready_set(order, dispatched)
                .into_iter()
                .take(free)
                .map(|id| (id, graph.task(id).name().to_string()))
                .collect()
        };

        for (id, name) in ready {
            dispatched.insert(id);
            debug!(task = %name, "dispatching task to worker pool");

            let graph = self.graph.clone();
            let sink = Arc::clone(&self.sink);
            let retry = self.retry;
            pool.spawn(async move {
                let res = retry.execute(&graph, &sink, id).await;
                (name, res)
            });
        }
    }
}
