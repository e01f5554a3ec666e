// src/engine/retry.rs

//! Per-task attempt loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::time::sleep;
use tracing::debug;

use crate::dag::{SharedGraph, TaskId};
use crate::engine::events::{EventSink, OrchestratorEvent};
use crate::errors::ExecutionError;
use crate::exec::Work;
use crate::types::TaskValue;

/// Default pause between two attempts of the same task.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry policy.
///
/// A task gets `retry_limit + 1` attempts. Attempts of one task are strictly
/// sequential; the policy sleeps `backoff` between a failed attempt and the
/// next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    pub fn fixed(backoff: Duration) -> Self {
        Self { backoff }
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Run a task until it succeeds or its attempts are exhausted.
    ///
    /// The task record is updated on every transition, so status readers see
    /// `Running` during an attempt and `Failed` while waiting for the next
    /// one. Work items run on the blocking pool; a panic inside one counts as
    /// a failed attempt.
    pub async fn execute(
        &self,
        graph: &SharedGraph,
        sink: &Arc<dyn EventSink>,
        id: TaskId,
    ) -> Result<TaskValue, ExecutionError> {
        let (name, work, max_attempts, timeout) = {
            let g = graph.read();
            let task = g.task(id);
            (
                task.name().to_string(),
                task.work(),
                task.max_attempts(),
                task.timeout(),
            )
        };

        loop {
            let attempt = graph.write().task_mut(id).begin_attempt();
            sink.emit(&OrchestratorEvent::AttemptStarted {
                task: name.clone(),
                attempt,
                max_attempts,
            });

            let job = Arc::clone(&work);
            let started = tokio::time::Instant::now();
            let outcome = match tokio::task::spawn_blocking(move || job.invoke()).await {
                Ok(res) => res,
                Err(join_err) => Err(anyhow!("task panicked: {join_err}")),
            };
            let elapsed = started.elapsed();

            if let Some(limit) = timeout.filter(|limit| elapsed > *limit) {
                sink.emit(&OrchestratorEvent::TimeoutExceeded {
                    task: name.clone(),
                    attempt,
                    timeout: limit,
                    elapsed,
                });
            }

            match outcome {
                Ok(value) => {
                    let duration = {
                        let mut g = graph.write();
                        let task = g.task_mut(id);
                        task.complete(value.clone());
                        task.state().duration()
                    };
                    sink.emit(&OrchestratorEvent::TaskCompleted {
                        task: name,
                        attempts: attempt,
                        duration,
                    });
                    return Ok(value);
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    graph.write().task_mut(id).fail(message.clone());

                    if attempt >= max_attempts {
                        sink.emit(&OrchestratorEvent::TaskFailed {
                            task: name.clone(),
                            attempts: attempt,
                            error: message,
                        });
                        return Err(ExecutionError::TaskFailed {
                            task: name,
                            attempts: attempt,
                            cause: err,
                        });
                    }

                    sink.emit(&OrchestratorEvent::AttemptFailed {
                        task: name.clone(),
                        attempt,
                        max_attempts,
                        error: message,
                        retry_in: self.backoff,
                    });
                    debug!(task = %name, backoff = ?self.backoff, "sleeping before next attempt");
                    sleep(self.backoff).await;
                }
            }
        }
    }
}
