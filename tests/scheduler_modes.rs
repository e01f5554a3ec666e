// tests/scheduler_modes.rs
mod common;
use crate::common::fake_work::{ConcurrencyGauge, FlakyWork};
use crate::common::{init_tracing, recording_orchestrator};

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use taskdag::dag::TaskSpec;
use taskdag::engine::{Orchestrator, OrchestratorEvent};
use taskdag::errors::{ExecutionError, StateError, TaskdagError};
use taskdag::types::{RunMode, TaskStatus};

type TestResult = Result<(), Box<dyn Error>>;

/// A; B,C after A; D after B,C. D records the status of B and C at the
/// moment it starts.
fn register_diamond(orch: &Orchestrator) -> Result<Arc<Mutex<Vec<TaskStatus>>>, TaskdagError> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let reporter = orch.reporter();

    orch.register(TaskSpec::new("A", FlakyWork::ok(json!(1))))?;
    orch.register(TaskSpec::new("B", FlakyWork::ok(json!(2))).after("A"))?;
    orch.register(TaskSpec::new("C", FlakyWork::ok(json!(3))).after("A"))?;

    let seen_by_d = Arc::clone(&seen);
    orch.register(
        TaskSpec::from_fn("D", move || {
            let mut seen = seen_by_d.lock().unwrap();
            seen.extend(reporter.status_of("B"));
            seen.extend(reporter.status_of("C"));
            Ok(json!(4))
        })
        .after("B")
        .after("C"),
    )?;

    Ok(seen)
}

#[tokio::test]
async fn diamond_completes_in_parallel_mode() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, sink) = recording_orchestrator(4);
        let seen = register_diamond(&orch)?;

        let results = orch.run(RunMode::Parallel).await?;

        assert_eq!(results.len(), 4);
        assert_eq!(results["A"], json!(1));
        assert_eq!(results["D"], json!(4));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TaskStatus::Completed, TaskStatus::Completed]
        );

        let starts = sink.start_order();
        assert_eq!(starts.first().map(String::as_str), Some("A"));
        assert_eq!(starts.last().map(String::as_str), Some("D"));

        let status = orch.status();
        assert_eq!(status.completed_tasks, 4);
        assert_eq!(status.failed_tasks, 0);
        assert!(!status.is_running);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn sequential_mode_follows_the_plan() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, sink) = recording_orchestrator(4);
        register_diamond(&orch)?;

        let plan = orch.plan()?;
        orch.run(RunMode::Sequential).await?;

        assert_eq!(sink.start_order(), plan);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn sequential_and_parallel_results_match() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, _sink) = recording_orchestrator(3);
        register_diamond(&orch)?;
        orch.register(TaskSpec::new("E", FlakyWork::ok(json!({"k": [1, 2]}))).after("A"))?;

        let sequential = orch.run(RunMode::Sequential).await?;
        let parallel = orch.run(RunMode::Parallel).await?;
        assert_eq!(sequential, parallel);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn parallel_mode_never_exceeds_max_workers() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, _sink) = recording_orchestrator(2);
        let gauge = ConcurrencyGauge::new();

        for i in 0..6 {
            let name = format!("job{i}");
            orch.register(TaskSpec::new(
                name.clone(),
                gauge.work(&name, Duration::from_millis(30)),
            ))?;
        }

        let results = orch.run(RunMode::Parallel).await?;
        assert_eq!(results.len(), 6);
        assert_eq!(gauge.peak(), 2);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn sequential_mode_runs_one_task_at_a_time() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, _sink) = recording_orchestrator(8);
        let gauge = ConcurrencyGauge::new();

        for i in 0..4 {
            let name = format!("job{i}");
            orch.register(TaskSpec::new(
                name.clone(),
                gauge.work(&name, Duration::from_millis(10)),
            ))?;
        }

        orch.run(RunMode::Sequential).await?;
        assert_eq!(gauge.peak(), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn fail_fast_leaves_undispatched_tasks_pending() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, _sink) = recording_orchestrator(1);
        orch.register(TaskSpec::new("A", FlakyWork::ok(json!("a"))))?;
        orch.register(TaskSpec::new("X", FlakyWork::always_failing()).after("A"))?;
        orch.register(TaskSpec::new("Y", FlakyWork::ok(json!("y"))).after("X"))?;
        orch.register(TaskSpec::new("Z", FlakyWork::ok(json!("z"))).after("A"))?;

        for mode in [RunMode::Sequential, RunMode::Parallel] {
            let err = orch.run(mode).await.unwrap_err();
            assert!(matches!(
                err,
                TaskdagError::Execution(ExecutionError::TaskFailed { ref task, .. }) if task == "X"
            ));

            let status = orch.status();
            assert_eq!(status.task("A").map(|t| t.status), Some(TaskStatus::Completed));
            assert_eq!(status.task("X").map(|t| t.status), Some(TaskStatus::Failed));
            assert_eq!(status.task("Y").map(|t| t.status), Some(TaskStatus::Pending));
            // One worker: X is dispatched before Z and the failure stops the run.
            assert_eq!(status.task("Z").map(|t| t.status), Some(TaskStatus::Pending));
            assert!(status.tasks.iter().all(|t| t.status != TaskStatus::Skipped));

            let results = orch.results();
            assert_eq!(results.len(), 1);
            assert_eq!(results["A"], json!("a"));
        }
        Ok(())
    })
    .await
}

#[tokio::test]
async fn in_flight_workers_finish_after_a_failure() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, sink) = recording_orchestrator(2);
        orch.register(TaskSpec::new("X", FlakyWork::always_failing()))?;
        orch.register(TaskSpec::from_fn("slow", || {
            std::thread::sleep(Duration::from_millis(50));
            Ok(json!("slow"))
        }))?;

        let err = orch.run(RunMode::Parallel).await.unwrap_err();
        assert!(matches!(err, TaskdagError::Execution(ExecutionError::TaskFailed { .. })));

        assert_eq!(orch.task("slow").map(|t| t.status), Some(TaskStatus::Completed));
        assert_eq!(orch.results()["slow"], json!("slow"));
        assert!(sink.events().iter().any(|e| matches!(
            e,
            OrchestratorEvent::RunFinished { success: false, completed: 1, failed: 1, .. }
        )));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn concurrent_run_is_rejected() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, _sink) = recording_orchestrator(1);
        orch.register(TaskSpec::from_fn("slow", || {
            std::thread::sleep(Duration::from_millis(100));
            Ok(json!("done"))
        }))?;

        let (first, second) = tokio::join!(orch.run(RunMode::Parallel), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            orch.run(RunMode::Parallel).await
        });

        assert_eq!(first?["slow"], json!("done"));
        assert!(matches!(
            second.unwrap_err(),
            TaskdagError::State(StateError::AlreadyRunning)
        ));
        assert!(!orch.is_running());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn every_run_starts_from_a_clean_state() -> TestResult {
    crate::common::with_timeout(async {
        init_tracing();
        let (orch, _sink) = recording_orchestrator(2);
        let work = FlakyWork::new(1, json!("ok"));
        orch.register(TaskSpec::new("once-flaky", work.clone()).retries(1))?;

        orch.run(RunMode::Parallel).await?;
        assert_eq!(orch.task("once-flaky").map(|t| t.attempts), Some(2));

        orch.run(RunMode::Parallel).await?;
        assert_eq!(orch.task("once-flaky").map(|t| t.attempts), Some(1));
        assert_eq!(work.calls(), 3);
        Ok(())
    })
    .await
}
