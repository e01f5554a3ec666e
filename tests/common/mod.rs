#![allow(dead_code, unused_imports)]

pub use taskdag_test_utils::{builders, fake_work, init_tracing, with_timeout};

use std::sync::Arc;

use taskdag::engine::{EventSink, Orchestrator, OrchestratorSettings};
use taskdag_test_utils::fake_work::RecordingSink;

/// Orchestrator with fast retries that records every event.
pub fn recording_orchestrator(max_workers: usize) -> (Orchestrator, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let orch = Orchestrator::with_sink(
        builders::fast_settings(max_workers),
        Arc::clone(&sink) as Arc<dyn EventSink>,
    );
    (orch, sink)
}

pub fn quiet_settings() -> OrchestratorSettings {
    builders::fast_settings(4)
}
