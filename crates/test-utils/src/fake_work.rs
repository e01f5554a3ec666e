use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_json::json;
use taskdag::engine::{EventSink, OrchestratorEvent};
use taskdag::exec::Work;
use taskdag::types::TaskValue;

/// A work item that fails its first `fail_first` invocations, then returns
/// `value` on every later one.
///
/// Clones share the call counter, so a test can keep one clone to inspect
/// after handing the other to a `TaskSpec`.
#[derive(Clone)]
pub struct FlakyWork {
    fail_first: u32,
    value: TaskValue,
    calls: Arc<AtomicU32>,
}

impl FlakyWork {
    pub fn new(fail_first: u32, value: TaskValue) -> Self {
        Self {
            fail_first,
            value,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Never fails.
    pub fn ok(value: TaskValue) -> Self {
        Self::new(0, value)
    }

    /// Never succeeds.
    pub fn always_failing() -> Self {
        Self::new(u32::MAX, TaskValue::Null)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Work for FlakyWork {
    fn invoke(&self) -> Result<TaskValue> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_first {
            return Err(anyhow!("scripted failure on call {call}"));
        }
        Ok(self.value.clone())
    }
}

/// Sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<OrchestratorEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<OrchestratorEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events that concern `task`, in emission order.
    pub fn events_for(&self, task: &str) -> Vec<OrchestratorEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.task() == Some(task))
            .collect()
    }

    /// Names of tasks in the order their first attempt started.
    pub fn start_order(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                OrchestratorEvent::AttemptStarted { task, attempt: 1, .. } => Some(task),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &OrchestratorEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Tracks how many gauged work items execute at the same time.
#[derive(Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// A work item that holds a slot for `hold`, then returns its name.
    pub fn work(self: &Arc<Self>, name: &str, hold: Duration) -> GaugedWork {
        GaugedWork {
            gauge: Arc::clone(self),
            name: name.to_string(),
            hold,
        }
    }
}

pub struct GaugedWork {
    gauge: Arc<ConcurrencyGauge>,
    name: String,
    hold: Duration,
}

impl Work for GaugedWork {
    fn invoke(&self) -> Result<TaskValue> {
        let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.peak.fetch_max(now, Ordering::SeqCst);

        thread::sleep(self.hold);

        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
        Ok(json!(self.name))
    }
}
