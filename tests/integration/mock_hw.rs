//! Mock adapters for integration tests.
//!
//! Records every controller event so tests can assert on the full history,
//! and wraps schedulers so resource failures can be injected.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use ledmode::activity::ActivityId;
use ledmode::app::events::ControllerEvent;
use ledmode::app::ports::{EventSink, OutputSink, Reservation, Scheduler};
use ledmode::app::service::Controller;
use ledmode::config::ControllerConfig;
use ledmode::drivers::outputs::MemoryOutputs;
use ledmode::error::ResourceError;

// ── RecordingEvents ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<ControllerEvent>>,
}

#[allow(dead_code)]
impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ControllerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Highest number of activities simultaneously started-but-not-stopped
    /// according to the event stream.
    pub fn peak_live_activities(&self) -> usize {
        let mut live: Vec<ActivityId> = Vec::new();
        let mut peak = 0;
        for event in self.events() {
            match event {
                ControllerEvent::ActivityStarted { id, .. } => {
                    live.push(id);
                    peak = peak.max(live.len());
                }
                ControllerEvent::ActivityStopped { id, .. } => {
                    live.retain(|l| *l != id);
                }
                _ => {}
            }
        }
        peak
    }

    pub fn count(&self, pred: impl Fn(&ControllerEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: &ControllerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

// ── FlakyScheduler ────────────────────────────────────────────

/// Delegates to `inner`, but refuses every `fail_every`-th reservation.
pub struct FlakyScheduler<S> {
    inner: S,
    fail_every: usize,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl<S: Scheduler> FlakyScheduler<S> {
    pub fn new(inner: S, fail_every: usize) -> Self {
        Self {
            inner,
            fail_every: fail_every.max(1),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Scheduler> Scheduler for FlakyScheduler<S> {
    fn reserve(&self, label: &'static str) -> Result<Box<dyn Reservation>, ResourceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n % self.fail_every == 0 {
            return Err(ResourceError::SpawnFailed);
        }
        self.inner.reserve(label)
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub struct Rig<S> {
    pub ctl: Controller,
    pub outputs: Arc<MemoryOutputs>,
    pub sched: Arc<S>,
    pub events: Arc<RecordingEvents>,
}

pub fn rig<S: Scheduler + 'static>(config: ControllerConfig, sched: S) -> Rig<S> {
    let outputs = Arc::new(MemoryOutputs::new(config.outputs));
    let sched = Arc::new(sched);
    let events = Arc::new(RecordingEvents::new());
    let ctl = Controller::start(
        config,
        Arc::clone(&outputs) as Arc<dyn OutputSink>,
        Arc::clone(&sched) as Arc<dyn Scheduler>,
        Arc::clone(&events) as Arc<dyn EventSink>,
    )
    .expect("controller start");
    outputs.take_writes();
    events.clear();
    Rig {
        ctl,
        outputs,
        sched,
        events,
    }
}

/// Poll `cond` until it holds or two seconds pass.
#[allow(dead_code)]
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
