//! Deterministic scheduler engine.
//!
//! [`StepScheduler`] never ticks by itself: the caller advances a virtual
//! clock and every launched job fires when its interval has elapsed.  It
//! backs the unit tests and property tests, and any host loop that wants
//! to drive activities from its own timebase.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    StepScheduler                    │
//! │                                                     │
//! │   reserve() ──▶ slot held ──▶ launch(job) ──▶ slot  │
//! │                                                     │
//! │   advance(dt) / fire_all()                          │
//! │        │                                            │
//! │        ▼                                            │
//! │   Job::fire() ── Stopped ──▶ job dropped (ack)      │
//! │                                                     │
//! │   TaskHandle::join() ──▶ job dropped (ack)          │
//! └─────────────────────────────────────────────────────┘
//! ```

use core::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info};

use crate::activity::{ActivityId, Job, TickOutcome};
use crate::app::ports::{Reservation, Scheduler, TaskHandle};
use crate::error::{ResourceError, invariant_violation};

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrently held slots (stack-allocated).
pub const MAX_SCHEDULES: usize = 4;

struct Entry {
    key: u64,
    job: Job,
    /// Virtual time since the last fire.
    elapsed: Duration,
}

struct Slots {
    entries: heapless::Vec<Entry, MAX_SCHEDULES>,
    reserved: usize,
    capacity: usize,
    available: bool,
    next_key: u64,
    peak: usize,
}

impl Slots {
    fn held(&self) -> usize {
        self.entries.len() + self.reserved
    }
}

/// Manually advanced scheduler.
pub struct StepScheduler {
    slots: Arc<Mutex<Slots>>,
}

impl Default for StepScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl StepScheduler {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SCHEDULES)
    }

    /// Limit the number of slots (clamped to [`MAX_SCHEDULES`]).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                entries: heapless::Vec::new(),
                reserved: 0,
                capacity: capacity.min(MAX_SCHEDULES),
                available: true,
                next_key: 0,
                peak: 0,
            })),
        }
    }

    /// While `false`, every reservation fails with
    /// [`ResourceError::SchedulerUnavailable`].
    pub fn set_available(&self, available: bool) {
        lock(&self.slots).available = available;
    }

    /// Fire every launched job once, regardless of elapsed time.
    /// Returns the number of ticks that ran.
    pub fn fire_all(&self) -> usize {
        let mut slots = lock(&self.slots);
        let mut ran = 0;
        let mut i = 0;
        while i < slots.entries.len() {
            match slots.entries[i].job.fire() {
                TickOutcome::Ran => {
                    slots.entries[i].elapsed = Duration::ZERO;
                    ran += 1;
                    i += 1;
                }
                TickOutcome::Stopped => {
                    slots.entries.swap_remove(i);
                }
            }
        }
        ran
    }

    /// Move the virtual clock forward by `dt`, firing each job once per
    /// whole interval that elapsed.  Returns the number of ticks that ran.
    pub fn advance(&self, dt: Duration) -> usize {
        let mut slots = lock(&self.slots);
        let mut ran = 0;
        let mut i = 0;
        while i < slots.entries.len() {
            let entry = &mut slots.entries[i];
            entry.elapsed += dt;
            let mut stopped = false;
            while entry.elapsed >= entry.job.interval() {
                entry.elapsed -= entry.job.interval();
                if entry.job.fire() == TickOutcome::Stopped {
                    stopped = true;
                    break;
                }
                ran += 1;
            }
            if stopped {
                slots.entries.swap_remove(i);
            } else {
                i += 1;
            }
        }
        ran
    }

    /// Launched jobs that have not been released.
    pub fn live_jobs(&self) -> usize {
        lock(&self.slots).entries.len()
    }

    /// Highest number of simultaneously launched jobs ever observed.
    pub fn peak_jobs(&self) -> usize {
        lock(&self.slots).peak
    }

    pub fn job_ids(&self) -> Vec<ActivityId> {
        lock(&self.slots).entries.iter().map(|e| e.job.id()).collect()
    }
}

impl Scheduler for StepScheduler {
    fn reserve(&self, label: &'static str) -> Result<Box<dyn Reservation>, ResourceError> {
        let mut slots = lock(&self.slots);
        if !slots.available || slots.held() >= slots.capacity {
            debug!("StepScheduler: no slot for '{label}'");
            return Err(ResourceError::SchedulerUnavailable);
        }
        slots.reserved += 1;
        let key = slots.next_key;
        slots.next_key += 1;
        Ok(Box::new(StepReservation {
            slots: Arc::clone(&self.slots),
            key,
            label,
            launched: false,
        }))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Reservation / task handle
// ═══════════════════════════════════════════════════════════════

struct StepReservation {
    slots: Arc<Mutex<Slots>>,
    key: u64,
    label: &'static str,
    launched: bool,
}

impl Reservation for StepReservation {
    fn launch(mut self: Box<Self>, job: Job) -> Box<dyn TaskHandle> {
        let mut slots = lock(&self.slots);
        slots.reserved -= 1;
        let entry = Entry {
            key: self.key,
            job,
            elapsed: Duration::ZERO,
        };
        if slots.entries.push(entry).is_err() {
            invariant_violation("step scheduler slot vanished between reserve and launch");
        }
        slots.peak = slots.peak.max(slots.entries.len());
        info!("StepScheduler: launched '{}' in slot {}", self.label, self.key);
        drop(slots);

        self.launched = true;
        Box::new(StepTask {
            slots: Arc::clone(&self.slots),
            key: self.key,
        })
    }
}

impl Drop for StepReservation {
    fn drop(&mut self) {
        if !self.launched {
            lock(&self.slots).reserved -= 1;
        }
    }
}

struct StepTask {
    slots: Arc<Mutex<Slots>>,
    key: u64,
}

impl TaskHandle for StepTask {
    fn join(self: Box<Self>, _timeout: Duration) -> bool {
        let released = {
            let mut slots = lock(&self.slots);
            slots
                .entries
                .iter()
                .position(|e| e.key == self.key)
                .map(|i| slots.entries.swap_remove(i))
        };
        // Dropped outside the lock; dropping acknowledges the stop.
        drop(released);
        true
    }
}

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}
