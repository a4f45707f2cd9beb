//! Real-time scheduler: one named worker thread per activity.
//!
//! `reserve` spawns the worker up front (so a spawn failure surfaces before
//! the controller stops anything); the thread then parks on a channel until
//! `launch` hands it the [`Job`].  The worker loop is
//!
//! ```text
//!   loop { wait_next() ─▶ fire() }   until either reports a stop
//! ```
//!
//! after which the job is dropped, acknowledging the stop.  On ESP-IDF
//! the std thread maps onto a FreeRTOS task; the stack size is explicit
//! for that reason.

use core::time::Duration;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use log::{debug, info, warn};

use crate::activity::{Job, TickOutcome};
use crate::app::ports::{Reservation, Scheduler, TaskHandle};
use crate::error::ResourceError;

/// Default worker stack.  Ticks only write a handful of outputs.
pub const DEFAULT_STACK_KB: usize = 16;

#[derive(Default)]
struct Counters {
    /// Workers alive, including reserved ones still waiting for a job.
    workers: AtomicUsize,
    /// Workers currently holding a job.
    running: AtomicUsize,
    peak_running: AtomicUsize,
    spawned: AtomicUsize,
}

/// Spawns one thread per launched activity.
pub struct ThreadScheduler {
    stack_kb: usize,
    max_workers: usize,
    counters: Arc<Counters>,
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self {
            stack_kb: DEFAULT_STACK_KB,
            max_workers: usize::MAX,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_stack_kb(mut self, stack_kb: usize) -> Self {
        self.stack_kb = stack_kb;
        self
    }

    /// Refuse reservations once this many workers are alive.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Worker threads alive, reserved or running.
    pub fn live_workers(&self) -> usize {
        self.counters.workers.load(Ordering::SeqCst)
    }

    /// Workers currently holding a job.
    pub fn running(&self) -> usize {
        self.counters.running.load(Ordering::SeqCst)
    }

    /// Highest value [`running`](Self::running) ever reached.
    pub fn peak_running(&self) -> usize {
        self.counters.peak_running.load(Ordering::SeqCst)
    }

    /// Workers spawned over the scheduler's lifetime.
    pub fn spawned(&self) -> usize {
        self.counters.spawned.load(Ordering::SeqCst)
    }
}

impl Scheduler for ThreadScheduler {
    fn reserve(&self, label: &'static str) -> Result<Box<dyn Reservation>, ResourceError> {
        let counters = &self.counters;
        let workers = counters.workers.fetch_add(1, Ordering::SeqCst) + 1;
        if workers > self.max_workers {
            counters.workers.fetch_sub(1, Ordering::SeqCst);
            warn!("ThreadScheduler: worker limit {} reached", self.max_workers);
            return Err(ResourceError::SchedulerUnavailable);
        }

        let (tx, rx) = mpsc::channel::<Job>();
        let worker_counters = Arc::clone(counters);
        let spawned = std::thread::Builder::new()
            .name(format!("act-{label}"))
            .stack_size(self.stack_kb * 1024)
            .spawn(move || {
                // A dropped sender means the reservation was abandoned.
                if let Ok(job) = rx.recv() {
                    run(job, &worker_counters);
                }
                worker_counters.workers.fetch_sub(1, Ordering::SeqCst);
            });

        match spawned {
            Ok(thread) => {
                counters.spawned.fetch_add(1, Ordering::SeqCst);
                info!("Spawning '{label}' (stack={}KB)", self.stack_kb);
                Ok(Box::new(ThreadReservation { tx, thread }))
            }
            Err(e) => {
                counters.workers.fetch_sub(1, Ordering::SeqCst);
                warn!("ThreadScheduler: spawn '{label}' failed: {e}");
                Err(ResourceError::SpawnFailed)
            }
        }
    }
}

fn run(mut job: Job, counters: &Counters) {
    let running = counters.running.fetch_add(1, Ordering::SeqCst) + 1;
    counters.peak_running.fetch_max(running, Ordering::SeqCst);
    debug!("{} {}: worker up", job.kind().label(), job.id());
    while job.wait_next() {
        if job.fire() == TickOutcome::Stopped {
            break;
        }
    }
    // Counted as stopped before the drop below acknowledges.
    counters.running.fetch_sub(1, Ordering::SeqCst);
    drop(job);
}

struct ThreadReservation {
    tx: Sender<Job>,
    thread: JoinHandle<()>,
}

impl Reservation for ThreadReservation {
    fn launch(self: Box<Self>, job: Job) -> Box<dyn TaskHandle> {
        let token = Arc::clone(job.token());
        if let Err(mpsc::SendError(job)) = self.tx.send(job) {
            // Worker already gone; dropping the job here still acknowledges.
            warn!("ThreadScheduler: worker for {} exited before launch", job.id());
        }
        Box::new(ThreadTask {
            token,
            thread: self.thread,
        })
    }
}

struct ThreadTask {
    token: Arc<crate::activity::StopToken>,
    thread: JoinHandle<()>,
}

impl TaskHandle for ThreadTask {
    fn join(self: Box<Self>, timeout: Duration) -> bool {
        if !self.token.wait_acknowledged(timeout) {
            return false;
        }
        // Acknowledged on the job's drop; the worker only returns after it.
        self.thread.join().is_ok()
    }
}
