//! Port traits: the hexagonal boundary between the controller and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (output pins, schedulers, event sinks, config storage)
//! implement these traits.  The [`Controller`](super::service::Controller)
//! holds them as trait objects so the same engine runs against GPIO, an
//! in-memory recorder, real threads, or a hand-stepped test clock.
//!
//! Every port here may be called from any execution context (event
//! delivery, scheduler tick, worker thread), so the traits take `&self`
//! and require `Send + Sync`.

use core::time::Duration;

use crate::activity::Job;
use crate::config::ControllerConfig;
use crate::error::{ConfigError, OutputError, ResourceError};

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// N addressable boolean outputs.
pub trait OutputSink: Send + Sync {
    /// Number of outputs.
    fn count(&self) -> usize;

    /// Command output `index` to `value`.  Idempotent.
    fn set(&self, index: usize, value: bool) -> Result<(), OutputError>;

    /// Last commanded level, `None` if never written or out of range.
    fn level(&self, index: usize) -> Option<bool>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler port (driven adapter: domain → clock / workers)
// ───────────────────────────────────────────────────────────────

/// Periodic-tick facility for activities.
///
/// Starting an activity is split in two so that nothing the controller
/// already runs is stopped before the new activity is guaranteed to start:
///
/// 1. [`reserve`](Scheduler::reserve) acquires every resource (worker
///    thread, slot) and may fail;
/// 2. [`Reservation::launch`] hands over the [`Job`] and cannot fail.
///
/// A scheduler must call [`Job::fire`] once per [`Job::interval`] until it
/// returns [`Stopped`](crate::activity::TickOutcome::Stopped) (or
/// [`Job::wait_next`] returns `false`), then drop the job.
pub trait Scheduler: Send + Sync {
    fn reserve(&self, label: &'static str) -> Result<Box<dyn Reservation>, ResourceError>;
}

/// Resources held for one activity that has not been launched yet.
/// Dropping it unused releases them.
pub trait Reservation: Send {
    fn launch(self: Box<Self>, job: Job) -> Box<dyn TaskHandle>;
}

/// Scheduler-side handle of a launched job.
pub trait TaskHandle: Send {
    /// Release the job after its token has been stopped.
    ///
    /// Returns `true` once the scheduler has dropped the job, `false` if
    /// that did not happen within `timeout`.
    fn join(self: Box<Self>, timeout: Duration) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`ControllerEvent`](super::events::ControllerEvent)s
/// through this port, from inside its exclusivity domain.  Implementations
/// must not call back into the controller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::ControllerEvent);
}

/// Discards every event.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &super::events::ControllerEvent) {}
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ← stored config)
// ───────────────────────────────────────────────────────────────

/// Loads controller configuration.
///
/// Implementations return [`ControllerConfig::default()`] when nothing is
/// stored and validate whatever they do load.
pub trait ConfigPort {
    fn load(&self) -> Result<ControllerConfig, ConfigError>;
}
