//! Activities: the recurring work that drives the outputs in each mode.
//!
//! An [`Activity`] is plain state plus a `tick`.  The controller wraps it
//! in a [`Job`] (activity + cadence + [`StopToken`] + output sink) and
//! hands the job to a [`Scheduler`](crate::app::ports::Scheduler).  The
//! scheduler only ever calls [`Job::fire`] and [`Job::wait_next`]; the job
//! enforces the stop protocol itself:
//!
//! - a tick runs under a [`LiveGuard`](token::LiveGuard), so it either
//!   completes before a stop request is recorded or never starts;
//! - dropping the job acknowledges the stop; after that the activity
//!   cannot write, because the job owned it.
//!
//! The controller keeps the other end as an [`ActivityHandle`].

pub mod blink;
pub mod chase;
pub mod refresh;
pub mod token;

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;

use crate::app::ports::{OutputSink, TaskHandle};
use crate::error::invariant_violation;
pub use token::StopToken;

/// A stop that is not acknowledged within this long is a defect, even for
/// activities with a shorter cadence.
pub const MIN_ACK_TIMEOUT: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Unique identity of one started activity.  Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActivityId(pub u64);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which behaviour an activity implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActivityKind {
    /// `All`: every output follows one toggling level.
    Blink,
    /// `Individual`: one output high, stepping through the bank.
    Chase,
    /// `Manual`: periodically re-asserts the manual levels.
    ManualRefresh,
}

impl ActivityKind {
    /// Worker/thread label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Blink => "blink",
            Self::Chase => "chase",
            Self::ManualRefresh => "manual-refresh",
        }
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// One unit of recurring output work.
///
/// `tick` must return promptly: it runs while the stop token is held.
pub trait Activity: Send {
    fn kind(&self) -> ActivityKind;

    fn tick(&mut self, outputs: &dyn OutputSink);
}

// ---------------------------------------------------------------------------
// Job (scheduler side)
// ---------------------------------------------------------------------------

/// Result of [`Job::fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick ran.
    Ran,
    /// A stop was requested; the job should be dropped.
    Stopped,
}

/// An activity bound to its cadence, stop token, and output sink.
pub struct Job {
    id: ActivityId,
    interval: Duration,
    token: Arc<StopToken>,
    activity: Box<dyn Activity>,
    outputs: Arc<dyn OutputSink>,
    ticks: u64,
}

impl Job {
    pub fn new(
        id: ActivityId,
        interval: Duration,
        token: Arc<StopToken>,
        activity: Box<dyn Activity>,
        outputs: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            id,
            interval,
            token,
            activity,
            outputs,
            ticks: 0,
        }
    }

    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn kind(&self) -> ActivityKind {
        self.activity.kind()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn token(&self) -> &Arc<StopToken> {
        &self.token
    }

    /// Ticks that actually ran.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick unless a stop has been requested.
    pub fn fire(&mut self) -> TickOutcome {
        let Some(_live) = self.token.enter() else {
            return TickOutcome::Stopped;
        };
        self.ticks += 1;
        debug!(
            "{} {}: tick {}",
            self.activity.kind().label(),
            self.id,
            self.ticks
        );
        self.activity.tick(self.outputs.as_ref());
        TickOutcome::Ran
    }

    /// Sleep one interval.  `false` means a stop arrived instead.
    pub fn wait_next(&self) -> bool {
        self.token.sleep(self.interval)
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        debug!(
            "{} {}: released after {} ticks",
            self.activity.kind().label(),
            self.id,
            self.ticks
        );
        self.token.acknowledge();
    }
}

// ---------------------------------------------------------------------------
// ActivityHandle (controller side)
// ---------------------------------------------------------------------------

/// The controller's reference to the one running activity.
pub struct ActivityHandle {
    id: ActivityId,
    kind: ActivityKind,
    interval: Duration,
    token: Arc<StopToken>,
    task: Box<dyn TaskHandle>,
}

impl ActivityHandle {
    pub fn new(
        id: ActivityId,
        kind: ActivityKind,
        interval: Duration,
        token: Arc<StopToken>,
        task: Box<dyn TaskHandle>,
    ) -> Self {
        Self {
            id,
            kind,
            interval,
            token,
            task,
        }
    }

    pub fn id(&self) -> ActivityId {
        self.id
    }

    pub fn kind(&self) -> ActivityKind {
        self.kind
    }

    /// How long a stop may take to be acknowledged.
    pub fn ack_timeout(&self) -> Duration {
        self.interval.max(MIN_ACK_TIMEOUT)
    }

    /// Stop the activity and wait until it has acknowledged.
    ///
    /// On return the activity has made its last write.  A missing
    /// acknowledgement is an invariant violation.
    pub fn stop(self) {
        let timeout = self.ack_timeout();
        self.token.request_stop();
        let joined = self.task.join(timeout);
        if !joined || !self.token.wait_acknowledged(timeout) {
            invariant_violation("activity did not acknowledge stop");
        }
        info!("{} {}: stopped", self.kind.label(), self.id);
    }
}
