//! Outbound controller events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log, forward, count in tests).

use crate::activity::{ActivityId, ActivityKind};
use crate::error::{Error, OutputError};
use crate::fsm::Mode;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The controller started; all outputs driven low.
    Started { outputs: usize },

    /// The current mode changed.
    ModeChanged { from: Mode, to: Mode },

    /// An activity was launched.
    ActivityStarted { id: ActivityId, kind: ActivityKind },

    /// An activity acknowledged its stop and will not write again.
    ActivityStopped { id: ActivityId, kind: ActivityKind },

    /// A manual output was toggled.
    ManualToggled { index: usize, value: bool },

    /// `reset()` finished; every output was written low.  Writes that
    /// failed were reported as [`OutputFailed`](Self::OutputFailed) first.
    Reset,

    /// A request was rejected without side effects.
    EventRejected { error: Error },

    /// An output write failed after the request had already changed state.
    /// The state change stands.
    OutputFailed { error: OutputError },

    /// `shutdown()` completed.
    ShutDown,
}
