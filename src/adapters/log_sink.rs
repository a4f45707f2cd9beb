//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each [`ControllerEvent`] as one
//! structured line through the `log` facade (env_logger on the host, the
//! target logger on a board).

use log::{info, warn};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControllerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &ControllerEvent) {
        match event {
            ControllerEvent::Started { outputs } => {
                info!("START | outputs={outputs}");
            }
            ControllerEvent::ModeChanged { from, to } => {
                info!("MODE  | {} -> {}", from.name(), to.name());
            }
            ControllerEvent::ActivityStarted { id, kind } => {
                info!("ACT   | {id} {} started", kind.label());
            }
            ControllerEvent::ActivityStopped { id, kind } => {
                info!("ACT   | {id} {} stopped", kind.label());
            }
            ControllerEvent::ManualToggled { index, value } => {
                info!("LED   | {index} -> {}", if *value { "ON" } else { "OFF" });
            }
            ControllerEvent::Reset => {
                info!("RESET | all outputs low");
            }
            ControllerEvent::EventRejected { error } => {
                warn!("REJECT| {error}");
            }
            ControllerEvent::OutputFailed { error } => {
                warn!("OUTPUT| {error}");
            }
            ControllerEvent::ShutDown => {
                info!("STOP  | controller shut down");
            }
        }
    }
}
