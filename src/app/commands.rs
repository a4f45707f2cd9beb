//! Inbound commands to the controller.
//!
//! These represent requests from the outside world (button adapter,
//! simulator console, a future device-file front end) that
//! [`Controller::handle_command`](super::service::Controller::handle_command)
//! routes to the matching operation.

use crate::fsm::Mode;

/// Commands that external adapters can send into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// A physical button press.
    Press(usize),

    /// Select a mode directly.  `Manual` is entered without a toggle.
    Select(Mode),

    /// Toggle one output; only accepted in `Manual`.
    Toggle(usize),

    /// Drive everything low and go to `Off`.
    Reset,
}
