//! Mode state machine: identities, decoded requests, and the pure
//! transition planner.
//!
//! ```text
//!            ┌──[btn 0]──▶ ALL ◀──────────┐
//!            │                            │
//!   OFF ─────┼──[btn 1]──▶ INDIVIDUAL     │ any mode ──[btn 0/1/2]──▶ …
//!    ▲       │                            │
//!    │       └──[btn 2]──▶ MANUAL ──[btn 2]──▶ MANUAL (toggle one output)
//!    │
//!    └──────────[btn 3]───── any mode (reset)
//! ```
//!
//! The planner never touches activities or outputs; it only decides what
//! the [`Controller`](crate::app::service::Controller) must do. Keeping it
//! pure makes the whole table testable without threads.

pub mod context;
pub mod states;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// The controller's high-level behaviour selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Mode {
    Off = 0,
    All = 1,
    Individual = 2,
    Manual = 3,
}

impl Mode {
    /// Total number of modes, used to size the mode table.
    pub const COUNT: usize = 4;

    /// Convert a table index back to `Mode`.  Panics on out-of-range in
    /// debug builds; returns `Off` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Off,
            1 => Self::All,
            2 => Self::Individual,
            3 => Self::Manual,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::Off
            }
        }
    }

    /// Numeric code used by the character-device front end
    /// (`1` all, `2` individual, `3` manual, `4` off).
    pub const fn code(self) -> u8 {
        match self {
            Self::All => 1,
            Self::Individual => 2,
            Self::Manual => 3,
            Self::Off => 4,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::All),
            2 => Some(Self::Individual),
            3 => Some(Self::Manual),
            4 => Some(Self::Off),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        states::descriptor(self).name
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// What a button press (or a direct command) asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Button 0.
    EnterAll,
    /// Button 1.
    EnterIndividual,
    /// Button 2: enter `Manual` if needed, then toggle one output.
    ToggleManual { button: usize },
    /// Button 3.
    Reset,
    /// Direct mode selection, no toggle.
    Select(Mode),
}

impl Request {
    /// Decode a button index.  Buttons past 3 carry no meaning.
    pub fn from_button(button: usize) -> Option<Self> {
        match button {
            0 => Some(Self::EnterAll),
            1 => Some(Self::EnterIndividual),
            2 => Some(Self::ToggleManual { button }),
            3 => Some(Self::Reset),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// The controller's next steps for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    /// Already in the requested mode; leave the running activity alone.
    Keep,
    /// Stop the current activity and enter `Mode`.
    Enter(Mode),
    /// Toggle one manual output, entering `Manual` first when `enter` is set.
    Toggle { enter: bool },
    /// Stop everything, drive every output low, go to `Off`.
    Reset,
}

/// Decide what `request` means while in `current`.
pub fn plan(current: Mode, request: Request) -> Plan {
    match request {
        Request::EnterAll => enter_unless_current(current, Mode::All),
        Request::EnterIndividual => enter_unless_current(current, Mode::Individual),
        Request::ToggleManual { .. } => Plan::Toggle {
            enter: current != Mode::Manual,
        },
        Request::Reset | Request::Select(Mode::Off) => Plan::Reset,
        Request::Select(mode) => enter_unless_current(current, mode),
    }
}

fn enter_unless_current(current: Mode, target: Mode) -> Plan {
    if current == target {
        Plan::Keep
    } else {
        Plan::Enter(target)
    }
}
