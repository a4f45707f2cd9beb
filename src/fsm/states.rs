//! Static mode table.
//!
//! One row per [`Mode`], indexed by `Mode as usize`: a display name and the
//! activity (if any) that drives the outputs while the mode is current.
//!
//! ```text
//!  OFF         ── no activity, outputs held low by the reset
//!  ALL         ── Blink    @ tick_interval
//!  INDIVIDUAL  ── Chase    @ tick_interval
//!  MANUAL      ── Refresh  @ manual_refresh (optional)
//! ```

use core::time::Duration;

use super::Mode;
use crate::activity::ActivityKind;
use crate::config::ControllerConfig;

/// Static descriptor for a single mode.
pub struct ModeDescriptor {
    pub mode: Mode,
    pub name: &'static str,
    /// Activity started on entry and stopped on exit.
    pub activity: Option<ActivityKind>,
}

/// The mode table.  Must stay in the order of the `Mode` discriminants.
pub const MODE_TABLE: [ModeDescriptor; Mode::COUNT] = [
    // Index 0: Off
    ModeDescriptor {
        mode: Mode::Off,
        name: "Off",
        activity: None,
    },
    // Index 1: All
    ModeDescriptor {
        mode: Mode::All,
        name: "All",
        activity: Some(ActivityKind::Blink),
    },
    // Index 2: Individual
    ModeDescriptor {
        mode: Mode::Individual,
        name: "Individual",
        activity: Some(ActivityKind::Chase),
    },
    // Index 3: Manual
    ModeDescriptor {
        mode: Mode::Manual,
        name: "Manual",
        activity: Some(ActivityKind::ManualRefresh),
    },
];

pub fn descriptor(mode: Mode) -> &'static ModeDescriptor {
    &MODE_TABLE[mode as usize]
}

/// Activity to run for `mode` under `config`, with its cadence.
///
/// `None` when the mode needs no activity, including `Manual` with the
/// refresh disabled.
pub fn activity_for(mode: Mode, config: &ControllerConfig) -> Option<(ActivityKind, Duration)> {
    let kind = descriptor(mode).activity?;
    let interval = match kind {
        ActivityKind::Blink | ActivityKind::Chase => config.tick_interval(),
        ActivityKind::ManualRefresh => config.manual_refresh()?,
    };
    Some((kind, interval))
}
