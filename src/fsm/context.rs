//! State guarded by the controller's single exclusivity domain.
//!
//! `ControllerState` is the only place the current [`Mode`], the manual
//! output pattern, and the running activity handle live.  It sits behind
//! one `Mutex`; every read and write of it, from the event path, the
//! scheduler path or an activity, happens under that lock.

use heapless::Vec;
use serde::Serialize;

use super::Mode;
use crate::activity::{ActivityHandle, ActivityId, ActivityKind};
use crate::config::MAX_OUTPUTS;

// ---------------------------------------------------------------------------
// Manual state
// ---------------------------------------------------------------------------

/// One commanded level per output while in `Manual`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManualState {
    levels: Vec<bool, MAX_OUTPUTS>,
}

impl ManualState {
    /// All outputs low.  `outputs` is clamped to [`MAX_OUTPUTS`].
    pub fn new(outputs: usize) -> Self {
        let mut levels = Vec::new();
        for _ in 0..outputs.min(MAX_OUTPUTS) {
            // Capacity checked by the clamp above.
            let _ = levels.push(false);
        }
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<bool> {
        self.levels.get(index).copied()
    }

    /// Store a level.  Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, value: bool) {
        if let Some(level) = self.levels.get_mut(index) {
            *level = value;
        }
    }

    /// Drive every entry low.
    pub fn clear(&mut self) {
        self.levels.iter_mut().for_each(|l| *l = false);
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.levels
    }
}

// ---------------------------------------------------------------------------
// ControllerState
// ---------------------------------------------------------------------------

/// The mode/activity pair plus manual levels, always accessed together.
pub struct ControllerState {
    /// Current mode.  Starts as `Off`.
    pub mode: Mode,
    /// Levels asserted while in `Manual`.
    pub manual: ManualState,
    /// The one running activity, if any.
    pub activity: Option<ActivityHandle>,
    /// Source of [`ActivityId`]s; never reused.
    pub next_activity_id: u64,
    /// Set by `shutdown()`; rejects every later request.
    pub shut_down: bool,
}

impl ControllerState {
    pub fn new(outputs: usize) -> Self {
        Self {
            mode: Mode::Off,
            manual: ManualState::new(outputs),
            activity: None,
            next_activity_id: 1,
            shut_down: false,
        }
    }

    /// Hand out the next activity identity.
    pub fn allocate_activity_id(&mut self) -> ActivityId {
        let id = ActivityId(self.next_activity_id);
        self.next_activity_id += 1;
        id
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            manual: self.manual.clone(),
            activity: self.activity.as_ref().map(|a| (a.id(), a.kind())),
        }
    }
}

/// A consistent copy of [`ControllerState`] taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub manual: ManualState,
    pub activity: Option<(ActivityId, ActivityKind)>,
}
