//! `Manual` mode background activity: re-asserts the manual levels.
//!
//! Toggles are written by the controller itself; this activity only
//! repairs outputs that drifted (or were overwritten by a previous mode).
//! It reads the whole manual vector under the controller lock and writes
//! while still holding it, so it can never write a level older than the
//! latest toggle.  If a transition holds the lock, the cycle is skipped
//! rather than waited for: the transition may be stopping this activity.

use std::sync::{Mutex, TryLockError, Weak};

use log::{debug, warn};

use super::{Activity, ActivityKind};
use crate::app::ports::OutputSink;
use crate::fsm::Mode;
use crate::fsm::context::ControllerState;

pub struct Refresh {
    state: Weak<Mutex<ControllerState>>,
    skipped: u64,
}

impl Refresh {
    pub fn new(state: Weak<Mutex<ControllerState>>) -> Self {
        Self { state, skipped: 0 }
    }

    /// Cycles skipped because the controller was busy.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Activity for Refresh {
    fn kind(&self) -> ActivityKind {
        ActivityKind::ManualRefresh
    }

    fn tick(&mut self, outputs: &dyn OutputSink) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let guard = match state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.skipped += 1;
                debug!("manual-refresh: controller busy, skipping cycle");
                return;
            }
        };
        if guard.mode != Mode::Manual {
            return;
        }
        for (index, level) in guard.manual.as_slice().iter().enumerate() {
            if let Err(e) = outputs.set(index, *level) {
                warn!("manual-refresh: {e}");
            }
        }
    }
}
