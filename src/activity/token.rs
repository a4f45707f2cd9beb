//! Confirmatory stop token shared by one activity and the controller.
//!
//! ```text
//!   controller                         activity (any context)
//!   ──────────                         ──────────────────────
//!                                      enter() ─▶ LiveGuard ─▶ writes
//!   request_stop()  ── waits for ──▶   guard dropped
//!   wait_acknowledged() ◀── notify ──  acknowledge()   (job dropped)
//! ```
//!
//! A tick holds the token's mutex (through [`LiveGuard`]) for its whole
//! duration, so `request_stop` cannot return while a write is in flight,
//! and every tick that starts afterwards sees the flag and does nothing.
//! The stop is only *confirmed* once the activity itself calls
//! [`StopToken::acknowledge`].

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct TokenState {
    stop_requested: bool,
    acknowledged: bool,
}

#[derive(Debug, Default)]
pub struct StopToken {
    state: Mutex<TokenState>,
    changed: Condvar,
}

/// Proof that no stop has been requested.  Held across one tick.
pub struct LiveGuard<'a> {
    _state: MutexGuard<'a, TokenState>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a tick.  Returns `None` once a stop has been requested.
    pub fn enter(&self) -> Option<LiveGuard<'_>> {
        let state = self.lock();
        if state.stop_requested {
            None
        } else {
            Some(LiveGuard { _state: state })
        }
    }

    /// Ask the activity to stop.  Blocks until any in-flight tick finishes.
    pub fn request_stop(&self) {
        let mut state = self.lock();
        state.stop_requested = true;
        self.changed.notify_all();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.lock().stop_requested
    }

    /// Called by the activity side once it will never write again.
    pub fn acknowledge(&self) {
        let mut state = self.lock();
        state.acknowledged = true;
        self.changed.notify_all();
    }

    pub fn is_acknowledged(&self) -> bool {
        self.lock().acknowledged
    }

    /// Wait up to `timeout` for [`acknowledge`](Self::acknowledge).
    pub fn wait_acknowledged(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| !s.acknowledged)
            .unwrap_or_else(PoisonError::into_inner);
        state.acknowledged
    }

    /// Sleep for `period` unless a stop is requested first.
    ///
    /// Returns `true` when the full period elapsed and the activity should
    /// tick, `false` when it should wind down.
    pub fn sleep(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut state = self.lock();
        loop {
            if state.stop_requested {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            state = self
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
