//! Controller service: the hexagonal core.
//!
//! [`Controller`] owns the one exclusivity domain (`Mutex<ControllerState>`)
//! and the port objects.  Every public operation runs start-to-finish
//! under that lock, so concurrent calls from the event path, the console
//! and worker threads are totally ordered and never interleave.
//!
//! ```text
//!  ButtonBank ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │        Controller         │
//!   Scheduler ◀──│  Mode · Manual · Activity │ ──▶ OutputSink
//!                 └──────────────────────────┘
//! ```
//!
//! A transition to a mode with an activity runs in this order:
//!
//! 1. reserve scheduler resources (may fail; nothing changed yet),
//! 2. stop the running activity and wait for its acknowledgement,
//! 3. update `Mode` (and re-assert `ManualState` on entry to `Manual`),
//! 4. launch exactly one new activity and publish its handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::activity::blink::Blink;
use crate::activity::chase::Chase;
use crate::activity::refresh::Refresh;
use crate::activity::{Activity, ActivityHandle, ActivityKind, Job, StopToken};
use crate::config::ControllerConfig;
use crate::error::{ConfigError, Error, InputError, Result, invariant_violation};
use crate::fsm::context::{ControllerState, Snapshot};
use crate::fsm::{self, Mode, Plan, Request, states};

use super::commands::ControlCommand;
use super::events::ControllerEvent;
use super::ports::{EventSink, OutputSink, Scheduler};

/// What a successful request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing changed (repeat of the current periodic mode, or an unmapped
    /// button).
    Unchanged,
    /// The controller is now in this mode with its activity running.  Also
    /// returned when button 2 entered `Manual` but the toggle write failed.
    Entered(Mode),
    /// A manual output was toggled to `value`.
    Toggled { index: usize, value: bool },
    /// All outputs were driven low; mode is `Off`.
    Reset,
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// Shared handle to one mode controller.  Cheap to clone; every clone
/// addresses the same state.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    config: ControllerConfig,
    state: Arc<Mutex<ControllerState>>,
    outputs: Arc<dyn OutputSink>,
    scheduler: Arc<dyn Scheduler>,
    events: Arc<dyn EventSink>,
}

impl Controller {
    /// Validate `config`, drive every output low and start in `Off`.
    pub fn start(
        config: ControllerConfig,
        outputs: Arc<dyn OutputSink>,
        scheduler: Arc<dyn Scheduler>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;
        if outputs.count() < config.outputs {
            return Err(ConfigError::ValidationFailed("output sink smaller than configured outputs").into());
        }
        for index in 0..config.outputs {
            outputs.set(index, false)?;
        }

        let state = Arc::new(Mutex::new(ControllerState::new(config.outputs)));
        events.emit(&ControllerEvent::Started {
            outputs: config.outputs,
        });
        info!(
            "Controller started: {} outputs, tick {}ms",
            config.outputs, config.tick_interval_ms
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state,
                outputs,
                scheduler,
                events,
            }),
        })
    }

    // ── Requests ──────────────────────────────────────────────

    /// Apply one button press.
    ///
    /// Buttons 0..=3 map to `All`, `Individual`, manual toggle and reset.
    /// Higher buttons (when more than four are configured) do nothing.
    pub fn handle_event(&self, button: usize) -> Result<Outcome> {
        let mut state = self.lock()?;
        let count = self.inner.config.outputs;
        if button >= count {
            return Err(self.reject(InputError::ButtonOutOfRange { index: button, count }.into()));
        }
        let Some(request) = Request::from_button(button) else {
            debug!("button {button}: no mapping, ignored");
            return Ok(Outcome::Unchanged);
        };
        self.apply(&mut state, request)
    }

    /// Select a mode directly.  `Manual` is entered without toggling and
    /// `Off` is a reset.
    pub fn select_mode(&self, mode: Mode) -> Result<Outcome> {
        let mut state = self.lock()?;
        self.apply(&mut state, Request::Select(mode))
    }

    /// Flip one manual output and write it.  Only accepted in `Manual`.
    pub fn toggle_manual(&self, index: usize) -> Result<bool> {
        let mut state = self.lock()?;
        if state.mode != Mode::Manual {
            return Err(self.reject(InputError::NotInManualMode.into()));
        }
        self.toggle_locked(&mut state, index)
            .map_err(|e| self.reject(e))
    }

    /// Stop the running activity, go to `Off`, clear the manual levels and
    /// drive every output low once, in index order.
    ///
    /// A failed write does not undo the reset; the first one is returned
    /// after every output has been attempted.
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.reset_locked(&mut state)
    }

    /// Route a [`ControlCommand`] to the matching operation.
    pub fn handle_command(&self, cmd: ControlCommand) -> Result<Outcome> {
        match cmd {
            ControlCommand::Press(button) => self.handle_event(button),
            ControlCommand::Select(mode) => self.select_mode(mode),
            ControlCommand::Toggle(index) => self
                .toggle_manual(index)
                .map(|value| Outcome::Toggled { index, value }),
            ControlCommand::Reset => self.reset().map(|()| Outcome::Reset),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Stop the running activity and refuse every later request.
    ///
    /// Outputs keep whatever the last activity wrote.  Calling it again is
    /// a no-op.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.shut_down {
            return;
        }
        self.stop_activity(&mut state);
        state.shut_down = true;
        self.inner.events.emit(&ControllerEvent::ShutDown);
        info!("Controller shut down in {:?}", state.mode);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner).mode
    }

    /// Mode, manual levels and running activity, read atomically.
    pub fn snapshot(&self) -> Snapshot {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn outputs(&self) -> &Arc<dyn OutputSink> {
        &self.inner.outputs
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shut_down
    }

    // ── Internal ──────────────────────────────────────────────

    fn lock(&self) -> Result<MutexGuard<'_, ControllerState>> {
        let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.shut_down {
            return Err(Error::ShutDown);
        }
        Ok(state)
    }

    /// Report a request that failed before changing anything.
    fn reject(&self, error: Error) -> Error {
        warn!("request rejected: {error}");
        self.inner.events.emit(&ControllerEvent::EventRejected { error });
        error
    }

    fn apply(&self, state: &mut ControllerState, request: Request) -> Result<Outcome> {
        match fsm::plan(state.mode, request) {
            Plan::Keep => {
                debug!("already in {:?}, activity kept", state.mode);
                Ok(Outcome::Unchanged)
            }
            Plan::Enter(mode) => {
                self.enter(state, mode).map_err(|e| self.reject(e))?;
                Ok(Outcome::Entered(mode))
            }
            Plan::Toggle { enter } => {
                let Request::ToggleManual { button } = request else {
                    invariant_violation("toggle planned for a non-toggle request");
                };
                let index = self.inner.config.manual_target.resolve(button);
                self.check_output(index).map_err(|e| self.reject(e))?;
                if !enter {
                    let value = self.toggle_locked(state, index).map_err(|e| self.reject(e))?;
                    return Ok(Outcome::Toggled { index, value });
                }

                self.enter(state, Mode::Manual).map_err(|e| self.reject(e))?;
                match self.toggle_locked(state, index) {
                    Ok(value) => Ok(Outcome::Toggled { index, value }),
                    // Manual was entered; only the toggle is lost.
                    Err(Error::Output(error)) => {
                        warn!("manual entry: toggle not applied: {error}");
                        self.inner
                            .events
                            .emit(&ControllerEvent::OutputFailed { error });
                        Ok(Outcome::Entered(Mode::Manual))
                    }
                    Err(e) => Err(e),
                }
            }
            Plan::Reset => {
                self.reset_locked(state)?;
                Ok(Outcome::Reset)
            }
        }
    }

    fn enter(&self, state: &mut ControllerState, mode: Mode) -> Result<()> {
        let next = states::activity_for(mode, &self.inner.config);
        let reservation = match next {
            Some((kind, _)) => Some(self.inner.scheduler.reserve(kind.label())?),
            None => None,
        };

        self.stop_activity(state);

        let from = state.mode;
        state.mode = mode;
        info!("mode {} -> {}", from.name(), mode.name());
        self.inner
            .events
            .emit(&ControllerEvent::ModeChanged { from, to: mode });

        if mode == Mode::Manual {
            for (index, level) in state.manual.as_slice().iter().enumerate() {
                if let Err(e) = self.inner.outputs.set(index, *level) {
                    warn!("manual re-assert: {e}");
                }
            }
        }

        if let (Some((kind, interval)), Some(reservation)) = (next, reservation) {
            if state.activity.is_some() {
                invariant_violation("second activity started while one is live");
            }
            let id = state.allocate_activity_id();
            let token = Arc::new(StopToken::new());
            let job = Job::new(
                id,
                interval,
                Arc::clone(&token),
                self.build_activity(kind),
                Arc::clone(&self.inner.outputs),
            );
            let task = reservation.launch(job);
            state.activity = Some(ActivityHandle::new(id, kind, interval, token, task));
            info!("{} {id}: started every {}ms", kind.label(), interval.as_millis());
            self.inner
                .events
                .emit(&ControllerEvent::ActivityStarted { id, kind });
        }
        Ok(())
    }

    fn build_activity(&self, kind: ActivityKind) -> Box<dyn Activity> {
        let outputs = self.inner.config.outputs;
        match kind {
            ActivityKind::Blink => Box::new(Blink::new(outputs)),
            ActivityKind::Chase => Box::new(Chase::new(outputs)),
            ActivityKind::ManualRefresh => Box::new(Refresh::new(Arc::downgrade(&self.inner.state))),
        }
    }

    fn stop_activity(&self, state: &mut ControllerState) {
        if let Some(handle) = state.activity.take() {
            let (id, kind) = (handle.id(), handle.kind());
            handle.stop();
            self.inner
                .events
                .emit(&ControllerEvent::ActivityStopped { id, kind });
        }
    }

    fn check_output(&self, index: usize) -> Result<()> {
        let count = self.inner.config.outputs;
        if index >= count {
            return Err(InputError::OutputOutOfRange { index, count }.into());
        }
        Ok(())
    }

    fn toggle_locked(&self, state: &mut ControllerState, index: usize) -> Result<bool> {
        self.check_output(index)?;
        let value = !state.manual.get(index).unwrap_or(false);
        self.inner.outputs.set(index, value)?;
        state.manual.set(index, value);
        debug!("manual: output {index} -> {value}");
        self.inner
            .events
            .emit(&ControllerEvent::ManualToggled { index, value });
        Ok(value)
    }

    fn reset_locked(&self, state: &mut ControllerState) -> Result<()> {
        self.stop_activity(state);

        let from = state.mode;
        state.mode = Mode::Off;
        state.manual.clear();
        if from != Mode::Off {
            info!("mode {} -> {}", from.name(), Mode::Off.name());
            self.inner.events.emit(&ControllerEvent::ModeChanged {
                from,
                to: Mode::Off,
            });
        }

        let mut first_error = None;
        for index in 0..self.inner.config.outputs {
            if let Err(error) = self.inner.outputs.set(index, false) {
                warn!("reset: {error}");
                self.inner
                    .events
                    .emit(&ControllerEvent::OutputFailed { error });
                first_error.get_or_insert(error);
            }
        }
        self.inner.events.emit(&ControllerEvent::Reset);

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = state.activity.take() {
            handle.stop();
        }
    }
}
