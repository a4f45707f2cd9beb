//! Interrupt-safe button event source.
//!
//! ## Flow
//!
//! ```text
//!   ISR / any thread             dispatcher thread
//!   ────────────────             ─────────────────
//!   notify(k)
//!     ├─ debounce (atomic CAS on last press of k)
//!     ├─ enqueue k  ──▶  Q32  ──▶  dequeue ──▶ Controller::handle_event(k)
//!     └─ unpark dispatcher
//! ```
//!
//! `notify` never blocks and never takes a lock, so it may be called from
//! an interrupt-like context.  Presses are handed to the controller one at
//! a time, in arrival order, by a single dispatcher thread; a press that
//! arrives during a transition waits in the queue rather than being lost.
//!
//! ## Debounce
//!
//! A press of button `k` within `debounce_ms` of the previous *accepted*
//! press of `k` is dropped.  Other buttons are unaffected.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::thread::{JoinHandle, Thread};
use std::time::Instant;

use heapless::mpmc::Q32;
use log::{debug, info, warn};

use crate::app::service::Controller;
use crate::config::MAX_OUTPUTS;
use crate::error::{Error, InputError, ResourceError, Result};

/// Pending presses the queue holds before `notify` reports
/// [`ResourceError::EventQueueFull`].
pub const EVENT_QUEUE_DEPTH: usize = 32;

/// Dispatcher wakes at least this often even without an unpark.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Raw timestamp value meaning "never pressed".
const NEVER: u32 = 0;

struct Shared {
    queue: Q32<u8>,
    /// Per-button timestamp (ms since `epoch`) of the last accepted press.
    last_press_ms: heapless::Vec<AtomicU32, MAX_OUTPUTS>,
    debounce_ms: u32,
    epoch: Instant,
    stopping: AtomicBool,
    accepted: AtomicU64,
    debounced: AtomicU64,
}

impl Shared {
    fn buttons(&self) -> usize {
        self.last_press_ms.len()
    }
}

// ───────────────────────────────────────────────────────────────
// ButtonNotifier
// ───────────────────────────────────────────────────────────────

/// Producer half.  Clone it into every context that raises presses.
#[derive(Clone)]
pub struct ButtonNotifier {
    shared: Arc<Shared>,
    dispatcher: Thread,
}

impl ButtonNotifier {
    /// Raise a press of `button` now.
    ///
    /// `Ok(true)` if queued, `Ok(false)` if dropped by the debounce window.
    pub fn notify(&self, button: usize) -> Result<bool> {
        let now_ms = self.shared.epoch.elapsed().as_millis() as u32;
        self.notify_at(button, now_ms)
    }

    /// Raise a press with an explicit timestamp (ms, wrapping).
    pub fn notify_at(&self, button: usize, now_ms: u32) -> Result<bool> {
        let shared = &self.shared;
        let Some(slot) = shared.last_press_ms.get(button) else {
            return Err(InputError::ButtonOutOfRange {
                index: button,
                count: shared.buttons(),
            }
            .into());
        };

        // 0 is reserved for NEVER.
        let stamp = now_ms.max(1);
        let last = slot.load(Ordering::Acquire);
        let bouncing = last != NEVER && stamp.wrapping_sub(last) < shared.debounce_ms;
        if bouncing
            || slot
                .compare_exchange(last, stamp, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            shared.debounced.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }

        // Button indices are bounded by MAX_OUTPUTS, so they fit a u8.
        if shared.queue.enqueue(button as u8).is_err() {
            // Not accepted, so it must not open a debounce window.
            let _ = slot.compare_exchange(stamp, last, Ordering::AcqRel, Ordering::Acquire);
            return Err(ResourceError::EventQueueFull.into());
        }
        shared.accepted.fetch_add(1, Ordering::Relaxed);
        self.dispatcher.unpark();
        Ok(true)
    }
}

// ───────────────────────────────────────────────────────────────
// ButtonBank
// ───────────────────────────────────────────────────────────────

/// Owns the dispatcher thread that feeds presses into a [`Controller`].
pub struct ButtonBank {
    shared: Arc<Shared>,
    notifier: ButtonNotifier,
    dispatcher: Option<JoinHandle<()>>,
}

impl ButtonBank {
    /// One button per configured output, debounce from the controller's
    /// configuration.
    pub fn start(controller: Controller) -> Result<Self> {
        let config = controller.config();
        let mut last_press_ms = heapless::Vec::new();
        for _ in 0..config.outputs.min(MAX_OUTPUTS) {
            // Capacity checked by the clamp above.
            let _ = last_press_ms.push(AtomicU32::new(NEVER));
        }
        let shared = Arc::new(Shared {
            queue: Q32::new(),
            last_press_ms,
            debounce_ms: config.debounce_ms,
            epoch: Instant::now(),
            stopping: AtomicBool::new(false),
            accepted: AtomicU64::new(0),
            debounced: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("button-dispatch".into())
            .stack_size(16 * 1024)
            .spawn(move || dispatch(&worker_shared, &controller))
            .map_err(|e| {
                warn!("ButtonBank: dispatcher spawn failed: {e}");
                Error::Resource(ResourceError::SpawnFailed)
            })?;
        info!(
            "ButtonBank: {} buttons, debounce {}ms",
            shared.buttons(),
            shared.debounce_ms
        );

        let notifier = ButtonNotifier {
            shared: Arc::clone(&shared),
            dispatcher: handle.thread().clone(),
        };
        Ok(Self {
            shared,
            notifier,
            dispatcher: Some(handle),
        })
    }

    pub fn notifier(&self) -> ButtonNotifier {
        self.notifier.clone()
    }

    /// Presses queued so far.
    pub fn accepted(&self) -> u64 {
        self.shared.accepted.load(Ordering::Relaxed)
    }

    /// Presses dropped by the debounce window.
    pub fn debounced(&self) -> u64 {
        self.shared.debounced.load(Ordering::Relaxed)
    }

    /// Deliver every queued press, then stop the dispatcher.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.dispatcher.take() else {
            return;
        };
        self.shared.stopping.store(true, Ordering::Release);
        handle.thread().unpark();
        if handle.join().is_err() {
            warn!("ButtonBank: dispatcher panicked");
        }
    }
}

impl Drop for ButtonBank {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch(shared: &Shared, controller: &Controller) {
    loop {
        // Read before draining so a stop never strands a queued press.
        let stopping = shared.stopping.load(Ordering::Acquire);
        while let Some(button) = shared.queue.dequeue() {
            match controller.handle_event(usize::from(button)) {
                Ok(outcome) => debug!("button {button}: {outcome:?}"),
                Err(Error::ShutDown) => debug!("button {button}: controller shut down"),
                Err(e) => warn!("button {button}: {e}"),
            }
        }
        if stopping {
            break;
        }
        std::thread::park_timeout(IDLE_POLL);
    }
    debug!("ButtonBank: dispatcher exit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::NullEventSink;
    use crate::config::ControllerConfig;
    use crate::drivers::outputs::MemoryOutputs;
    use crate::fsm::Mode;
    use crate::scheduler::StepScheduler;

    fn controller() -> Controller {
        Controller::start(
            ControllerConfig::default().with_manual_refresh(None),
            Arc::new(MemoryOutputs::new(4)),
            Arc::new(StepScheduler::new()),
            Arc::new(NullEventSink),
        )
        .unwrap()
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn press_reaches_controller() {
        let ctl = controller();
        let bank = ButtonBank::start(ctl.clone()).unwrap();
        assert!(bank.notifier().notify_at(1, 100).unwrap());
        assert!(wait_for(|| ctl.mode() == Mode::Individual));
        bank.stop();
    }

    #[test]
    fn debounce_is_per_button() {
        let ctl = controller();
        let bank = ButtonBank::start(ctl).unwrap();
        let n = bank.notifier();
        assert!(n.notify_at(0, 100).unwrap());
        assert!(!n.notify_at(0, 120).unwrap());
        assert!(n.notify_at(1, 120).unwrap());
        assert!(n.notify_at(0, 151).unwrap());
        assert_eq!(bank.accepted(), 3);
        assert_eq!(bank.debounced(), 1);
    }

    #[test]
    fn out_of_range_button_rejected() {
        let bank = ButtonBank::start(controller()).unwrap();
        assert_eq!(
            bank.notifier().notify_at(4, 10).unwrap_err(),
            Error::Input(InputError::ButtonOutOfRange { index: 4, count: 4 })
        );
    }

    #[test]
    fn stop_delivers_queued_presses() {
        let ctl = controller();
        let bank = ButtonBank::start(ctl.clone()).unwrap();
        let n = bank.notifier();
        n.notify_at(0, 100).unwrap();
        n.notify_at(3, 100).unwrap();
        n.notify_at(1, 100).unwrap();
        bank.stop();
        assert_eq!(ctl.mode(), Mode::Individual);
    }
}
