//! Output sink drivers.
//!
//! - [`PinBank`] drives real GPIO through any `embedded-hal` 1.0
//!   [`OutputPin`].
//! - [`MemoryOutputs`] keeps levels in memory and records every write with
//!   a timestamp; the simulator and the tests use it.
//!
//! Both take `&self` for writes and serialise per output internally, so
//! the controller, a worker thread and the button dispatcher may all call
//! them at once.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use embedded_hal::digital::{Error as _, OutputPin, PinState};
use log::warn;

use crate::app::ports::OutputSink;
use crate::config::MAX_OUTPUTS;
use crate::error::OutputError;

// ───────────────────────────────────────────────────────────────
// PinBank
// ───────────────────────────────────────────────────────────────

struct PinSlot<P> {
    pin: P,
    level: Option<bool>,
}

/// Up to [`MAX_OUTPUTS`] GPIO outputs, active-high.
pub struct PinBank<P> {
    slots: heapless::Vec<Mutex<PinSlot<P>>, MAX_OUTPUTS>,
}

impl<P: OutputPin + Send> PinBank<P> {
    /// Take ownership of `pins` in output-index order.  Pins beyond
    /// [`MAX_OUTPUTS`] are dropped with a warning.
    pub fn new(pins: impl IntoIterator<Item = P>) -> Self {
        let mut slots = heapless::Vec::new();
        for pin in pins {
            if slots.push(Mutex::new(PinSlot { pin, level: None })).is_err() {
                warn!("PinBank: more than {MAX_OUTPUTS} pins, extra pins ignored");
                break;
            }
        }
        Self { slots }
    }

    fn slot(&self, index: usize) -> Result<MutexGuard<'_, PinSlot<P>>, OutputError> {
        self.slots
            .get(index)
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
            .ok_or(OutputError::NoSuchOutput { index })
    }
}

impl<P: OutputPin + Send> OutputSink for PinBank<P> {
    fn count(&self) -> usize {
        self.slots.len()
    }

    fn set(&self, index: usize, value: bool) -> Result<(), OutputError> {
        let mut slot = self.slot(index)?;
        slot.pin.set_state(PinState::from(value)).map_err(|e| {
            warn!("PinBank: output {index} write failed: {:?}", e.kind());
            OutputError::WriteFailed { index }
        })?;
        slot.level = Some(value);
        Ok(())
    }

    fn level(&self, index: usize) -> Option<bool> {
        self.slot(index).ok().and_then(|s| s.level)
    }
}

// ───────────────────────────────────────────────────────────────
// MemoryOutputs
// ───────────────────────────────────────────────────────────────

/// One recorded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputWrite {
    pub index: usize,
    pub value: bool,
    pub at: Instant,
}

#[derive(Default)]
struct Recorder {
    levels: Vec<Option<bool>>,
    writes: Vec<OutputWrite>,
    failing: Option<usize>,
}

/// In-memory output bank that records every write.
pub struct MemoryOutputs {
    inner: Mutex<Recorder>,
}

impl MemoryOutputs {
    pub fn new(count: usize) -> Self {
        Self {
            inner: Mutex::new(Recorder {
                levels: vec![None; count],
                ..Recorder::default()
            }),
        }
    }

    /// Current levels; never-written outputs read as low.
    pub fn levels(&self) -> Vec<bool> {
        self.lock().levels.iter().map(|l| l.unwrap_or(false)).collect()
    }

    /// Every write since creation (or the last [`take_writes`](Self::take_writes)).
    pub fn writes(&self) -> Vec<OutputWrite> {
        self.lock().writes.clone()
    }

    /// Return and forget the recorded writes.  Levels are kept.
    pub fn take_writes(&self) -> Vec<OutputWrite> {
        core::mem::take(&mut self.lock().writes)
    }

    pub fn write_count(&self, index: usize) -> usize {
        self.lock().writes.iter().filter(|w| w.index == index).count()
    }

    /// Make every write to `index` fail until cleared with `None`.
    pub fn fail_writes_to(&self, index: Option<usize>) {
        self.lock().failing = index;
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OutputSink for MemoryOutputs {
    fn count(&self) -> usize {
        self.lock().levels.len()
    }

    fn set(&self, index: usize, value: bool) -> Result<(), OutputError> {
        let mut rec = self.lock();
        if index >= rec.levels.len() {
            return Err(OutputError::NoSuchOutput { index });
        }
        if rec.failing == Some(index) {
            return Err(OutputError::WriteFailed { index });
        }
        rec.levels[index] = Some(value);
        rec.writes.push(OutputWrite {
            index,
            value,
            at: Instant::now(),
        });
        Ok(())
    }

    fn level(&self, index: usize) -> Option<bool> {
        self.lock().levels.get(index).copied().flatten()
    }
}
