//! `All` mode: every output follows one level that inverts each tick.

use log::warn;

use super::{Activity, ActivityKind};
use crate::app::ports::OutputSink;

pub struct Blink {
    outputs: usize,
    level: bool,
}

impl Blink {
    pub fn new(outputs: usize) -> Self {
        Self {
            outputs,
            level: false,
        }
    }

    /// Level written by the most recent tick.
    pub fn level(&self) -> bool {
        self.level
    }
}

impl Activity for Blink {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Blink
    }

    fn tick(&mut self, outputs: &dyn OutputSink) {
        self.level = !self.level;
        for index in 0..self.outputs {
            if let Err(e) = outputs.set(index, self.level) {
                warn!("blink: {e}");
            }
        }
    }
}
