//! `Individual` mode: exactly one output high, stepping through the bank.

use log::warn;

use super::{Activity, ActivityKind};
use crate::app::ports::OutputSink;

pub struct Chase {
    outputs: usize,
    cursor: usize,
}

impl Chase {
    pub fn new(outputs: usize) -> Self {
        Self { outputs, cursor: 0 }
    }

    /// Output the next tick will drive high.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Activity for Chase {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Chase
    }

    fn tick(&mut self, outputs: &dyn OutputSink) {
        for index in 0..self.outputs {
            if let Err(e) = outputs.set(index, index == self.cursor) {
                warn!("chase: {e}");
            }
        }
        self.cursor = (self.cursor + 1) % self.outputs.max(1);
    }
}
