//! Controller configuration parameters
//!
//! All tunable parameters for the mode controller. Values can be
//! overridden from a JSON file through [`ConfigPort`](crate::app::ports::ConfigPort).

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on outputs (and buttons) a controller can drive.
/// Sizes every fixed-capacity collection in the crate.
pub const MAX_OUTPUTS: usize = 8;

/// Buttons 0..=3 each carry a meaning, so a controller needs at least four.
pub const MIN_OUTPUTS: usize = 4;

/// Which output the manual button toggles.
///
/// Existing boards disagree on this: some toggle the
/// output sharing the button's own index, others a fixed LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ManualTarget {
    /// Toggle the output whose index equals the pressed button's index.
    #[default]
    MatchButton,
    /// Always toggle this output.
    Output(usize),
}

impl ManualTarget {
    /// Resolve the output index for a press of `button`.
    pub fn resolve(self, button: usize) -> usize {
        match self {
            Self::MatchButton => button,
            Self::Output(index) => index,
        }
    }
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Number of buttons and outputs (N)
    pub outputs: usize,
    /// Period of the `All` and `Individual` activities (milliseconds)
    pub tick_interval_ms: u32,
    /// Period of the manual re-assert activity (milliseconds); `None` disables it
    pub manual_refresh_ms: Option<u32>,
    /// Output toggled by the manual button
    pub manual_target: ManualTarget,
    /// Presses of the same button closer than this are dropped (milliseconds)
    pub debounce_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            outputs: 4,
            tick_interval_ms: 2000, // 2 s blink / chase step
            manual_refresh_ms: Some(1000),
            manual_target: ManualTarget::MatchButton,
            debounce_ms: 50,
        }
    }
}

impl ControllerConfig {
    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outputs < MIN_OUTPUTS {
            return Err(ConfigError::ValidationFailed("outputs: at least 4 required"));
        }
        if self.outputs > MAX_OUTPUTS {
            return Err(ConfigError::ValidationFailed("outputs: at most 8 supported"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms: must be non-zero"));
        }
        if self.manual_refresh_ms == Some(0) {
            return Err(ConfigError::ValidationFailed("manual_refresh_ms: must be non-zero"));
        }
        if let ManualTarget::Output(index) = self.manual_target {
            if index >= self.outputs {
                return Err(ConfigError::ValidationFailed("manual_target: output out of range"));
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.tick_interval_ms))
    }

    pub fn manual_refresh(&self) -> Option<Duration> {
        self.manual_refresh_ms
            .map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Builder-style override used by tests and the simulator.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u32;
        self
    }

    pub fn with_manual_refresh(mut self, refresh: Option<Duration>) -> Self {
        self.manual_refresh_ms = refresh.map(|d| d.as_millis() as u32);
        self
    }

    pub fn with_manual_target(mut self, target: ManualTarget) -> Self {
        self.manual_target = target;
        self
    }
}
