//! Application core: mode arbitration, no direct I/O.
//!
//! The [`service::Controller`] owns the mode, the manual levels and the
//! running activity.  All interaction with outputs, clocks and telemetry
//! happens through the **port traits** in [`ports`], so the controller
//! runs unchanged against GPIO, worker threads or a stepped test clock.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
