//! Mode-arbitration engine for a bank of buttons and LEDs.
//!
//! Four modes (`Off`, `All`, `Individual`, `Manual`), at most one running
//! activity, and confirmatory cancellation: a transition does not proceed
//! until the previous activity has acknowledged that it will never write
//! again.  Hardware, clocks and telemetry plug in through the port traits
//! in [`app::ports`].

#![deny(unused_must_use)]

pub mod activity;
pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod scheduler;
