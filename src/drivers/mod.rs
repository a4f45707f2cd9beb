//! Output drivers, the thread-backed scheduler, and the button event source.

pub mod button;
pub mod outputs;
pub mod timer;
