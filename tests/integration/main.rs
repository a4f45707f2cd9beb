//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one concern of the
//! controller against mock adapters.  All tests run on the host with no
//! real hardware required.

mod button_tests;
mod concurrency_tests;
mod controller_tests;
mod mock_hw;
