//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to              |
//! |----------------|--------------|--------------------------|
//! | `log_sink`     | EventSink    | `log` facade             |
//! | `config_file`  | ConfigPort   | JSON file on disk        |
//!
//! Output sinks and schedulers live in [`crate::drivers`].

pub mod config_file;
pub mod log_sink;
