//! Unified error types for the mode controller.
//!
//! A single `Error` enum that every subsystem converts into, so callers of
//! [`Controller`](crate::app::service::Controller) handle one type.
//! All variants are `Copy` so they can be returned from inside the
//! exclusivity domain without allocation.
//!
//! Invariant violations are deliberately **not** part of this taxonomy:
//! they mean the exclusivity discipline itself is broken and are routed to
//! [`invariant_violation`], which never returns.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible controller operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The request itself was invalid; nothing was changed.
    Input(InputError),
    /// A scheduling or dispatch resource was unavailable; the controller
    /// stayed in its prior mode.
    Resource(ResourceError),
    /// An output write failed.
    Output(OutputError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The controller has been shut down and accepts no further requests.
    ShutDown,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Resource(e) => write!(f, "resource: {e}"),
            Self::Output(e) => write!(f, "output: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::ShutDown => write!(f, "controller shut down"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// Button index outside `[0, count)`.
    ButtonOutOfRange { index: usize, count: usize },
    /// Output index outside `[0, count)`.
    OutputOutOfRange { index: usize, count: usize },
    /// A direct toggle arrived while the controller is not in `Manual`.
    NotInManualMode,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ButtonOutOfRange { index, count } => {
                write!(f, "button {index} out of range (0..{count})")
            }
            Self::OutputOutOfRange { index, count } => {
                write!(f, "output {index} out of range (0..{count})")
            }
            Self::NotInManualMode => write!(f, "toggle requires manual mode"),
        }
    }
}

impl From<InputError> for Error {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// The scheduler has no free slot for another activity.
    SchedulerUnavailable,
    /// A worker thread could not be spawned.
    SpawnFailed,
    /// The event source queue is full.
    EventQueueFull,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchedulerUnavailable => write!(f, "scheduler unavailable"),
            Self::SpawnFailed => write!(f, "worker spawn failed"),
            Self::EventQueueFull => write!(f, "event queue full"),
        }
    }
}

impl From<ResourceError> for Error {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// The underlying pin rejected the write.
    WriteFailed { index: usize },
    /// The sink has no output at this index.
    NoSuchOutput { index: usize },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed { index } => write!(f, "write to output {index} failed"),
            Self::NoSuchOutput { index } => write!(f, "no output at index {index}"),
        }
    }
}

impl From<OutputError> for Error {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation. The string names the field and why.
    ValidationFailed(&'static str),
    /// The stored configuration could not be parsed.
    Corrupted,
    /// Generic I/O error from the configuration backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Invariant violations
// ---------------------------------------------------------------------------

/// Report a broken exclusivity invariant and abort the current context.
///
/// Reached only when the controller observes something its locking makes
/// impossible (two live activities, a stop that is never acknowledged).
#[cold]
#[track_caller]
pub fn invariant_violation(what: &str) -> ! {
    log::error!("invariant violated: {what}");
    panic!("invariant violated: {what}");
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
