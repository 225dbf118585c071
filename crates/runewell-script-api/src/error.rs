//! Error types for the script bridge.

use thiserror::Error;

/// Errors raised by script-side operations.
#[derive(Error, Debug)]
pub enum ScriptError {
    /// A value was invoked but is not callable.
    #[error("value '{0}' is not callable")]
    NotCallable(String),

    /// A native function received the wrong number of arguments.
    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: usize, got: usize },

    /// A native function received an argument of the wrong shape.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Error bubbled up from a capability provider.
    #[error(transparent)]
    Capability(#[from] runewell_capability_core::CapabilityError),
}
