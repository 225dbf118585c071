//! Error types shared by capability providers.

use thiserror::Error;

/// Errors that can occur inside a capability provider.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// A capability name failed validation.
    #[error("invalid capability name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A script-facing request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A named sub-resource does not exist.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// Provider initialization failed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// A data-table reload failed wholesale.
    #[error("reload failed: {0}")]
    Reload(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for capability operations.
pub type Result<T> = std::result::Result<T, CapabilityError>;
