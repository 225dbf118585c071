//! Error types for the provider runtime.

use thiserror::Error;

/// Errors that can occur in the provider runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// No provider package at the specified path.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// Failed to parse or validate a provider manifest.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A manifest entry point has no matching registration function.
    #[error("unknown entry point '{entry_point}' declared by provider '{provider}'")]
    UnknownEntryPoint { provider: String, entry_point: String },

    /// Phase-one registration failed.
    #[error("registration failed for '{provider}': {reason}")]
    RegistrationFailed { provider: String, reason: String },

    /// Phase-two initialization failed.
    #[error("initialization failed for '{provider}': {reason}")]
    InitializationFailed { provider: String, reason: String },

    /// A data-table reload failed wholesale.
    #[error("reload failed: {0}")]
    ReloadFailed(String),

    /// Error bubbled up from a capability provider.
    #[error(transparent)]
    Capability(#[from] runewell_capability_core::CapabilityError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;
