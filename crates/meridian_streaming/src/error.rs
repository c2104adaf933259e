//! # Streaming Error Types
//!
//! Errors raised by the engine bridges and by the manager's internals.
//! The manager's gameplay surface never returns them: they are logged and
//! downgraded to absent content. Only construction (config validation,
//! TOML loading) reports errors to the caller.

use meridian_procedural::ProceduralError;
use thiserror::Error;

/// Errors reported by an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The requested key or asset does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage or transport failure.
    #[error("i/o failure: {0}")]
    Io(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// The operation was abandoned before completion.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for bridge calls.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur inside the streaming crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamingError {
    /// Configuration rejected by validation.
    #[error("invalid streaming config: {0}")]
    InvalidConfig(String),

    /// A bridge call failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Registry or chunk state error.
    #[error(transparent)]
    Procedural(#[from] ProceduralError),
}

/// Result type for streaming operations.
pub type StreamingResult<T> = Result<T, StreamingError>;
