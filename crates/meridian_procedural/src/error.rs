//! # Procedural Error Types
//!
//! All errors that can occur while building the registry or decoding chunk
//! state. Generation itself never fails: a missing environment degrades to
//! an empty chunk.

use thiserror::Error;

/// Errors that can occur in the procedural crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProceduralError {
    /// Registry data could not be parsed.
    #[error("invalid registry data: {0}")]
    InvalidRegistry(String),

    /// Two assemblages registered under the same type name.
    #[error("duplicate assemblage type: {0}")]
    DuplicateAssemblage(String),

    /// Two environments registered under the same identifier.
    #[error("duplicate environment: {0}")]
    DuplicateEnvironment(String),

    /// An assemblage references an environment that was never registered.
    #[error("assemblage {assemblage} references unknown environment {environment}")]
    UnknownEnvironment {
        /// The offending assemblage type.
        assemblage: String,
        /// The environment it asked for.
        environment: String,
    },

    /// A spawn or loot table has entries but no weight to roll against.
    #[error("assemblage {0} has a spawn table with zero total weight")]
    EmptySpawnTable(String),

    /// A chunk snapshot could not be serialized.
    #[error("failed to encode chunk state: {0}")]
    StateEncode(String),

    /// A chunk snapshot could not be parsed.
    #[error("failed to decode chunk state: {0}")]
    StateDecode(String),
}

/// Result type for procedural operations.
pub type ProceduralResult<T> = Result<T, ProceduralError>;
