//! Error types for skirmish-journal

use thiserror::Error;

/// Journal error type
#[derive(Debug, Error)]
pub enum Error {
    /// Header or record sizes fail the sanity checks; nothing was loaded
    #[error("Malformed replay: {0}")]
    MalformedReplay(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot record failed to encode or decode
    #[error("Wire error: {0}")]
    Wire(#[from] skirmish_wire::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, Error>;
