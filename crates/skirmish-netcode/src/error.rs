//! Error types for skirmish-netcode

use skirmish_core::{EntityId, PlayerId, Sequence, Tick};
use thiserror::Error;

/// Netcode error type
#[derive(Debug, Error)]
pub enum Error {
    /// Input at or below the newest sequence already seen
    #[error("Stale input {sequence}, last seen is {last_applied}")]
    StaleInput {
        sequence: Sequence,
        last_applied: Sequence,
    },

    /// Snapshot at or below the newest tick already received
    #[error("Stale snapshot for tick {tick}, last received is {last_received}")]
    StaleSnapshot { tick: Tick, last_received: Tick },

    /// Input buffer overflow
    #[error("Input buffer full, cannot queue more inputs")]
    InputBufferFull,

    #[error("Entity {0} not found")]
    MissingEntity(EntityId),

    #[error("Player {0} not found")]
    MissingPlayer(PlayerId),

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Wire error: {0}")]
    Wire(#[from] skirmish_wire::Error),
}

/// Result type for netcode operations
pub type Result<T> = std::result::Result<T, Error>;
