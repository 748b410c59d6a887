//! Error types for skirmish-server

use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in skirmish-server
#[derive(Debug, Error)]
pub enum Error {
    /// Rollback deeper than the stored frame history
    #[error("cannot roll back {requested} ticks, {available} frames stored")]
    InsufficientRollbackHistory { requested: usize, available: usize },

    /// Message from an address with no connection
    #[error("unknown peer {0}")]
    UnknownPeer(skirmish_netcode::Address),

    /// Every player slot is taken
    #[error("server full ({0} players)")]
    ServerFull(usize),

    #[error("unknown level {0:?}")]
    UnknownLevel(String),

    /// RON config parse error
    #[error("config error: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] skirmish_wire::Error),

    #[error("netcode error: {0}")]
    Netcode(#[from] skirmish_netcode::Error),

    #[error("core error: {0}")]
    Core(#[from] skirmish_core::Error),
}
