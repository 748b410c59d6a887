//! Error types for skirmish-core

use crate::{EntityId, PlayerId};
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Player {player} refers to missing entity {entity}")]
    DanglingPlayerEntity { player: PlayerId, entity: EntityId },

    #[error("Invalid level: {0}")]
    InvalidLevel(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
