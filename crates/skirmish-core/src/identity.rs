//! Identity types for entities, players, ticks and input sequences

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete simulation tick
pub type Tick = u32;

/// Monotonic input sequence number assigned by the sending client
pub type Sequence = u32;

/// Unique identifier for an entity within a snapshot
///
/// `EntityId::NONE` (0) is reserved for "no entity" / "the world" in hit results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The reserved "nothing was hit / world geometry" id
    pub const NONE: EntityId = EntityId(0);

    /// Create a new entity ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// True for the reserved none/world id
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Maximum number of simultaneously connected players (humans and bots)
pub const MAX_PLAYERS: usize = 32;

/// Identifier of a player slot in a match
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID
    pub fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player:{}", self.0)
    }
}
