//! Snapshots: one complete world instant

use crate::entity::EntitySnapshot;
use crate::error::{Error, Result};
use crate::player::{InventoryItem, PlayerState};
use crate::{EntityId, PlayerId, Sequence, Tick};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All entity transforms at one tick, keyed by id
pub type EntityFrame = BTreeMap<EntityId, EntitySnapshot>;

/// A resolved hit-scan ray, kept so clients can draw tracers and impacts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    pub shooter: PlayerId,
    /// Entity hit, or [`EntityId::NONE`] for world geometry or nothing
    pub target: EntityId,
    pub start: Vec2,
    pub end: Vec2,
    pub headshot: bool,
}

/// One authoritative or interpolated world instant
///
/// Produced once per server tick and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotData {
    pub tick: Tick,
    /// Newest input sequence the server applied for the receiving connection
    pub last_input_sequence: Sequence,
    pub entities: EntityFrame,
    pub players: BTreeMap<PlayerId, PlayerState>,
    /// Inventory of the receiving player only
    pub inventory: Vec<InventoryItem>,
    pub hits: Vec<HitEvent>,
}

impl SnapshotData {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.get(&id)
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    /// A player's state together with its entity, if both are present
    pub fn player_entity(&self, id: PlayerId) -> Option<(&PlayerState, &EntitySnapshot)> {
        let player = self.players.get(&id)?;
        let entity = self.entities.get(&player.entity)?;
        Some((player, entity))
    }

    /// The player owning `entity`, if any
    pub fn owner_of(&self, entity: EntityId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|(_, p)| p.entity == entity)
            .map(|(id, _)| *id)
    }

    /// Check that every player's entity resolves in this snapshot
    pub fn validate(&self) -> Result<()> {
        for (id, player) in &self.players {
            if !self.entities.contains_key(&player.entity) {
                return Err(Error::DanglingPlayerEntity {
                    player: *id,
                    entity: player.entity,
                });
            }
        }
        Ok(())
    }
}

/// Lookup of previously received snapshots by tick
///
/// Delta decoding reconstructs against a baseline fetched through this.
pub trait SnapshotLookup {
    fn snapshot_at(&self, tick: Tick) -> Option<&SnapshotData>;
}

impl SnapshotLookup for BTreeMap<Tick, SnapshotData> {
    fn snapshot_at(&self, tick: Tick) -> Option<&SnapshotData> {
        self.get(&tick)
    }
}

impl SnapshotLookup for [SnapshotData] {
    fn snapshot_at(&self, tick: Tick) -> Option<&SnapshotData> {
        self.iter().find(|s| s.tick == tick)
    }
}

impl SnapshotLookup for Vec<SnapshotData> {
    fn snapshot_at(&self, tick: Tick) -> Option<&SnapshotData> {
        self.as_slice().snapshot_at(tick)
    }
}

/// A lookup that knows no snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBaseline;

impl SnapshotLookup for NoBaseline {
    fn snapshot_at(&self, _tick: Tick) -> Option<&SnapshotData> {
        None
    }
}
