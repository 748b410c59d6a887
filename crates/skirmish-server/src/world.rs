//! Authoritative world state

use glam::Vec2;
use skirmish_core::{
    Contact, EntityFrame, EntityId, EntityKind, EntitySnapshot, HitEvent, InventoryItem, ItemKind,
    Level, PlayerId, PlayerState, Sequence, SnapshotData, Tick, MAX_INVENTORY_AMOUNT,
};
use skirmish_core::movement::step_world;
use std::collections::BTreeMap;
use tracing::trace;

/// Everything the server simulates
#[derive(Debug, Clone)]
pub struct World {
    pub tick: Tick,
    pub entities: EntityFrame,
    /// Living players only
    pub players: BTreeMap<PlayerId, PlayerState>,
    pub inventories: BTreeMap<PlayerId, Vec<InventoryItem>>,
    pub level: Level,
    /// Hit-scan rays resolved this tick
    pub hits: Vec<HitEvent>,
    /// Entity id to the tick it was marked destroyed
    destroyed: BTreeMap<EntityId, Tick>,
    next_entity: u32,
}

impl World {
    pub fn new(level: Level) -> Self {
        Self {
            tick: 0,
            entities: EntityFrame::new(),
            players: BTreeMap::new(),
            inventories: BTreeMap::new(),
            level,
            hits: Vec::new(),
            destroyed: BTreeMap::new(),
            next_entity: 0,
        }
    }

    /// Add an entity under a fresh id
    pub fn spawn_entity(&mut self, kind: EntityKind, position: Vec2) -> EntityId {
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        self.entities
            .insert(id, EntitySnapshot::new(id, kind, position));
        id
    }

    /// Create a player and its avatar at `position`
    pub fn spawn_player(&mut self, player: PlayerId, position: Vec2) -> EntityId {
        let entity = self.spawn_entity(EntityKind::Player, position);
        self.players
            .insert(player, PlayerState::spawn(entity, position));
        self.inventories.entry(player).or_default();
        entity
    }

    /// Remove a dead or departed player; its avatar lingers one tick
    pub fn remove_player(&mut self, player: PlayerId) -> Option<PlayerState> {
        let state = self.players.remove(&player)?;
        self.mark_destroyed(state.entity);
        Some(state)
    }

    /// Exclude an entity from simulation now and evict it after the next tick
    pub fn mark_destroyed(&mut self, id: EntityId) {
        if self.entities.contains_key(&id) {
            self.destroyed.entry(id).or_insert(self.tick);
        }
    }

    pub fn is_destroyed(&self, id: EntityId) -> bool {
        self.destroyed.contains_key(&id)
    }

    /// Entities that still take part in the simulation
    pub fn live_entities(&self) -> impl Iterator<Item = &EntitySnapshot> + Clone {
        self.entities
            .values()
            .filter(move |e| !self.destroyed.contains_key(&e.id))
    }

    /// Run the integrator over every live entity, returning projectile contacts
    pub fn integrate(&mut self, dt: f32) -> Vec<Contact> {
        let mut contacts = Vec::new();
        let destroyed = &self.destroyed;
        step_world(
            dt,
            &mut self.entities,
            &self.level.walls,
            |id| destroyed.contains_key(&id),
            &mut |contact| contacts.push(contact),
        );
        contacts
    }

    /// Drop entities marked before the current tick
    pub fn evict_destroyed(&mut self) {
        let tick = self.tick;
        let expired: Vec<EntityId> = self
            .destroyed
            .iter()
            .filter(|(_, marked)| **marked < tick)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.destroyed.remove(&id);
            self.entities.remove(&id);
            trace!(tick, entity = %id, "evicted");
        }
    }

    pub fn player_entity(&self, player: PlayerId) -> Option<&EntitySnapshot> {
        let state = self.players.get(&player)?;
        self.entities.get(&state.entity)
    }

    /// The living player whose avatar is `entity`
    pub fn owner_of(&self, entity: EntityId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|(_, p)| p.entity == entity)
            .map(|(id, _)| *id)
    }

    /// Number of item entities still in play
    pub fn item_count(&self) -> usize {
        self.live_entities().filter(|e| e.is_item()).count()
    }

    /// Add to a player's inventory, merging with an existing stack
    pub fn add_to_inventory(&mut self, owner: PlayerId, kind: ItemKind, amount: u16) {
        let items = self.inventories.entry(owner).or_default();
        match items.iter_mut().find(|i| i.kind == kind) {
            Some(stack) => {
                stack.amount = stack.amount.saturating_add(amount).min(MAX_INVENTORY_AMOUNT);
            }
            None => items.push(InventoryItem {
                owner,
                kind,
                amount: amount.min(MAX_INVENTORY_AMOUNT),
            }),
        }
    }

    /// The snapshot one connection receives
    ///
    /// Entities and players are shared; the inventory is the viewer's own.
    pub fn snapshot_for(&self, viewer: Option<PlayerId>, last_input_sequence: Sequence) -> SnapshotData {
        SnapshotData {
            tick: self.tick,
            last_input_sequence,
            entities: self.entities.clone(),
            players: self.players.clone(),
            inventory: viewer
                .and_then(|p| self.inventories.get(&p))
                .cloned()
                .unwrap_or_default(),
            hits: self.hits.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(Level::arena("test", 10, 10).unwrap())
    }

    #[test]
    fn test_spawn_and_remove_player() {
        let mut world = world();
        let entity = world.spawn_player(PlayerId(0), Vec2::new(50.0, 50.0));
        assert_eq!(world.player_entity(PlayerId(0)).unwrap().id, entity);
        assert_eq!(world.owner_of(entity), Some(PlayerId(0)));
        assert!(world.snapshot_for(None, 0).validate().is_ok());

        world.remove_player(PlayerId(0)).unwrap();
        assert!(world.players.is_empty());
        assert!(world.is_destroyed(entity));
        assert_eq!(world.live_entities().count(), 0);
    }

    #[test]
    fn test_destroyed_lingers_one_tick() {
        let mut world = world();
        world.tick = 5;
        let id = world.spawn_entity(
            EntityKind::Item {
                item: ItemKind::Coin,
                amount: 1,
            },
            Vec2::ZERO,
        );
        world.mark_destroyed(id);

        // Same tick: still in the snapshot, out of the simulation
        world.evict_destroyed();
        assert!(world.snapshot_for(None, 0).entities.contains_key(&id));
        assert_eq!(world.item_count(), 0);

        world.tick = 6;
        world.evict_destroyed();
        assert!(!world.entities.contains_key(&id));
        assert!(!world.is_destroyed(id));
    }

    #[test]
    fn test_inventory_is_owner_scoped() {
        let mut world = world();
        world.add_to_inventory(PlayerId(1), ItemKind::Coin, 3);
        world.add_to_inventory(PlayerId(1), ItemKind::Coin, 1020);
        world.add_to_inventory(PlayerId(2), ItemKind::Health, 1);

        let snap = world.snapshot_for(Some(PlayerId(1)), 0);
        assert_eq!(snap.inventory.len(), 1);
        assert_eq!(snap.inventory[0].amount, MAX_INVENTORY_AMOUNT);
        assert!(world.snapshot_for(None, 0).inventory.is_empty());
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let mut world = world();
        let a = world.spawn_entity(EntityKind::Player, Vec2::ZERO);
        let b = world.spawn_entity(EntityKind::Player, Vec2::ZERO);
        assert_ne!(a, b);
        assert!(!a.is_none());
    }
}
