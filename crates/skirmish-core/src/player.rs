//! Per-player state carried alongside the player's entity

use crate::entity::ItemKind;
use crate::weapon::WeaponKind;
use crate::{EntityId, PlayerId};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Number of weapon slots every player has
pub const WEAPON_SLOTS: usize = 3;
/// Full health
pub const MAX_HEALTH: u8 = 100;
/// Largest amount an inventory entry can hold
pub const MAX_INVENTORY_AMOUNT: u16 = 1023;

/// Animation the render collaborator should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnimationState {
    #[default]
    Idle,
    Walk,
    Run,
    Shoot,
    Reload,
}

impl AnimationState {
    pub const ALL: [AnimationState; 5] = [
        AnimationState::Idle,
        AnimationState::Walk,
        AnimationState::Run,
        AnimationState::Shoot,
        AnimationState::Reload,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }
}

/// One weapon slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeaponSlot {
    pub kind: WeaponKind,
    pub ammo: u8,
}

impl WeaponSlot {
    /// A slot holding `kind` with a full magazine
    pub fn loaded(kind: WeaponKind) -> Self {
        Self {
            kind,
            ammo: kind.stats().magazine,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == WeaponKind::Empty
    }
}

/// The player-specific part of the world state
///
/// Only exists while the player is alive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// The player's avatar entity
    pub entity: EntityId,
    pub animation: AnimationState,
    /// World-space point the player is aiming at
    pub aim: Vec2,
    pub health: u8,
    pub facing_left: bool,
    pub active_slot: u8,
    pub slots: [WeaponSlot; WEAPON_SLOTS],
}

impl PlayerState {
    /// A freshly spawned player with the starting loadout
    pub fn spawn(entity: EntityId, aim: Vec2) -> Self {
        let mut slots = [WeaponSlot::default(); WEAPON_SLOTS];
        slots[0] = WeaponSlot::loaded(WeaponKind::Pistol);
        Self {
            entity,
            animation: AnimationState::Idle,
            aim,
            health: MAX_HEALTH,
            facing_left: false,
            active_slot: 0,
            slots,
        }
    }

    /// The currently selected slot
    pub fn active(&self) -> &WeaponSlot {
        &self.slots[(self.active_slot as usize).min(WEAPON_SLOTS - 1)]
    }

    pub fn active_mut(&mut self) -> &mut WeaponSlot {
        &mut self.slots[(self.active_slot as usize).min(WEAPON_SLOTS - 1)]
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Apply damage, returning true if this killed the player
    pub fn take_damage(&mut self, amount: u8) -> bool {
        let was_alive = self.is_alive();
        self.health = self.health.saturating_sub(amount);
        was_alive && !self.is_alive()
    }

    pub fn heal(&mut self, amount: u8) {
        self.health = self.health.saturating_add(amount).min(MAX_HEALTH);
    }

    /// Index of the first empty slot
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(WeaponSlot::is_empty)
    }
}

/// One owner-scoped inventory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub owner: PlayerId,
    pub kind: ItemKind,
    pub amount: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_loadout() {
        let p = PlayerState::spawn(EntityId(3), Vec2::ZERO);
        assert_eq!(p.health, MAX_HEALTH);
        assert_eq!(p.active().kind, WeaponKind::Pistol);
        assert_eq!(p.active().ammo, 12);
        assert_eq!(p.free_slot(), Some(1));
    }

    #[test]
    fn test_damage_and_heal() {
        let mut p = PlayerState::spawn(EntityId(3), Vec2::ZERO);
        assert!(!p.take_damage(60));
        p.heal(200);
        assert_eq!(p.health, MAX_HEALTH);
        assert!(p.take_damage(250));
        assert!(!p.is_alive());
        // Already dead, no second kill
        assert!(!p.take_damage(10));
    }

    #[test]
    fn test_animation_tags() {
        for a in AnimationState::ALL {
            assert_eq!(AnimationState::from_tag(a.tag()), Some(a));
        }
    }
}
