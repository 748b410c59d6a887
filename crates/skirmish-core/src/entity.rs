//! World entities
//!
//! One flat record per entity. The kind discriminant carries the per-kind
//! payload, so there is no entity class hierarchy to downcast through.

use crate::geometry::Rect;
use crate::weapon::WeaponKind;
use crate::EntityId;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Pickup item kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Health,
    Ammo,
    Rifle,
    Shotgun,
    Launcher,
    Coin,
}

impl ItemKind {
    /// All kinds in wire-tag order
    pub const ALL: [ItemKind; 6] = [
        ItemKind::Health,
        ItemKind::Ammo,
        ItemKind::Rifle,
        ItemKind::Shotgun,
        ItemKind::Launcher,
        ItemKind::Coin,
    ];

    /// Stable numeric tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ItemKind::tag`]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// The weapon this item grants, if it is a weapon pickup
    pub fn weapon(self) -> Option<WeaponKind> {
        match self {
            ItemKind::Rifle => Some(WeaponKind::Rifle),
            ItemKind::Shotgun => Some(WeaponKind::Shotgun),
            ItemKind::Launcher => Some(WeaponKind::Launcher),
            _ => None,
        }
    }
}

/// Entity kind with its kind-specific payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A player avatar; the rest of its state lives in `PlayerState`
    Player,
    /// A pickup lying in the world
    Item { item: ItemKind, amount: u16 },
    /// A flying projectile and the entity that fired it
    Projectile { owner: EntityId },
}

impl EntityKind {
    /// Stable numeric tag of the discriminant
    pub fn tag(&self) -> u8 {
        match self {
            EntityKind::Player => 0,
            EntityKind::Item { .. } => 1,
            EntityKind::Projectile { .. } => 2,
        }
    }
}

/// Player collision shapes relative to the feet position, top to bottom
pub const PLAYER_SHAPES: [Rect; 3] = [
    Rect::new(-4.0, -24.0, 8.0, 8.0),
    Rect::new(-6.0, -16.0, 12.0, 10.0),
    Rect::new(-6.0, -6.0, 12.0, 6.0),
];
/// Index of the topmost player shape (head)
pub const HEAD_SHAPE: usize = 0;
/// Index of the lowest player shape (feet)
pub const FEET_SHAPE: usize = 2;

const ITEM_SHAPES: [Rect; 1] = [Rect::new(-4.0, -4.0, 8.0, 8.0)];
const PROJECTILE_SHAPES: [Rect; 1] = [Rect::new(-2.0, -2.0, 4.0, 4.0)];

/// The per-tick transform and identity of one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub rotation: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub kind: EntityKind,
}

impl EntitySnapshot {
    /// A stationary entity at `position`
    pub fn new(id: EntityId, kind: EntityKind, position: Vec2) -> Self {
        Self {
            id,
            position,
            rotation: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            kind,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player)
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, EntityKind::Item { .. })
    }

    pub fn is_projectile(&self) -> bool {
        matches!(self.kind, EntityKind::Projectile { .. })
    }

    /// Owner of a projectile
    pub fn owner(&self) -> Option<EntityId> {
        match self.kind {
            EntityKind::Projectile { owner } => Some(owner),
            _ => None,
        }
    }

    /// Collision shapes relative to `position`
    pub fn shapes(&self) -> &'static [Rect] {
        match self.kind {
            EntityKind::Player => &PLAYER_SHAPES,
            EntityKind::Item { .. } => &ITEM_SHAPES,
            EntityKind::Projectile { .. } => &PROJECTILE_SHAPES,
        }
    }

    /// Collision shapes in world space
    pub fn world_shapes(&self) -> impl Iterator<Item = (usize, Rect)> + '_ {
        self.shapes()
            .iter()
            .enumerate()
            .map(move |(i, shape)| (i, shape.translated(self.position)))
    }
}
