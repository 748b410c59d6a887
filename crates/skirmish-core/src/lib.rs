//! Skirmish Core - deterministic rules of a 2D multiplayer arena shooter
//!
//! This crate holds everything both peers must agree on bit for bit:
//! - Identifiers, ticks and the fixed-step clock
//! - The world data model (`EntitySnapshot`, `PlayerState`, `SnapshotData`)
//! - Collision math and the movement integrator
//! - Hit-scan resolution and the weapon catalogue
//! - Player rules shared by server simulation and client prediction
//! - The quantization grid used by the wire codec
//!
//! Nothing in here performs I/O or keeps hidden state; the server and the
//! client predictor call the same functions with the same inputs.

mod entity;
mod error;
pub mod geometry;
pub mod hitscan;
mod identity;
mod input;
pub mod level;
pub mod movement;
mod player;
pub mod player_logic;
pub mod quantize;
mod rng;
mod snapshot;
pub mod time;
pub mod weapon;

pub use entity::{EntityKind, EntitySnapshot, ItemKind, FEET_SHAPE, HEAD_SHAPE, PLAYER_SHAPES};
pub use error::{Error, Result};
pub use geometry::{Rect, Segment};
pub use hitscan::RayHit;
pub use identity::{EntityId, PlayerId, Sequence, Tick, MAX_PLAYERS};
pub use input::{ClientInputMessage, PickupRequest};
pub use level::{Level, TileCoord};
pub use movement::{Collider, Contact};
pub use player::{
    AnimationState, InventoryItem, PlayerState, WeaponSlot, MAX_HEALTH, MAX_INVENTORY_AMOUNT,
    WEAPON_SLOTS,
};
pub use player_logic::MovementConfig;
pub use rng::GameRng;
pub use snapshot::{EntityFrame, HitEvent, NoBaseline, SnapshotData, SnapshotLookup};
pub use time::Clock;
pub use weapon::{WeaponKind, WeaponStats};
