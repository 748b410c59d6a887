//! Player rules shared by the server and the client predictor
//!
//! Both sides run exactly these functions on exactly these inputs, so a
//! client replaying its unacknowledged commands lands where the server did.

use crate::entity::EntitySnapshot;
use crate::geometry::Rect;
use crate::input::ClientInputMessage;
use crate::movement::{integrate, quantize};
use crate::player::{AnimationState, PlayerState, WEAPON_SLOTS};
use crate::quantize::{snap_position, snap_velocity};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Movement tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Units per second while walking
    pub walk_speed: f32,
    /// Units per second while running
    pub run_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 96.0,
            run_speed: 160.0,
        }
    }
}

/// Apply the movement, aim and weapon-selection parts of a command
///
/// Shooting, interacting and reloading need the authoritative server and are
/// handled there.
pub fn apply_input(
    entity: &mut EntitySnapshot,
    player: &mut PlayerState,
    input: &ClientInputMessage,
    config: &MovementConfig,
) {
    if !player.is_alive() {
        entity.velocity = Vec2::ZERO;
        return;
    }

    let direction = input.direction.normalize_or_zero();
    let speed = if input.run {
        config.run_speed
    } else {
        config.walk_speed
    };
    entity.velocity = snap_velocity(direction * speed);

    player.aim = snap_position(input.aim);
    player.facing_left = player.aim.x < entity.position.x;

    if input.change_weapon && (input.slot as usize) < WEAPON_SLOTS {
        player.active_slot = input.slot;
    }

    player.animation = if direction == Vec2::ZERO {
        AnimationState::Idle
    } else if input.run {
        AnimationState::Run
    } else {
        AnimationState::Walk
    };
}

/// Simulate one tick of a single player against a fixed world
///
/// Used by the client to predict its own avatar. The server integrates the
/// whole world instead, but with the same rules.
pub fn step_player<'a, I>(
    dt: f32,
    entity: &mut EntitySnapshot,
    player: &mut PlayerState,
    input: &ClientInputMessage,
    others: I,
    statics: &[Rect],
    config: &MovementConfig,
) where
    I: IntoIterator<Item = &'a EntitySnapshot>,
{
    apply_input(entity, player, input, config);
    integrate(dt, entity, others, statics, &mut |_| {});
    quantize(entity);
}
