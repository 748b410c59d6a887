//! Computer-controlled players
//!
//! A bot reads the same snapshot a client would receive and answers with an
//! ordinary `ClientInputMessage`, which the server queues exactly like a
//! remote command. Besides the snapshot it only knows the level's walls,
//! which every client has too.

use crate::combat::{MUZZLE_OFFSET, PICKUP_REACH};
use glam::Vec2;
use skirmish_core::geometry::segment_rect_intersection;
use skirmish_core::{
    ClientInputMessage, EntityKind, EntitySnapshot, GameRng, PickupRequest, PlayerId, PlayerState,
    Rect, Segment, Sequence, SnapshotData, Tick,
};

/// Ticks between changes of wandering direction
const WANDER_TICKS: Tick = 45;

/// Engagement distance for weapons without a ray range
const PROJECTILE_RANGE: f32 = 400.0;

/// Farthest item a bot goes out of its way for
const ITEM_SIGHT: f32 = 320.0;

/// A simple deathmatch bot
#[derive(Debug, Clone)]
pub struct Bot {
    player: PlayerId,
    sequence: Sequence,
    rng: GameRng,
    wander: Vec2,
    wander_until: Tick,
    /// Which way to go around cover, +1 or -1
    side: f32,
    last_position: Option<Vec2>,
}

impl Bot {
    pub fn new(player: PlayerId, seed: u64) -> Self {
        Self {
            player,
            sequence: 0,
            rng: GameRng::new(seed ^ (((player.0 as u64) << 32) | 0xb07)),
            wander: Vec2::ZERO,
            wander_until: 0,
            side: 1.0,
            last_position: None,
        }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Decide this tick's command; `None` while the bot has no avatar
    pub fn think(&mut self, snapshot: &SnapshotData, walls: &[Rect]) -> Option<ClientInputMessage> {
        let (state, avatar) = snapshot.player_entity(self.player)?;
        self.sequence += 1;
        // Pressed against something: try the other way round
        if self.last_position == Some(avatar.position) {
            self.side = -self.side;
            self.wander_until = snapshot.tick;
        }
        self.last_position = Some(avatar.position);

        let mut input = ClientInputMessage {
            sequence: self.sequence,
            last_received_tick: snapshot.tick,
            aim: avatar.position + Vec2::X * 32.0,
            ..Default::default()
        };

        if let Some(slot) = better_slot(state) {
            input.change_weapon = true;
            input.slot = slot;
        } else if state.active().ammo == 0 {
            input.reload = true;
        }

        let weapon = state.active().kind.stats();
        let range = if weapon.range > 0.0 {
            weapon.range
        } else {
            PROJECTILE_RANGE
        };

        if let Some(enemy) = nearest_enemy(snapshot, self.player, avatar.position) {
            let target = enemy.position + MUZZLE_OFFSET;
            let distance = avatar.position.distance(enemy.position);
            let visible = in_sight(avatar.position + MUZZLE_OFFSET, target, walls);
            input.aim = target;
            input.shoot = visible
                && distance <= range
                && state.active().ammo > 0
                && !input.change_weapon;
            let toward = (enemy.position - avatar.position).normalize_or_zero();
            let across = crosswise(toward) * self.side;
            input.direction = if !visible {
                (toward + across).normalize_or_zero()
            } else if distance > range * 0.5 {
                toward
            } else {
                across
            };
            input.run = distance > range || !visible;
            return Some(input);
        }

        if let Some(item) = nearest_item(snapshot, avatar.position) {
            let offset = item.position - avatar.position;
            if let EntityKind::Item { item: kind, amount } = item.kind {
                if offset.length() <= PICKUP_REACH {
                    input.interact = true;
                    input.pickup = Some(PickupRequest {
                        kind,
                        amount,
                        target: item.id,
                    });
                }
            }
            input.direction = offset.normalize_or_zero();
            input.aim = item.position;
            return Some(input);
        }

        if snapshot.tick >= self.wander_until {
            let angle = self.rng.range_f32(0.0, std::f32::consts::TAU);
            self.wander = Vec2::from_angle(angle);
            self.wander_until = snapshot.tick.saturating_add(WANDER_TICKS);
        }
        input.direction = self.wander;
        input.aim = avatar.position + self.wander * 32.0;
        Some(input)
    }
}

/// The perpendicular of `v` pointing down the screen, or right when it is
/// horizontal
///
/// Two bots facing each other get the same one, so they sidestep in
/// parallel rather than circling cover in lockstep.
fn crosswise(v: Vec2) -> Vec2 {
    let perp = v.perp();
    if perp.y > 0.0 || (perp.y == 0.0 && perp.x > 0.0) {
        perp
    } else {
        -perp
    }
}

/// True if no wall crosses the straight line between two points
fn in_sight(from: Vec2, to: Vec2, walls: &[Rect]) -> bool {
    let line = Segment::new(from, to);
    !walls
        .iter()
        .any(|wall| segment_rect_intersection(&line, wall).is_some())
}

/// A loaded slot to switch to when the active one is dry
fn better_slot(state: &PlayerState) -> Option<u8> {
    if state.active().ammo > 0 {
        return None;
    }
    state
        .slots
        .iter()
        .position(|slot| !slot.is_empty() && slot.ammo > 0)
        .map(|index| index as u8)
}

fn nearest_enemy<'a>(
    snapshot: &'a SnapshotData,
    me: PlayerId,
    from: Vec2,
) -> Option<&'a EntitySnapshot> {
    snapshot
        .players
        .iter()
        .filter(|(id, state)| **id != me && state.is_alive())
        .filter_map(|(_, state)| snapshot.entity(state.entity))
        .min_by(|a, b| {
            from.distance_squared(a.position)
                .total_cmp(&from.distance_squared(b.position))
        })
}

fn nearest_item(snapshot: &SnapshotData, from: Vec2) -> Option<&EntitySnapshot> {
    snapshot
        .entities
        .values()
        .filter(|e| e.is_item() && e.position.distance(from) <= ITEM_SIGHT)
        .min_by(|a, b| {
            from.distance_squared(a.position)
                .total_cmp(&from.distance_squared(b.position))
        })
}
