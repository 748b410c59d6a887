//! Movement integrator
//!
//! Advances entity transforms by their velocity over one timestep and stops
//! them at the first contact with another entity or static geometry. Contacts
//! of projectiles are reported through a callback so the caller can apply
//! whatever game rules it wants.

use crate::entity::{EntitySnapshot, FEET_SHAPE};
use crate::geometry::{closest_point_on_bounds_to_origin, minkowski_difference, ray_fraction, Rect};
use crate::quantize::{snap_position, snap_velocity};
use crate::snapshot::EntityFrame;
use crate::EntityId;
use glam::Vec2;

/// What a moving entity ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collider {
    Entity(EntityId),
    /// Index into the static geometry slice
    Static(usize),
}

/// A projectile contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// The moving entity
    pub entity: EntityId,
    pub collider: Collider,
    /// Shape index on the collider (0 for static geometry)
    pub shape: usize,
}

fn blocks(mover: &EntitySnapshot, other: &EntitySnapshot) -> bool {
    if other.id == mover.id || other.is_item() {
        return false;
    }
    // Projectiles pass through whoever fired them, in both directions
    mover.owner() != Some(other.id) && other.owner() != Some(mover.id)
}

/// Smallest safe motion ratio of one shape pair, pushing `position` out of an overlap
fn pair_ratio(shape: &Rect, position: &mut Vec2, collider: &Rect, motion: Vec2) -> Option<f32> {
    let md = minkowski_difference(collider, &shape.translated(*position));
    if md.contains_strict(Vec2::ZERO) {
        *position += closest_point_on_bounds_to_origin(&md);
        Some(0.0)
    } else {
        ray_fraction(motion, &md)
    }
}

/// Advance one entity by `dt`
///
/// Rotation advances freely. Position advances by `velocity * dt` scaled by
/// the smallest ratio in [0, 1] that avoids entering any other non-item
/// entity or static rectangle; overlaps that already exist are separated
/// along the shortest axis and stop the entity for this step, including
/// entities that are standing still. Between two players only the feet
/// shapes collide. Returns the applied ratio.
pub fn integrate<'a, I, F>(
    dt: f32,
    entity: &mut EntitySnapshot,
    others: I,
    statics: &[Rect],
    on_contact: &mut F,
) -> f32
where
    I: IntoIterator<Item = &'a EntitySnapshot>,
    F: FnMut(Contact),
{
    entity.rotation += entity.angular_velocity * dt;

    let motion = entity.velocity * dt;
    let mut ratio = 1.0f32;
    let mut contact = None;
    let shapes = entity.shapes();

    for other in others {
        if !blocks(entity, other) {
            continue;
        }
        let feet_only = entity.is_player() && other.is_player();
        let relative = motion - other.velocity * dt;
        for (i, shape) in shapes.iter().enumerate() {
            if feet_only && i != FEET_SHAPE {
                continue;
            }
            for (j, collider) in other.world_shapes() {
                if feet_only && j != FEET_SHAPE {
                    continue;
                }
                if let Some(r) = pair_ratio(shape, &mut entity.position, &collider, relative) {
                    if r < ratio {
                        ratio = r;
                        contact = Some(Contact {
                            entity: entity.id,
                            collider: Collider::Entity(other.id),
                            shape: j,
                        });
                    }
                }
            }
        }
    }

    for (index, wall) in statics.iter().enumerate() {
        for shape in shapes {
            if let Some(r) = pair_ratio(shape, &mut entity.position, wall, motion) {
                if r < ratio {
                    ratio = r;
                    contact = Some(Contact {
                        entity: entity.id,
                        collider: Collider::Static(index),
                        shape: 0,
                    });
                }
            }
        }
    }

    entity.position += motion * ratio;

    if entity.is_projectile() {
        if let Some(contact) = contact {
            on_contact(contact);
        }
    }
    ratio
}

/// Snap an entity's position and velocity onto the shared grid
pub fn quantize(entity: &mut EntitySnapshot) {
    entity.position = snap_position(entity.position);
    entity.velocity = snap_velocity(entity.velocity);
}

/// Integrate every entity in ascending id order, skipping `excluded` ones
///
/// Each mover sees the already-advanced positions of the entities before it.
/// Results are quantized after each move.
pub fn step_world<X, F>(
    dt: f32,
    frame: &mut EntityFrame,
    statics: &[Rect],
    excluded: X,
    on_contact: &mut F,
) where
    X: Fn(EntityId) -> bool,
    F: FnMut(Contact),
{
    let ids: Vec<EntityId> = frame.keys().copied().filter(|id| !excluded(*id)).collect();
    for id in ids {
        let Some(mut entity) = frame.get(&id).copied() else {
            continue;
        };
        let others = frame.values().filter(|o| o.id != id && !excluded(o.id));
        integrate(dt, &mut entity, others, statics, on_contact);
        quantize(&mut entity);
        frame.insert(id, entity);
    }
}
