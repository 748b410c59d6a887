//! Hit-scan resolution: instant rays against entities and static geometry

use crate::entity::{EntitySnapshot, HEAD_SHAPE};
use crate::geometry::{segment_rect_intersection, Rect, Segment};
use crate::weapon::{fire_rays, WeaponKind};
use crate::EntityId;
use glam::Vec2;

/// Result of one ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Entity hit, [`EntityId::NONE`] for world geometry or a miss
    pub entity: EntityId,
    /// Shape index on the hit entity
    pub shape: Option<usize>,
    /// End of the ray, clipped at the hit point
    pub end: Vec2,
    /// The ray struck the topmost shape of a player
    pub headshot: bool,
}

impl RayHit {
    pub fn is_entity_hit(&self) -> bool {
        !self.entity.is_none()
    }
}

/// Cast one ray, returning the closest hit
///
/// The shooter and items are never candidates. Entities are tested in
/// iteration order before static geometry; on equal distance the earlier
/// candidate wins.
pub fn raycast<'a, I>(segment: &Segment, shooter: EntityId, entities: I, statics: &[Rect]) -> RayHit
where
    I: IntoIterator<Item = &'a EntitySnapshot>,
{
    let mut best: Option<(f32, EntityId, Option<usize>, bool)> = None;
    let mut consider = |fraction: f32, entity: EntityId, shape: Option<usize>, head: bool| {
        if best.map_or(true, |(f, ..)| fraction < f) {
            best = Some((fraction, entity, shape, head));
        }
    };

    for entity in entities {
        if entity.id == shooter || entity.is_item() || entity.owner() == Some(shooter) {
            continue;
        }
        for (i, shape) in entity.world_shapes() {
            if let Some(hit) = segment_rect_intersection(segment, &shape) {
                consider(
                    hit.fraction,
                    entity.id,
                    Some(i),
                    entity.is_player() && i == HEAD_SHAPE,
                );
            }
        }
    }
    for wall in statics {
        if let Some(hit) = segment_rect_intersection(segment, wall) {
            consider(hit.fraction, EntityId::NONE, None, false);
        }
    }

    match best {
        Some((fraction, entity, shape, headshot)) => RayHit {
            entity,
            shape,
            end: segment.point_at(fraction),
            headshot,
        },
        None => RayHit {
            entity: EntityId::NONE,
            shape: None,
            end: segment.end,
            headshot: false,
        },
    }
}

/// Fire a hit-scan weapon: one ray per pellet
pub fn fire<'a, I>(
    kind: WeaponKind,
    origin: Vec2,
    aim: Vec2,
    shooter: EntityId,
    entities: I,
    statics: &[Rect],
) -> Vec<(Segment, RayHit)>
where
    I: IntoIterator<Item = &'a EntitySnapshot> + Clone,
{
    fire_rays(kind, origin, aim)
        .into_iter()
        .map(|ray| {
            let hit = raycast(&ray, shooter, entities.clone(), statics);
            (ray, hit)
        })
        .collect()
}
