//! Full and delta snapshot bodies
//!
//! A full snapshot spells out every field. A delta snapshot names an optional
//! baseline tick, lists the entities and players that disappeared since the
//! baseline, and for everything that changed sends one flag bit per field
//! followed by the value only when the flag is set. Hits are per-tick events
//! and are always sent in full.

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};
use skirmish_core::{
    AnimationState, EntityFrame, EntityId, EntityKind, EntitySnapshot, HitEvent, InventoryItem,
    ItemKind, PlayerId, PlayerState, SnapshotData, SnapshotLookup, Tick, WeaponKind, WeaponSlot,
    MAX_HEALTH, MAX_INVENTORY_AMOUNT, MAX_PLAYERS, WEAPON_SLOTS,
};
use std::collections::BTreeMap;

/// Largest entity or player list a snapshot can carry
const MAX_COUNT: u32 = u16::MAX as u32;

fn write_count(w: &mut BitWriter, field: &'static str, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| Error::InvalidValue {
        field,
        value: len as u64,
    })?;
    w.write_ranged(field, len, 0, MAX_COUNT)
}

pub(crate) fn write_player_id(w: &mut BitWriter, id: PlayerId) -> Result<()> {
    w.write_ranged("player id", id.raw() as u32, 0, MAX_PLAYERS as u32 - 1)
}

pub(crate) fn read_player_id(r: &mut BitReader<'_>) -> Result<PlayerId> {
    Ok(PlayerId(r.read_ranged("player id", 0, MAX_PLAYERS as u32 - 1)? as u8))
}

pub(crate) fn write_item_kind(w: &mut BitWriter, kind: ItemKind) -> Result<()> {
    w.write_ranged("item kind", kind.tag() as u32, 0, ItemKind::ALL.len() as u32 - 1)
}

pub(crate) fn read_item_kind(r: &mut BitReader<'_>) -> Result<ItemKind> {
    let tag = r.read_ranged("item kind", 0, ItemKind::ALL.len() as u32 - 1)?;
    ItemKind::from_tag(tag as u8).ok_or(Error::InvalidValue {
        field: "item kind",
        value: tag as u64,
    })
}

pub(crate) fn write_amount(w: &mut BitWriter, amount: u16) -> Result<()> {
    w.write_ranged("amount", amount as u32, 0, MAX_INVENTORY_AMOUNT as u32)
}

pub(crate) fn read_amount(r: &mut BitReader<'_>) -> Result<u16> {
    Ok(r.read_ranged("amount", 0, MAX_INVENTORY_AMOUNT as u32)? as u16)
}

fn write_kind(w: &mut BitWriter, kind: &EntityKind) -> Result<()> {
    w.write_ranged("entity kind", kind.tag() as u32, 0, 2)?;
    match kind {
        EntityKind::Player => {}
        EntityKind::Item { item, amount } => {
            write_item_kind(w, *item)?;
            write_amount(w, *amount)?;
        }
        EntityKind::Projectile { owner } => w.write_u32(owner.raw()),
    }
    Ok(())
}

fn read_kind(r: &mut BitReader<'_>) -> Result<EntityKind> {
    match r.read_ranged("entity kind", 0, 2)? {
        0 => Ok(EntityKind::Player),
        1 => Ok(EntityKind::Item {
            item: read_item_kind(r)?,
            amount: read_amount(r)?,
        }),
        _ => Ok(EntityKind::Projectile {
            owner: EntityId(r.read_u32()?),
        }),
    }
}

fn write_entity(w: &mut BitWriter, e: &EntitySnapshot) -> Result<()> {
    write_kind(w, &e.kind)?;
    w.write_position(e.position);
    w.write_f32(e.rotation);
    w.write_velocity(e.velocity);
    w.write_f32(e.angular_velocity);
    Ok(())
}

fn read_entity(r: &mut BitReader<'_>, id: EntityId) -> Result<EntitySnapshot> {
    let kind = read_kind(r)?;
    Ok(EntitySnapshot {
        id,
        kind,
        position: r.read_position()?,
        rotation: r.read_f32()?,
        velocity: r.read_velocity()?,
        angular_velocity: r.read_f32()?,
    })
}

fn write_animation(w: &mut BitWriter, a: AnimationState) -> Result<()> {
    w.write_ranged("animation", a.tag() as u32, 0, AnimationState::ALL.len() as u32 - 1)
}

fn read_animation(r: &mut BitReader<'_>) -> Result<AnimationState> {
    let tag = r.read_ranged("animation", 0, AnimationState::ALL.len() as u32 - 1)?;
    AnimationState::from_tag(tag as u8).ok_or(Error::InvalidValue {
        field: "animation",
        value: tag as u64,
    })
}

fn write_health(w: &mut BitWriter, health: u8) -> Result<()> {
    w.write_ranged("health", health as u32, 0, MAX_HEALTH as u32)
}

fn read_health(r: &mut BitReader<'_>) -> Result<u8> {
    Ok(r.read_ranged("health", 0, MAX_HEALTH as u32)? as u8)
}

fn write_active_slot(w: &mut BitWriter, slot: u8) -> Result<()> {
    w.write_ranged("active slot", slot as u32, 0, WEAPON_SLOTS as u32 - 1)
}

fn read_active_slot(r: &mut BitReader<'_>) -> Result<u8> {
    Ok(r.read_ranged("active slot", 0, WEAPON_SLOTS as u32 - 1)? as u8)
}

fn write_slot(w: &mut BitWriter, slot: &WeaponSlot) -> Result<()> {
    w.write_ranged("weapon", slot.kind.tag() as u32, 0, WeaponKind::ALL.len() as u32 - 1)?;
    w.write_u8(slot.ammo);
    Ok(())
}

fn read_slot(r: &mut BitReader<'_>) -> Result<WeaponSlot> {
    let tag = r.read_ranged("weapon", 0, WeaponKind::ALL.len() as u32 - 1)?;
    let kind = WeaponKind::from_tag(tag as u8).ok_or(Error::InvalidValue {
        field: "weapon",
        value: tag as u64,
    })?;
    Ok(WeaponSlot {
        kind,
        ammo: r.read_u8()?,
    })
}

fn write_player(w: &mut BitWriter, p: &PlayerState) -> Result<()> {
    w.write_u32(p.entity.raw());
    write_animation(w, p.animation)?;
    w.write_position(p.aim);
    write_health(w, p.health)?;
    w.write_bool(p.facing_left);
    write_active_slot(w, p.active_slot)?;
    for slot in &p.slots {
        write_slot(w, slot)?;
    }
    Ok(())
}

fn read_player(r: &mut BitReader<'_>) -> Result<PlayerState> {
    let entity = EntityId(r.read_u32()?);
    let animation = read_animation(r)?;
    let aim = r.read_position()?;
    let health = read_health(r)?;
    let facing_left = r.read_bool()?;
    let active_slot = read_active_slot(r)?;
    let mut slots = [WeaponSlot::default(); WEAPON_SLOTS];
    for slot in &mut slots {
        *slot = read_slot(r)?;
    }
    Ok(PlayerState {
        entity,
        animation,
        aim,
        health,
        facing_left,
        active_slot,
        slots,
    })
}

fn write_inventory(w: &mut BitWriter, items: &[InventoryItem]) -> Result<()> {
    write_count(w, "inventory", items.len())?;
    for item in items {
        write_player_id(w, item.owner)?;
        write_item_kind(w, item.kind)?;
        write_amount(w, item.amount)?;
    }
    Ok(())
}

fn read_inventory(r: &mut BitReader<'_>) -> Result<Vec<InventoryItem>> {
    let count = r.read_ranged("inventory", 0, MAX_COUNT)?;
    let mut items = Vec::new();
    for _ in 0..count {
        items.push(InventoryItem {
            owner: read_player_id(r)?,
            kind: read_item_kind(r)?,
            amount: read_amount(r)?,
        });
    }
    Ok(items)
}

fn write_hits(w: &mut BitWriter, hits: &[HitEvent]) -> Result<()> {
    write_count(w, "hits", hits.len())?;
    for hit in hits {
        write_player_id(w, hit.shooter)?;
        w.write_u32(hit.target.raw());
        w.write_position(hit.start);
        w.write_position(hit.end);
        w.write_bool(hit.headshot);
    }
    Ok(())
}

fn read_hits(r: &mut BitReader<'_>) -> Result<Vec<HitEvent>> {
    let count = r.read_ranged("hits", 0, MAX_COUNT)?;
    let mut hits = Vec::new();
    for _ in 0..count {
        hits.push(HitEvent {
            shooter: read_player_id(r)?,
            target: EntityId(r.read_u32()?),
            start: r.read_position()?,
            end: r.read_position()?,
            headshot: r.read_bool()?,
        });
    }
    Ok(hits)
}

/// Write a complete snapshot body
pub fn write_full(w: &mut BitWriter, snap: &SnapshotData) -> Result<()> {
    w.write_u32(snap.tick);
    w.write_u32(snap.last_input_sequence);
    w.write_checkpoint();

    write_count(w, "entities", snap.entities.len())?;
    for entity in snap.entities.values() {
        w.write_u32(entity.id.raw());
        write_entity(w, entity)?;
    }
    w.write_checkpoint();

    write_count(w, "players", snap.players.len())?;
    for (id, player) in &snap.players {
        write_player_id(w, *id)?;
        write_player(w, player)?;
    }
    w.write_checkpoint();

    write_inventory(w, &snap.inventory)?;
    write_hits(w, &snap.hits)?;
    w.write_checkpoint();
    Ok(())
}

/// Read a body written by [`write_full`]
pub fn read_full(r: &mut BitReader<'_>) -> Result<SnapshotData> {
    let mut snap = SnapshotData::new(r.read_u32()?);
    snap.last_input_sequence = r.read_u32()?;
    r.read_checkpoint()?;

    let count = r.read_ranged("entities", 0, MAX_COUNT)?;
    for _ in 0..count {
        let id = EntityId(r.read_u32()?);
        let entity = read_entity(r, id)?;
        snap.entities.insert(id, entity);
    }
    r.read_checkpoint()?;

    let count = r.read_ranged("players", 0, MAX_COUNT)?;
    for _ in 0..count {
        let id = read_player_id(r)?;
        let player = read_player(r)?;
        snap.players.insert(id, player);
    }
    r.read_checkpoint()?;

    snap.inventory = read_inventory(r)?;
    snap.hits = read_hits(r)?;
    r.read_checkpoint()?;
    Ok(snap)
}

/// Write one changed-field flag and, if set, the value
fn write_field<T: PartialEq>(
    w: &mut BitWriter,
    current: &T,
    base: &T,
    write: impl FnOnce(&mut BitWriter, &T) -> Result<()>,
) -> Result<()> {
    let changed = current != base;
    w.write_bool(changed);
    if changed {
        write(w, current)?;
    }
    Ok(())
}

/// Read one changed-field flag and, if set, the value; otherwise keep `base`
fn read_field<T: Clone>(
    r: &mut BitReader<'_>,
    base: &T,
    read: impl FnOnce(&mut BitReader<'_>) -> Result<T>,
) -> Result<T> {
    if r.read_bool()? {
        read(r)
    } else {
        Ok(base.clone())
    }
}

fn float_bits_differ(a: f32, b: f32) -> bool {
    a.to_bits() != b.to_bits()
}

fn write_entity_delta(w: &mut BitWriter, e: &EntitySnapshot, base: &EntitySnapshot) -> Result<()> {
    write_field(w, &e.kind, &base.kind, |w, k| write_kind(w, k))?;
    write_field(w, &e.position, &base.position, |w, v| {
        w.write_position(*v);
        Ok(())
    })?;
    let rotation_changed = float_bits_differ(e.rotation, base.rotation);
    w.write_bool(rotation_changed);
    if rotation_changed {
        w.write_f32(e.rotation);
    }
    write_field(w, &e.velocity, &base.velocity, |w, v| {
        w.write_velocity(*v);
        Ok(())
    })?;
    let spin_changed = float_bits_differ(e.angular_velocity, base.angular_velocity);
    w.write_bool(spin_changed);
    if spin_changed {
        w.write_f32(e.angular_velocity);
    }
    Ok(())
}

fn read_entity_delta(r: &mut BitReader<'_>, base: &EntitySnapshot) -> Result<EntitySnapshot> {
    Ok(EntitySnapshot {
        id: base.id,
        kind: read_field(r, &base.kind, read_kind)?,
        position: read_field(r, &base.position, |r| r.read_position())?,
        rotation: read_field(r, &base.rotation, |r| r.read_f32())?,
        velocity: read_field(r, &base.velocity, |r| r.read_velocity())?,
        angular_velocity: read_field(r, &base.angular_velocity, |r| r.read_f32())?,
    })
}

fn write_player_delta(w: &mut BitWriter, p: &PlayerState, base: &PlayerState) -> Result<()> {
    write_field(w, &p.entity, &base.entity, |w, id| {
        w.write_u32(id.raw());
        Ok(())
    })?;
    write_field(w, &p.animation, &base.animation, |w, a| write_animation(w, *a))?;
    write_field(w, &p.aim, &base.aim, |w, v| {
        w.write_position(*v);
        Ok(())
    })?;
    write_field(w, &p.health, &base.health, |w, h| write_health(w, *h))?;
    write_field(w, &p.facing_left, &base.facing_left, |w, f| {
        w.write_bool(*f);
        Ok(())
    })?;
    write_field(w, &p.active_slot, &base.active_slot, |w, s| write_active_slot(w, *s))?;
    for (slot, base_slot) in p.slots.iter().zip(&base.slots) {
        write_field(w, slot, base_slot, write_slot)?;
    }
    Ok(())
}

fn read_player_delta(r: &mut BitReader<'_>, base: &PlayerState) -> Result<PlayerState> {
    let entity = read_field(r, &base.entity, |r| Ok(EntityId(r.read_u32()?)))?;
    let animation = read_field(r, &base.animation, read_animation)?;
    let aim = read_field(r, &base.aim, |r| r.read_position())?;
    let health = read_field(r, &base.health, read_health)?;
    let facing_left = read_field(r, &base.facing_left, |r| r.read_bool())?;
    let active_slot = read_field(r, &base.active_slot, read_active_slot)?;
    let mut slots = base.slots;
    for slot in &mut slots {
        *slot = read_field(r, slot, read_slot)?;
    }
    Ok(PlayerState {
        entity,
        animation,
        aim,
        health,
        facing_left,
        active_slot,
        slots,
    })
}

fn removed_ids<K: Ord + Copy, V>(base: &BTreeMap<K, V>, current: &BTreeMap<K, V>) -> Vec<K> {
    base.keys().filter(|k| !current.contains_key(*k)).copied().collect()
}

/// Write a delta body against `baseline`, or against nothing
///
/// `baseline` must be the snapshot the receiver will find under
/// `baseline.tick`.
pub fn write_delta(w: &mut BitWriter, snap: &SnapshotData, baseline: Option<&SnapshotData>) -> Result<()> {
    let empty = SnapshotData::default();
    w.write_u32(snap.tick);
    w.write_u32(snap.last_input_sequence);
    w.write_bool(baseline.is_some());
    if let Some(base) = baseline {
        w.write_u32(base.tick);
    }
    let base = baseline.unwrap_or(&empty);
    w.write_checkpoint();

    let removed = removed_ids(&base.entities, &snap.entities);
    write_count(w, "removed entities", removed.len())?;
    for id in removed {
        w.write_u32(id.raw());
    }
    let changed: Vec<&EntitySnapshot> = snap
        .entities
        .values()
        .filter(|e| entity_changed(e, base.entities.get(&e.id)))
        .collect();
    write_count(w, "changed entities", changed.len())?;
    for entity in changed {
        w.write_u32(entity.id.raw());
        match base.entities.get(&entity.id) {
            Some(prev) => write_entity_delta(w, entity, prev)?,
            None => write_entity(w, entity)?,
        }
    }
    w.write_checkpoint();

    let removed = removed_ids(&base.players, &snap.players);
    write_count(w, "removed players", removed.len())?;
    for id in removed {
        write_player_id(w, id)?;
    }
    let changed: Vec<(&PlayerId, &PlayerState)> = snap
        .players
        .iter()
        .filter(|(id, p)| base.players.get(*id) != Some(*p))
        .collect();
    write_count(w, "changed players", changed.len())?;
    for (id, player) in changed {
        write_player_id(w, *id)?;
        match base.players.get(id) {
            Some(prev) => write_player_delta(w, player, prev)?,
            None => write_player(w, player)?,
        }
    }
    w.write_checkpoint();

    let inventory_changed = snap.inventory != base.inventory;
    w.write_bool(inventory_changed);
    if inventory_changed {
        write_inventory(w, &snap.inventory)?;
    }
    write_hits(w, &snap.hits)?;
    w.write_checkpoint();
    Ok(())
}

/// New, or different from the baseline down to the sign of zero
fn entity_changed(e: &EntitySnapshot, base: Option<&EntitySnapshot>) -> bool {
    match base {
        None => true,
        Some(b) => {
            e != b
                || float_bits_differ(e.rotation, b.rotation)
                || float_bits_differ(e.angular_velocity, b.angular_velocity)
        }
    }
}

/// Read a body written by [`write_delta`], fetching its baseline from `lookup`
pub fn read_delta(r: &mut BitReader<'_>, lookup: &dyn SnapshotLookup) -> Result<SnapshotData> {
    let tick: Tick = r.read_u32()?;
    let last_input_sequence = r.read_u32()?;
    let empty = SnapshotData::default();
    let base = if r.read_bool()? {
        let base_tick = r.read_u32()?;
        lookup
            .snapshot_at(base_tick)
            .ok_or(Error::MissingBaseline(base_tick))?
    } else {
        &empty
    };
    r.read_checkpoint()?;

    let mut entities: EntityFrame = base.entities.clone();
    let removed = r.read_ranged("removed entities", 0, MAX_COUNT)?;
    for _ in 0..removed {
        entities.remove(&EntityId(r.read_u32()?));
    }
    let changed = r.read_ranged("changed entities", 0, MAX_COUNT)?;
    for _ in 0..changed {
        let id = EntityId(r.read_u32()?);
        let entity = match base.entities.get(&id) {
            Some(prev) => read_entity_delta(r, prev)?,
            None => read_entity(r, id)?,
        };
        entities.insert(id, entity);
    }
    r.read_checkpoint()?;

    let mut players = base.players.clone();
    let removed = r.read_ranged("removed players", 0, MAX_COUNT)?;
    for _ in 0..removed {
        players.remove(&read_player_id(r)?);
    }
    let changed = r.read_ranged("changed players", 0, MAX_COUNT)?;
    for _ in 0..changed {
        let id = read_player_id(r)?;
        let player = match base.players.get(&id) {
            Some(prev) => read_player_delta(r, prev)?,
            None => read_player(r)?,
        };
        players.insert(id, player);
    }
    r.read_checkpoint()?;

    let inventory = if r.read_bool()? {
        read_inventory(r)?
    } else {
        base.inventory.clone()
    };
    let hits = read_hits(r)?;
    r.read_checkpoint()?;

    Ok(SnapshotData {
        tick,
        last_input_sequence,
        entities,
        players,
        inventory,
        hits,
    })
}
