//! Weapons, projectiles and pickups
//!
//! Resolution (what a shot or a reach test touches) only reads the world, so
//! the server can run it against a rewound frame. Application always mutates
//! the live world afterwards.

use crate::world::World;
use glam::Vec2;
use indexmap::IndexMap;
use skirmish_core::hitscan;
use skirmish_core::quantize::snap_velocity;
use skirmish_core::weapon::aim_direction;
use skirmish_core::{
    Collider, Contact, EntityId, EntityKind, HitEvent, ItemKind, PickupRequest, PlayerId,
    PlayerState, RayHit, Segment, Tick, WeaponKind, WeaponSlot, HEAD_SHAPE,
};
use tracing::{debug, trace};

/// Where shots and projectiles leave a player, relative to the feet
pub const MUZZLE_OFFSET: Vec2 = Vec2::new(0.0, -12.0);

/// Damage factor for rays and projectiles striking the head
pub const HEADSHOT_MULTIPLIER: u8 = 2;

/// Farthest an item can be from a player's feet and still be picked up
pub const PICKUP_REACH: f32 = 24.0;

/// A player death caused by damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kill {
    pub victim: PlayerId,
    pub killer: Option<PlayerId>,
    pub headshot: bool,
}

/// Apply damage, removing the player if it dies
pub fn damage_player(
    world: &mut World,
    victim: PlayerId,
    amount: u8,
    killer: Option<PlayerId>,
    headshot: bool,
) -> Option<Kill> {
    let state = world.players.get_mut(&victim)?;
    if !state.take_damage(amount) {
        return None;
    }
    world.remove_player(victim);
    Some(Kill {
        victim,
        killer,
        headshot,
    })
}

fn scaled(damage: u8, headshot: bool) -> u8 {
    if headshot {
        damage.saturating_mul(HEADSHOT_MULTIPLIER)
    } else {
        damage
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WeaponTimer {
    /// First tick the next shot may fire
    ready_at: Tick,
    /// Slot being reloaded and the tick it completes
    reload: Option<(u8, Tick)>,
}

/// Per-player cooldown and reload bookkeeping
#[derive(Debug)]
pub struct Armory {
    tick_rate: u32,
    timers: IndexMap<PlayerId, WeaponTimer>,
}

impl Armory {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate,
            timers: IndexMap::new(),
        }
    }

    /// True if the active weapon would actually fire this tick
    pub fn can_fire(&self, player: PlayerId, state: &PlayerState, tick: Tick) -> bool {
        let slot = state.active();
        if !state.is_alive() || slot.is_empty() || slot.ammo == 0 {
            return false;
        }
        match self.timers.get(&player) {
            Some(timer) => timer.reload.is_none() && tick >= timer.ready_at,
            None => true,
        }
    }

    /// Spend one round and start the cooldown
    pub fn record_shot(&mut self, player: PlayerId, state: &mut PlayerState, tick: Tick) {
        let slot = state.active_mut();
        slot.ammo = slot.ammo.saturating_sub(1);
        let cooldown = slot.kind.stats().cooldown_ticks(self.tick_rate);
        self.timers.entry(player).or_default().ready_at = tick.saturating_add(cooldown);
    }

    pub fn is_reloading(&self, player: PlayerId) -> bool {
        self.timers
            .get(&player)
            .is_some_and(|timer| timer.reload.is_some())
    }

    /// Begin refilling the active magazine; false if there is nothing to do
    pub fn start_reload(&mut self, player: PlayerId, state: &PlayerState, tick: Tick) -> bool {
        let slot = state.active();
        let stats = slot.kind.stats();
        if slot.is_empty() || slot.ammo >= stats.magazine || self.is_reloading(player) {
            return false;
        }
        let done = tick.saturating_add(stats.reload_ticks(self.tick_rate));
        self.timers.entry(player).or_default().reload = Some((state.active_slot, done));
        trace!(tick, %player, done, "reload started");
        true
    }

    /// Complete every reload due by `tick`
    pub fn finish_reloads(&mut self, world: &mut World, tick: Tick) {
        for (player, timer) in self.timers.iter_mut() {
            let Some((slot, done)) = timer.reload else {
                continue;
            };
            if done > tick {
                continue;
            }
            timer.reload = None;
            if let Some(slot) = world
                .players
                .get_mut(player)
                .and_then(|state| state.slots.get_mut(slot as usize))
            {
                slot.ammo = slot.kind.stats().magazine;
                trace!(tick, %player, "reloaded");
            }
        }
    }

    /// Drop a player's timers, on death or departure
    pub fn forget(&mut self, player: PlayerId) {
        self.timers.shift_remove(&player);
    }
}

/// The rays of one hit-scan shot
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub shooter: PlayerId,
    pub weapon: WeaponKind,
    pub rays: Vec<(Segment, RayHit)>,
}

/// Cast a player's active hit-scan weapon towards `aim`
pub fn resolve_shot(world: &World, shooter: PlayerId, aim: Vec2) -> Option<Shot> {
    let state = world.players.get(&shooter)?;
    let weapon = state.active().kind;
    if !weapon.is_hitscan() {
        return None;
    }
    let avatar = world.entities.get(&state.entity)?;
    let rays = hitscan::fire(
        weapon,
        avatar.position + MUZZLE_OFFSET,
        aim,
        avatar.id,
        world.live_entities(),
        &world.level.walls,
    );
    Some(Shot {
        shooter,
        weapon,
        rays,
    })
}

/// Record the tracers of a resolved shot and deal its damage
///
/// Damage from every ray is summed per victim before it is applied, so a
/// shotgun blast kills at most once.
pub fn apply_shot(world: &mut World, shot: &Shot) -> Vec<Kill> {
    let base = shot.weapon.stats().damage;
    let mut damage: IndexMap<PlayerId, (u32, bool)> = IndexMap::new();
    for (ray, hit) in &shot.rays {
        world.hits.push(HitEvent {
            shooter: shot.shooter,
            target: hit.entity,
            start: ray.start,
            end: hit.end,
            headshot: hit.headshot,
        });
        if let Some(victim) = world.owner_of(hit.entity) {
            let entry = damage.entry(victim).or_default();
            entry.0 += scaled(base, hit.headshot) as u32;
            entry.1 |= hit.headshot;
        }
    }

    let mut kills = Vec::new();
    for (victim, (amount, headshot)) in damage {
        let amount = amount.min(u8::MAX as u32) as u8;
        debug!(tick = world.tick, shooter = %shot.shooter, %victim, amount, headshot, "hit");
        if let Some(kill) = damage_player(world, victim, amount, Some(shot.shooter), headshot) {
            kills.push(kill);
        }
    }
    kills
}

/// Spawn a projectile from a player's active projectile weapon
pub fn launch_projectile(world: &mut World, shooter: PlayerId, aim: Vec2) -> Option<EntityId> {
    let state = world.players.get(&shooter)?;
    let weapon = state.active().kind;
    if !weapon.is_projectile() {
        return None;
    }
    let owner = state.entity;
    let origin = world.entities.get(&owner)?.position + MUZZLE_OFFSET;
    let direction = aim_direction(origin, aim);

    let id = world.spawn_entity(EntityKind::Projectile { owner }, origin);
    if let Some(projectile) = world.entities.get_mut(&id) {
        projectile.velocity = snap_velocity(direction * weapon.stats().projectile_speed);
        projectile.rotation = direction.y.atan2(direction.x);
    }
    trace!(tick = world.tick, %shooter, projectile = %id, "launched");
    Some(id)
}

/// Apply one integrator contact: the projectile is destroyed and a struck
/// player takes damage
///
/// The kill is credited to the owner only while the owner is alive.
pub fn resolve_contact(world: &mut World, contact: &Contact) -> Option<Kill> {
    if world.is_destroyed(contact.entity) {
        return None;
    }
    let EntityKind::Projectile { owner } = world.entities.get(&contact.entity)?.kind else {
        return None;
    };
    world.mark_destroyed(contact.entity);

    let Collider::Entity(target) = contact.collider else {
        return None;
    };
    let victim = world.owner_of(target)?;
    let headshot = contact.shape == HEAD_SHAPE;
    let damage = scaled(WeaponKind::Launcher.stats().damage, headshot);
    let killer = world.owner_of(owner);
    debug!(tick = world.tick, %victim, damage, headshot, "projectile hit");
    damage_player(world, victim, damage, killer, headshot)
}

/// Destroy projectiles that left the playable area
pub fn expire_projectiles(world: &mut World) {
    let bounds = world.level.bounds();
    let lost: Vec<EntityId> = world
        .live_entities()
        .filter(|e| e.is_projectile() && !bounds.contains(e.position))
        .map(|e| e.id)
        .collect();
    for id in lost {
        world.mark_destroyed(id);
    }
}

/// Find the item a pickup request names, if it is within reach
pub fn resolve_pickup(world: &World, player: PlayerId, request: &PickupRequest) -> Option<EntityId> {
    let avatar = world.player_entity(player)?;
    let target = world.live_entities().find(|e| e.id == request.target)?;
    match target.kind {
        EntityKind::Item { item, .. } if item == request.kind => {}
        _ => return None,
    }
    (avatar.position.distance(target.position) <= PICKUP_REACH).then_some(target.id)
}

/// Collect an item into a player's loadout or inventory
///
/// Returns `None` if the item is already gone, for example taken by another
/// player earlier in the same tick.
pub fn apply_pickup(world: &mut World, player: PlayerId, item: EntityId) -> Option<(ItemKind, u16)> {
    if world.is_destroyed(item) {
        return None;
    }
    let EntityKind::Item { item: kind, amount } = world.entities.get(&item)?.kind else {
        return None;
    };
    let state = world.players.get_mut(&player)?;
    let stow = match kind {
        ItemKind::Health => {
            state.heal(amount.min(u8::MAX as u16) as u8);
            false
        }
        ItemKind::Ammo => {
            let slot = state.active_mut();
            if slot.is_empty() {
                true
            } else {
                let magazine = slot.kind.stats().magazine as u16;
                slot.ammo = (slot.ammo as u16 + amount).min(magazine) as u8;
                false
            }
        }
        ItemKind::Coin => true,
        weapon => match weapon.weapon() {
            Some(weapon) => !equip(state, weapon),
            None => true,
        },
    };
    world.mark_destroyed(item);
    if stow {
        world.add_to_inventory(player, kind, amount);
    }
    debug!(tick = world.tick, %player, ?kind, amount, stow, "picked up");
    Some((kind, amount))
}

/// Refill a held weapon or load it into a free slot
fn equip(state: &mut PlayerState, weapon: WeaponKind) -> bool {
    if let Some(slot) = state.slots.iter_mut().find(|s| s.kind == weapon) {
        slot.ammo = weapon.stats().magazine;
        return true;
    }
    match state.free_slot() {
        Some(index) => {
            state.slots[index] = WeaponSlot::loaded(weapon);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{Level, MAX_HEALTH};

    fn duel(shooter_x: f32, target_x: f32) -> World {
        let mut world = World::new(Level::arena("test", 20, 20).unwrap());
        world.spawn_player(PlayerId(0), Vec2::new(shooter_x, 200.0));
        world.spawn_player(PlayerId(1), Vec2::new(target_x, 200.0));
        world
    }

    fn arm(world: &mut World, player: PlayerId, weapon: WeaponKind) {
        let state = world.players.get_mut(&player).unwrap();
        state.slots[0] = WeaponSlot::loaded(weapon);
    }

    #[test]
    fn test_shotgun_fires_eight_rays() {
        let mut world = duel(100.0, 150.0);
        arm(&mut world, PlayerId(0), WeaponKind::Shotgun);

        let shot = resolve_shot(&world, PlayerId(0), Vec2::new(300.0, 188.0)).unwrap();
        assert_eq!(shot.rays.len(), 8);
        for (ray, _) in &shot.rays {
            assert_eq!(ray.delta().normalize(), Vec2::X);
        }

        let kills = apply_shot(&mut world, &shot);
        assert!(kills.is_empty());
        assert_eq!(world.hits.len(), 8);
        // Three rays through the head at double damage, five through the body
        assert_eq!(world.players[&PlayerId(1)].health, MAX_HEALTH - 3 * 18 - 5 * 9);
        assert_eq!(world.hits.iter().filter(|h| h.headshot).count(), 3);
    }

    #[test]
    fn test_lethal_shot_removes_player() {
        let mut world = duel(100.0, 150.0);
        world.players.get_mut(&PlayerId(1)).unwrap().health = 10;
        let target = world.players[&PlayerId(1)].entity;

        let shot = resolve_shot(&world, PlayerId(0), Vec2::new(300.0, 188.0)).unwrap();
        assert_eq!(shot.weapon, WeaponKind::Pistol);
        let kills = apply_shot(&mut world, &shot);
        assert_eq!(
            kills,
            vec![Kill {
                victim: PlayerId(1),
                killer: Some(PlayerId(0)),
                headshot: false
            }]
        );
        assert!(!world.players.contains_key(&PlayerId(1)));
        assert!(world.is_destroyed(target));
    }

    #[test]
    fn test_miss_still_leaves_a_tracer() {
        let mut world = duel(100.0, 150.0);
        let shot = resolve_shot(&world, PlayerId(0), Vec2::new(100.0, 500.0)).unwrap();
        assert!(apply_shot(&mut world, &shot).is_empty());
        assert_eq!(world.hits.len(), 1);
        assert!(world.hits[0].target.is_none());
        assert_eq!(world.players[&PlayerId(1)].health, MAX_HEALTH);
    }

    #[test]
    fn test_cooldown_and_ammo() {
        let mut world = duel(100.0, 150.0);
        let mut armory = Armory::new(60);
        let player = PlayerId(0);
        let cooldown = WeaponKind::Pistol.stats().cooldown_ticks(60);

        let state = world.players.get_mut(&player).unwrap();
        assert!(armory.can_fire(player, state, 10));
        armory.record_shot(player, state, 10);
        assert_eq!(state.active().ammo, WeaponKind::Pistol.stats().magazine - 1);
        assert!(!armory.can_fire(player, state, 10 + cooldown - 1));
        assert!(armory.can_fire(player, state, 10 + cooldown));

        state.active_mut().ammo = 0;
        assert!(!armory.can_fire(player, state, 100));
    }

    #[test]
    fn test_reload_blocks_fire_until_done() {
        let mut world = duel(100.0, 150.0);
        let mut armory = Armory::new(60);
        let player = PlayerId(0);
        let reload = WeaponKind::Pistol.stats().reload_ticks(60);

        let state = world.players.get_mut(&player).unwrap();
        // Full magazine: nothing to reload
        assert!(!armory.start_reload(player, state, 0));
        state.active_mut().ammo = 2;
        assert!(armory.start_reload(player, state, 0));
        assert!(!armory.can_fire(player, state, 1));

        armory.finish_reloads(&mut world, reload - 1);
        assert!(armory.is_reloading(player));
        armory.finish_reloads(&mut world, reload);
        assert!(!armory.is_reloading(player));
        let state = &world.players[&player];
        assert_eq!(state.active().ammo, WeaponKind::Pistol.stats().magazine);
        assert!(armory.can_fire(player, state, reload));
    }

    #[test]
    fn test_projectile_contact_damages_target() {
        let mut world = duel(100.0, 150.0);
        arm(&mut world, PlayerId(0), WeaponKind::Launcher);
        let projectile = launch_projectile(&mut world, PlayerId(0), Vec2::new(300.0, 188.0)).unwrap();
        assert!(world.entities[&projectile].velocity.x > 0.0);

        let mut kills = Vec::new();
        for _ in 0..30 {
            world.tick += 1;
            for contact in world.integrate(1.0 / 60.0) {
                kills.extend(resolve_contact(&mut world, &contact));
            }
        }
        assert!(kills.is_empty());
        assert!(world.is_destroyed(projectile));
        assert_eq!(world.players[&PlayerId(1)].health, MAX_HEALTH - 60);
    }

    #[test]
    fn test_projectile_kill_credits_owner() {
        let mut world = duel(100.0, 150.0);
        arm(&mut world, PlayerId(0), WeaponKind::Launcher);
        world.players.get_mut(&PlayerId(1)).unwrap().health = 30;
        launch_projectile(&mut world, PlayerId(0), Vec2::new(300.0, 188.0)).unwrap();

        let mut kills = Vec::new();
        for _ in 0..30 {
            for contact in world.integrate(1.0 / 60.0) {
                kills.extend(resolve_contact(&mut world, &contact));
            }
        }
        assert_eq!(kills.len(), 1);
        assert_eq!(kills[0].killer, Some(PlayerId(0)));
    }

    #[test]
    fn test_hitscan_weapons_do_not_launch() {
        let mut world = duel(100.0, 150.0);
        assert!(launch_projectile(&mut world, PlayerId(0), Vec2::X).is_none());
        arm(&mut world, PlayerId(0), WeaponKind::Launcher);
        assert!(resolve_shot(&world, PlayerId(0), Vec2::X).is_none());
    }

    #[test]
    fn test_pickup_reach_and_kind() {
        let mut world = duel(100.0, 400.0);
        let near = world.spawn_entity(
            EntityKind::Item {
                item: ItemKind::Health,
                amount: 30,
            },
            Vec2::new(110.0, 200.0),
        );
        let far = world.spawn_entity(
            EntityKind::Item {
                item: ItemKind::Health,
                amount: 30,
            },
            Vec2::new(300.0, 200.0),
        );
        let request = |target, kind| PickupRequest {
            kind,
            amount: 30,
            target,
        };

        let player = PlayerId(0);
        assert_eq!(
            resolve_pickup(&world, player, &request(near, ItemKind::Health)),
            Some(near)
        );
        assert_eq!(resolve_pickup(&world, player, &request(far, ItemKind::Health)), None);
        assert_eq!(resolve_pickup(&world, player, &request(near, ItemKind::Coin)), None);

        world.players.get_mut(&player).unwrap().health = 50;
        assert_eq!(apply_pickup(&mut world, player, near), Some((ItemKind::Health, 30)));
        assert_eq!(world.players[&player].health, 80);
        // Gone for anyone else this tick
        assert_eq!(apply_pickup(&mut world, PlayerId(1), near), None);
        assert_eq!(resolve_pickup(&world, player, &request(near, ItemKind::Health)), None);
    }

    #[test]
    fn test_pickup_effects() {
        let mut world = duel(100.0, 400.0);
        let player = PlayerId(0);
        let place = |world: &mut World, item, amount| {
            world.spawn_entity(EntityKind::Item { item, amount }, Vec2::new(100.0, 200.0))
        };

        let shotgun = place(&mut world, ItemKind::Shotgun, 1);
        apply_pickup(&mut world, player, shotgun).unwrap();
        assert_eq!(world.players[&player].slots[1].kind, WeaponKind::Shotgun);

        world.players.get_mut(&player).unwrap().active_mut().ammo = 0;
        let ammo = place(&mut world, ItemKind::Ammo, 5);
        apply_pickup(&mut world, player, ammo).unwrap();
        assert_eq!(world.players[&player].active().ammo, 5);

        let coin = place(&mut world, ItemKind::Coin, 3);
        apply_pickup(&mut world, player, coin).unwrap();
        let snap = world.snapshot_for(Some(player), 0);
        assert_eq!(snap.inventory.len(), 1);
        assert_eq!(snap.inventory[0].kind, ItemKind::Coin);
        assert_eq!(snap.inventory[0].owner, player);

        // Both free slots taken: the third weapon is stowed
        let rifle = place(&mut world, ItemKind::Rifle, 1);
        apply_pickup(&mut world, player, rifle).unwrap();
        let launcher = place(&mut world, ItemKind::Launcher, 1);
        apply_pickup(&mut world, player, launcher).unwrap();
        let snap = world.snapshot_for(Some(player), 0);
        assert!(snap.inventory.iter().any(|i| i.kind == ItemKind::Launcher));
    }

    #[test]
    fn test_projectiles_out_of_bounds_expire() {
        let mut world = duel(100.0, 150.0);
        let id = world.spawn_entity(
            EntityKind::Projectile {
                owner: EntityId::NONE,
            },
            Vec2::new(-50.0, 10.0),
        );
        expire_projectiles(&mut world);
        assert!(world.is_destroyed(id));
    }
}
