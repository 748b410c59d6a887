//! Deathmatch rules
//!
//! Scores kills, brings dead players back, kills the floor from the outside
//! in, drops items and decides when the match is over. Everything random
//! draws from the match's `GameRng`.

use crate::combat::{damage_player, Kill};
use crate::config::{HazardConfig, ServerConfig};
use crate::events::MatchEvent;
use crate::world::World;
use glam::Vec2;
use indexmap::IndexMap;
use skirmish_core::{EntityId, EntityKind, GameRng, ItemKind, PlayerId, TileCoord, Tick};
use tracing::{debug, info};

/// Attempts at finding a free floor tile for an item drop
const ITEM_PLACEMENT_ATTEMPTS: usize = 8;

/// Amount carried by a freshly dropped item
fn drop_amount(kind: ItemKind) -> u16 {
    match kind {
        ItemKind::Health => 25,
        ItemKind::Ammo => 10,
        _ => 1,
    }
}

/// Free-for-all: first to `score_limit` kills wins
#[derive(Debug)]
pub struct Deathmatch {
    scores: IndexMap<PlayerId, u32>,
    /// Dead players and the tick they come back
    respawns: IndexMap<PlayerId, Tick>,
    started_at: Tick,
    respawn_ticks: u32,
    score_limit: u32,
    hazard: HazardConfig,
    item_interval: u32,
    max_items: usize,
    rng: GameRng,
    over: bool,
    winner: Option<PlayerId>,
}

impl Deathmatch {
    pub fn new(config: &ServerConfig, seed: u64, started_at: Tick) -> Self {
        Self {
            scores: IndexMap::new(),
            respawns: IndexMap::new(),
            started_at,
            respawn_ticks: config.respawn_ticks,
            score_limit: config.score_limit.max(1),
            hazard: config.hazard,
            item_interval: config.item_spawn_interval_ticks,
            max_items: config.max_items,
            rng: GameRng::new(seed),
            over: false,
            winner: None,
        }
    }

    /// Enter a player and place its avatar
    pub fn join(&mut self, world: &mut World, player: PlayerId) -> MatchEvent {
        self.scores.entry(player).or_insert(0);
        self.respawns.shift_remove(&player);
        let entity = self.spawn(world, player);
        MatchEvent::PlayerSpawned { player, entity }
    }

    /// Forget a departed player
    pub fn leave(&mut self, player: PlayerId) {
        self.scores.shift_remove(&player);
        self.respawns.shift_remove(&player);
    }

    /// Score a death and schedule the respawn
    pub fn record_kill(&mut self, kill: Kill, tick: Tick) -> MatchEvent {
        if let Some(killer) = kill.killer.filter(|k| *k != kill.victim) {
            *self.scores.entry(killer).or_insert(0) += 1;
        }
        if self.scores.contains_key(&kill.victim) {
            self.respawns
                .insert(kill.victim, tick.saturating_add(self.respawn_ticks));
        }
        info!(tick, victim = %kill.victim, killer = ?kill.killer, headshot = kill.headshot, "player killed");
        MatchEvent::PlayerKilled {
            victim: kill.victim,
            killer: kill.killer,
            headshot: kill.headshot,
        }
    }

    /// Advance the rules by one tick
    ///
    /// Returns the events in the order they happened: hazard tile deaths,
    /// hazard kills, respawns, then the end of the match.
    pub fn update(&mut self, world: &mut World) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        if self.over {
            return events;
        }
        let tick = world.tick;

        if let Some(tile) = self.hazard_step(world) {
            events.push(MatchEvent::TileDied { tile });
            for kill in self.hazard_damage(world) {
                events.push(self.record_kill(kill, tick));
            }
        }

        let due: Vec<PlayerId> = self
            .respawns
            .iter()
            .filter(|(_, at)| **at <= tick)
            .map(|(player, _)| *player)
            .collect();
        for player in due {
            self.respawns.shift_remove(&player);
            let entity = self.spawn(world, player);
            events.push(MatchEvent::PlayerSpawned { player, entity });
        }

        self.drop_item(world);

        if let Some(winner) = self.leader().filter(|(_, score)| *score >= self.score_limit) {
            self.over = true;
            self.winner = Some(winner.0);
            info!(tick, winner = %winner.0, score = winner.1, "match over");
            events.push(MatchEvent::MatchOver {
                winner: self.winner,
            });
        }
        events
    }

    /// Kill the next floor tile if the hazard is due this tick
    fn hazard_step(&mut self, world: &mut World) -> Option<TileCoord> {
        if !self.hazard.enabled {
            return None;
        }
        let first = self.started_at + self.hazard.start_after_ticks;
        let interval = self.hazard.interval_ticks.max(1);
        if world.tick < first || (world.tick - first) % interval != 0 {
            return None;
        }
        let tile = world.level.next_hazard_tile()?;
        world.level.kill_tile(tile);
        debug!(tick = world.tick, x = tile.x, y = tile.y, "tile died");
        Some(tile)
    }

    /// Hurt everyone standing on dead floor
    fn hazard_damage(&self, world: &mut World) -> Vec<Kill> {
        let exposed: Vec<PlayerId> = world
            .players
            .iter()
            .filter(|(_, state)| {
                world
                    .entities
                    .get(&state.entity)
                    .is_some_and(|e| world.level.is_hazard(e.position))
            })
            .map(|(player, _)| *player)
            .collect();
        exposed
            .into_iter()
            .filter_map(|player| damage_player(world, player, self.hazard.damage, None, false))
            .collect()
    }

    /// Place a player at the spawn point farthest from living enemies
    ///
    /// Spawns on live floor are preferred; ties go to the random generator.
    fn spawn(&mut self, world: &mut World, player: PlayerId) -> EntityId {
        let enemies: Vec<Vec2> = world
            .players
            .iter()
            .filter(|(id, _)| **id != player)
            .filter_map(|(_, state)| world.entities.get(&state.entity))
            .map(|e| e.position)
            .collect();
        let safe: Vec<Vec2> = world
            .level
            .spawn_points
            .iter()
            .copied()
            .filter(|p| !world.level.is_hazard(*p))
            .collect();
        let candidates = if safe.is_empty() {
            world.level.spawn_points.clone()
        } else {
            safe
        };

        let clearance = |point: Vec2| {
            enemies
                .iter()
                .map(|e| e.distance(point))
                .fold(f32::INFINITY, f32::min)
        };
        let best = candidates
            .iter()
            .map(|p| clearance(*p))
            .fold(f32::NEG_INFINITY, f32::max);
        let tied: Vec<Vec2> = candidates
            .into_iter()
            .filter(|p| clearance(*p) == best)
            .collect();
        let position = self
            .rng
            .index(tied.len())
            .map(|i| tied[i])
            .unwrap_or_default();

        if let Some(previous) = world.players.get(&player).map(|state| state.entity) {
            world.mark_destroyed(previous);
        }
        let entity = world.spawn_player(player, position);
        debug!(tick = world.tick, %player, %entity, x = position.x, y = position.y, "spawned");
        entity
    }

    /// Drop a random item on live floor when the timer fires
    fn drop_item(&mut self, world: &mut World) {
        if self.item_interval == 0 || world.tick <= self.started_at {
            return;
        }
        if (world.tick - self.started_at) % self.item_interval != 0
            || world.item_count() >= self.max_items
        {
            return;
        }
        let tiles = world.level.width as usize * world.level.height as usize;
        for _ in 0..ITEM_PLACEMENT_ATTEMPTS {
            let Some(index) = self.rng.index(tiles) else {
                return;
            };
            let tile = TileCoord::new(
                (index % world.level.width as usize) as u16,
                (index / world.level.width as usize) as u16,
            );
            let size = world.level.tile_size;
            let centre = Vec2::new(
                (tile.x as f32 + 0.5) * size,
                (tile.y as f32 + 0.5) * size,
            );
            let blocked = world.level.walls.iter().any(|w| w.contains(centre));
            if blocked || !world.level.is_tile_alive(tile) {
                continue;
            }
            let kind = self
                .rng
                .index(ItemKind::ALL.len())
                .map_or(ItemKind::Coin, |i| ItemKind::ALL[i]);
            let amount = drop_amount(kind);
            let id = world.spawn_entity(EntityKind::Item { item: kind, amount }, centre);
            debug!(tick = world.tick, item = %id, ?kind, amount, "item dropped");
            return;
        }
    }

    /// Highest score, lowest player id on ties
    fn leader(&self) -> Option<(PlayerId, u32)> {
        self.scores
            .iter()
            .map(|(player, score)| (*player, *score))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    }

    pub fn score(&self, player: PlayerId) -> Option<u32> {
        self.scores.get(&player).copied()
    }

    pub fn scores(&self) -> impl Iterator<Item = (PlayerId, u32)> + '_ {
        self.scores.iter().map(|(player, score)| (*player, *score))
    }

    /// Tick a dead player comes back
    pub fn respawn_at(&self, player: PlayerId) -> Option<Tick> {
        self.respawns.get(&player).copied()
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }
}
