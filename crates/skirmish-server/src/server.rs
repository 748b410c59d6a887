//! Authoritative game server
//!
//! One `GameServer` owns one match. The caller drives it from a single loop:
//! `poll` drains the transport, `tick` advances the simulation one fixed
//! step and sends every client its snapshot.
//!
//! Each tick runs these phases in order:
//! 1. bots think and queue commands like any client
//! 2. every player's queued commands are folded into one
//! 3. shots and pickups resolve, lag-compensated, in ascending player order
//! 4. movement and animation input applies to everyone
//! 5. the integrator moves the world; projectile contacts deal damage
//! 6. the game mode scores, respawns and runs the floor hazard
//! 7. destroyed entities are evicted and the frame enters the history
//! 8. snapshots go out, full or delta, and the transport is flushed

use crate::bot::Bot;
use crate::combat::{self, Armory, Kill};
use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionState};
use crate::events::{EventBus, MatchEvent, SubscriptionId};
use crate::game_mode::Deathmatch;
use crate::lag_compensation::{rollback_ticks, LagCompensator};
use crate::world::World;
use crate::{Error, Result};
use indexmap::IndexMap;
use skirmish_core::player_logic::apply_input;
use skirmish_core::{
    ClientInputMessage, Clock, Level, NoBaseline, PlayerId, Tick, TileCoord,
};
use skirmish_netcode::{Address, InputQueue, Transport};
use skirmish_wire::{ClientState, Message, MAX_STRING_LEN};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// The authoritative end of a match
pub struct GameServer<T: Transport> {
    transport: T,
    config: ServerConfig,
    seed: u64,
    clock: Clock,
    world: World,
    connections: IndexMap<Address, Connection>,
    bots: IndexMap<PlayerId, Bot>,
    /// Received commands per player, humans and bots alike
    inputs: IndexMap<PlayerId, InputQueue>,
    /// Last combined command per player, repeated when nothing new arrives
    held: IndexMap<PlayerId, ClientInputMessage>,
    lag: LagCompensator,
    armory: Armory,
    mode: Deathmatch,
    events: EventBus<MatchEvent>,
}

impl<T: Transport> GameServer<T> {
    /// Start a match on the configured built-in level
    pub fn new(transport: T, config: ServerConfig, seed: u64) -> Result<Self> {
        let config = config.clamped();
        let level = Level::builtin(&config.level)
            .ok_or_else(|| Error::UnknownLevel(config.level.clone()))?;
        let clock = Clock::new(config.tick_rate);
        let lag = LagCompensator::new(config.rollback_depth());
        info!(
            level = %config.level,
            tick_rate = config.tick_rate,
            rollback_depth = lag.depth(),
            max_players = config.max_players,
            seed,
            "server started"
        );
        Ok(Self {
            armory: Armory::new(config.tick_rate),
            mode: Deathmatch::new(&config, seed, clock.tick),
            world: World::new(level),
            transport,
            seed,
            clock,
            connections: IndexMap::new(),
            bots: IndexMap::new(),
            inputs: IndexMap::new(),
            held: IndexMap::new(),
            lag,
            events: EventBus::new(),
            config,
        })
    }

    /// Drain the transport and handle every message
    ///
    /// Undecodable datagrams and messages from unknown or departed peers
    /// are logged and skipped. Returns the number of datagrams read.
    pub fn poll(&mut self) -> Result<usize> {
        let mut received = 0;
        while let Some((bytes, from)) = self.transport.recv()? {
            received += 1;
            let message = match Message::decode(&bytes, &NoBaseline) {
                Ok(message) => message,
                Err(error) => {
                    warn!(%from, %error, "dropping undecodable message");
                    continue;
                }
            };
            match self.handle(from, message) {
                Ok(()) => {}
                Err(Error::UnknownPeer(peer)) => {
                    debug!(%peer, "ignoring message from unknown peer")
                }
                Err(Error::ServerFull(max)) => warn!(%from, max, "rejecting join, server full"),
                Err(error) => return Err(error),
            }
        }
        Ok(received)
    }

    fn handle(&mut self, from: Address, message: Message) -> Result<()> {
        match message {
            Message::Ready { name } => self.join(from, name),
            Message::StateUpdate {
                state: ClientState::LevelLoaded,
            } => self.start(from),
            Message::StateUpdate {
                state: ClientState::Leaving,
            } => self.disconnect(from),
            Message::Input(input) => self.receive_input(from, input),
            Message::Chat { text, .. } => {
                let player = self.connection(from)?.player;
                self.broadcast_chat(Some(player), &text)
            }
            other => {
                debug!(%from, tag = ?other.tag(), "ignoring server-bound message from client");
                Ok(())
            }
        }
    }

    fn connection(&self, address: Address) -> Result<&Connection> {
        self.connections
            .get(&address)
            .filter(|c| c.state != ConnectionState::Disconnected)
            .ok_or(Error::UnknownPeer(address))
    }

    fn connection_mut(&mut self, address: Address) -> Result<&mut Connection> {
        self.connections
            .get_mut(&address)
            .filter(|c| c.state != ConnectionState::Disconnected)
            .ok_or(Error::UnknownPeer(address))
    }

    /// Lowest free player id
    fn allocate_player(&self) -> Result<PlayerId> {
        let taken: Vec<PlayerId> = self
            .connections
            .values()
            .filter(|c| c.state != ConnectionState::Disconnected)
            .map(|c| c.player)
            .chain(self.bots.keys().copied())
            .collect();
        (0..self.config.max_players as u8)
            .map(PlayerId)
            .find(|id| !taken.contains(id))
            .ok_or(Error::ServerFull(self.config.max_players))
    }

    fn send(&self, message: &Message, to: Address) -> Result<()> {
        let bytes = message.encode(&NoBaseline)?;
        self.transport.send(&bytes, &to)?;
        Ok(())
    }

    /// `Ready`: assign a player and send the level
    fn join(&mut self, from: Address, name: String) -> Result<()> {
        if self.connection(from).is_ok() {
            debug!(%from, "duplicate ready");
            return Ok(());
        }
        let player = self.allocate_player()?;
        let name = wire_text(&name).to_string();
        let connection = Connection::new(from, player, name.clone(), self.config.snapshot_history);
        self.connections.insert(from, connection);
        self.inputs
            .insert(player, InputQueue::new(self.config.input_capacity));
        self.send(
            &Message::LoadLevel {
                level: self.config.level.clone(),
                seed: self.seed,
                tick_rate: self.config.tick_rate,
            },
            from,
        )?;
        info!(%from, %player, %name, "player joining");
        self.events.publish(MatchEvent::PlayerJoined { player, name });
        Ok(())
    }

    /// `LevelLoaded`: catch the client up on the floor, spawn it and start
    fn start(&mut self, from: Address) -> Result<()> {
        let connection = self.connection(from)?;
        if connection.state != ConnectionState::Loading {
            debug!(%from, "level loaded twice");
            return Ok(());
        }
        let player = connection.player;

        let level = &self.world.level;
        let dead: Vec<TileCoord> = (0..level.height)
            .flat_map(|y| (0..level.width).map(move |x| TileCoord::new(x, y)))
            .filter(|tile| !level.is_tile_alive(*tile))
            .collect();
        for tile in dead {
            self.send(&Message::TileDeath { tile }, from)?;
        }

        let spawned = self.mode.join(&mut self.world, player);
        self.events.publish(spawned);
        self.send(
            &Message::StartGame {
                player,
                tick: self.clock.tick,
            },
            from,
        )?;
        self.connection_mut(from)?.state = ConnectionState::Playing;
        info!(%from, %player, tick = self.clock.tick, "player started");
        Ok(())
    }

    fn receive_input(&mut self, from: Address, input: ClientInputMessage) -> Result<()> {
        let tick_duration = self.config.tick_duration();
        let now = self.clock.tick;
        let connection = self.connection_mut(from)?;
        if !connection.is_playing() {
            debug!(%from, "input before start");
            return Ok(());
        }
        let player = connection.player;

        let Some(queue) = self.inputs.get_mut(&player) else {
            return Ok(());
        };
        match queue.push(input) {
            Ok(()) => {}
            Err(skirmish_netcode::Error::StaleInput { .. }) => return Ok(()),
            Err(error) => {
                warn!(%player, %error, "dropping input");
                return Ok(());
            }
        }

        // Only accepted commands move the acknowledgement and latency estimate
        let connection = self.connection_mut(from)?;
        if connection.sent().contains_key(&input.last_received_tick) {
            let ticks = now.saturating_sub(input.last_received_tick);
            connection.record_rtt(tick_duration * ticks);
        }
        connection.acknowledge(input.last_received_tick);
        Ok(())
    }

    /// Flag a connection as gone and remove its player from the match
    pub fn disconnect(&mut self, address: Address) -> Result<()> {
        let connection = self.connection_mut(address)?;
        connection.state = ConnectionState::Disconnected;
        let player = connection.player;
        self.remove_player(player);
        info!(%address, %player, "player left");
        Ok(())
    }

    fn remove_player(&mut self, player: PlayerId) {
        self.world.remove_player(player);
        self.inputs.shift_remove(&player);
        self.held.shift_remove(&player);
        self.armory.forget(player);
        self.mode.leave(player);
        self.events.publish(MatchEvent::PlayerLeft { player });
    }

    /// Add a computer-controlled player
    pub fn add_bot(&mut self, name: &str) -> Result<PlayerId> {
        let player = self.allocate_player()?;
        self.bots
            .insert(player, Bot::new(player, self.seed));
        self.inputs
            .insert(player, InputQueue::new(self.config.input_capacity));
        self.events.publish(MatchEvent::PlayerJoined {
            player,
            name: name.to_string(),
        });
        let spawned = self.mode.join(&mut self.world, player);
        self.events.publish(spawned);
        info!(%player, name, "bot added");
        Ok(player)
    }

    /// Remove a bot; false if `player` is not one
    pub fn remove_bot(&mut self, player: PlayerId) -> bool {
        if self.bots.shift_remove(&player).is_none() {
            return false;
        }
        self.remove_player(player);
        true
    }

    /// Send a chat line to every connected client, cut to the wire limit
    pub fn broadcast_chat(&mut self, from: Option<PlayerId>, text: &str) -> Result<()> {
        self.broadcast(&Message::Chat {
            from,
            text: wire_text(text).to_string(),
        })
    }

    /// Send to every client that has not left
    fn broadcast(&self, message: &Message) -> Result<()> {
        let bytes = message.encode(&NoBaseline)?;
        for connection in self.connections.values() {
            if connection.state != ConnectionState::Disconnected {
                self.transport.send(&bytes, &connection.address)?;
            }
        }
        Ok(())
    }

    /// Feed elapsed frame time, returning the number of ticks now due
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.clock.accumulate(elapsed)
    }

    /// Poll, then run every tick that `elapsed` made due
    pub fn update(&mut self, elapsed: Duration) -> Result<u32> {
        self.poll()?;
        let due = self.accumulate(elapsed);
        for _ in 0..due {
            self.tick()?;
        }
        Ok(due)
    }

    /// Advance the match by one fixed step
    pub fn tick(&mut self) -> Result<()> {
        self.clock.advance();
        let tick = self.clock.tick;
        self.world.tick = tick;
        self.world.hits.clear();

        self.think_bots();
        let commands = self.combine_inputs();
        self.armory.finish_reloads(&mut self.world, tick);

        let mut kills = Vec::new();
        for (player, command) in &commands {
            kills.extend(self.resolve_actions(*player, command));
        }
        self.apply_commands(&commands);

        for contact in self.world.integrate(self.clock.dt()) {
            kills.extend(combat::resolve_contact(&mut self.world, &contact));
        }
        combat::expire_projectiles(&mut self.world);

        for kill in kills {
            self.armory.forget(kill.victim);
            let event = self.mode.record_kill(kill, tick);
            self.events.publish(event);
        }
        for event in self.mode.update(&mut self.world) {
            if let MatchEvent::PlayerKilled { victim, .. } = event {
                self.armory.forget(victim);
            }
            self.events.publish(event);
        }
        self.forward_events();

        self.world.evict_destroyed();
        self.lag.record(tick, &self.world.entities);
        self.send_snapshots()?;
        self.transport.flush()?;
        trace!(tick, entities = self.world.entities.len(), "tick done");
        Ok(())
    }

    fn think_bots(&mut self) {
        for (player, bot) in self.bots.iter_mut() {
            let view = self.world.snapshot_for(Some(*player), 0);
            let Some(command) = bot.think(&view, &self.world.level.walls) else {
                continue;
            };
            if let Some(queue) = self.inputs.get_mut(player) {
                if let Err(error) = queue.push(command.quantized()) {
                    debug!(%player, %error, "bot command dropped");
                }
            }
        }
    }

    /// One command per player in ascending id order
    ///
    /// A player with nothing new keeps moving and aiming as last commanded
    /// but repeats no actions.
    fn combine_inputs(&mut self) -> Vec<(PlayerId, ClientInputMessage)> {
        let mut players: Vec<PlayerId> = self.inputs.keys().copied().collect();
        players.sort();
        let mut commands = Vec::with_capacity(players.len());
        for player in players {
            let Some(queue) = self.inputs.get_mut(&player) else {
                continue;
            };
            let command = match queue.combine() {
                Some(command) => {
                    self.held.insert(player, command);
                    command
                }
                None => match self.held.get(&player) {
                    Some(held) => ClientInputMessage {
                        shoot: false,
                        interact: false,
                        reload: false,
                        change_weapon: false,
                        pickup: None,
                        ..*held
                    },
                    None => continue,
                },
            };
            if self.world.players.contains_key(&player) {
                commands.push((player, command));
            }
        }
        commands
    }

    /// Frames the player's view trails the live world
    fn view_delay(&self, player: PlayerId) -> usize {
        self.connections
            .values()
            .find(|c| c.player == player && c.is_playing())
            .map_or(0, |c| {
                rollback_ticks(
                    c.rtt(),
                    self.config.tick_duration(),
                    self.config.client_buffer_ticks,
                )
            })
    }

    /// Shots and pickups, each resolved against the world the player saw
    fn resolve_actions(&mut self, player: PlayerId, command: &ClientInputMessage) -> Vec<Kill> {
        let mut kills = Vec::new();
        let tick = self.world.tick;
        let Some(state) = self.world.players.get(&player).copied() else {
            return kills;
        };

        if command.shoot {
            if self.armory.can_fire(player, &state, tick) {
                let weapon = state.active().kind;
                if weapon.is_hitscan() {
                    let delay = self.view_delay(player);
                    let shot = self.lag.compensate(&mut self.world, state.entity, delay, |world| {
                        combat::resolve_shot(world, player, command.aim)
                    });
                    if let Some(shot) = shot {
                        kills.extend(combat::apply_shot(&mut self.world, &shot));
                    }
                } else {
                    combat::launch_projectile(&mut self.world, player, command.aim);
                }
                if let Some(state) = self.world.players.get_mut(&player) {
                    self.armory.record_shot(player, state, tick);
                }
            } else if state.active().ammo == 0 {
                self.armory.start_reload(player, &state, tick);
            }
        }

        if let (true, Some(request)) = (command.interact, command.pickup) {
            let delay = self.view_delay(player);
            let target = self.lag.compensate(&mut self.world, state.entity, delay, |world| {
                combat::resolve_pickup(world, player, &request)
            });
            if let Some((item, amount)) =
                target.and_then(|item| combat::apply_pickup(&mut self.world, player, item))
            {
                self.events.publish(MatchEvent::ItemPickedUp {
                    player,
                    item,
                    amount,
                });
            }
        }
        kills
    }

    /// Movement, aim, weapon selection and reload requests
    fn apply_commands(&mut self, commands: &[(PlayerId, ClientInputMessage)]) {
        let tick = self.world.tick;
        let World {
            entities, players, ..
        } = &mut self.world;
        for (player, command) in commands {
            let Some(state) = players.get_mut(player) else {
                continue;
            };
            let Some(entity) = entities.get_mut(&state.entity) else {
                continue;
            };
            apply_input(entity, state, command, &self.config.movement);
            if command.reload {
                self.armory.start_reload(*player, state, tick);
            }
        }
    }

    /// Turn match events into client messages
    fn forward_events(&mut self) {
        for event in self.events.drain() {
            let message = match event {
                MatchEvent::PlayerKilled {
                    victim,
                    killer,
                    headshot,
                } => Message::PlayerDeath {
                    victim,
                    killer,
                    headshot,
                },
                MatchEvent::TileDied { tile } => Message::TileDeath { tile },
                MatchEvent::PlayerJoined { name, .. } => Message::Chat {
                    from: None,
                    text: wire_text(&format!("{name} joined")).to_string(),
                },
                MatchEvent::MatchOver { winner } => Message::Chat {
                    from: None,
                    text: match winner {
                        Some(winner) => format!("match over, {winner} wins"),
                        None => "match over".to_string(),
                    },
                },
                _ => continue,
            };
            if let Err(error) = self.broadcast(&message) {
                warn!(tag = ?message.tag(), %error, "event not forwarded");
            }
        }
    }

    /// Each playing connection gets its own snapshot, as a delta against its
    /// acknowledged baseline when one is held
    fn send_snapshots(&mut self) -> Result<()> {
        for connection in self.connections.values_mut() {
            if !connection.is_playing() {
                continue;
            }
            let last_input = self
                .inputs
                .get(&connection.player)
                .map_or(0, InputQueue::last_applied);
            let snapshot = self.world.snapshot_for(Some(connection.player), last_input);
            let baseline = connection
                .baseline()
                .map(|base| base.tick)
                .filter(|_| self.config.delta_snapshots);
            let message = match baseline {
                Some(baseline) => Message::DeltaSnapshot {
                    baseline: Some(baseline),
                    snapshot: Box::new(snapshot.clone()),
                },
                None => Message::FullSnapshot(Box::new(snapshot.clone())),
            };
            let bytes = message.encode(connection.sent())?;
            self.transport.send(&bytes, &connection.address)?;
            connection.record_sent(snapshot);
        }
        Ok(())
    }

    /// Register a callback for every match event
    pub fn subscribe(&mut self, callback: impl FnMut(&MatchEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn tick_count(&self) -> Tick {
        self.clock.tick
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn game_mode(&self) -> &Deathmatch {
        &self.mode
    }

    pub fn lag_compensator(&self) -> &LagCompensator {
        &self.lag
    }

    /// Connections, including departed ones
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn bots(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.bots.keys().copied()
    }

    pub fn local_addr(&self) -> Option<Address> {
        self.transport.local_addr()
    }
}

/// The longest prefix of `text` a wire string can carry, cut on a char boundary
fn wire_text(text: &str) -> &str {
    let mut end = text.len().min(MAX_STRING_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use skirmish_netcode::{MemoryHub, MemoryTransport};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn quiet_config() -> ServerConfig {
        let mut config = ServerConfig {
            level: "arena_small".into(),
            tick_rate: 20,
            item_spawn_interval_ticks: 0,
            ..Default::default()
        };
        config.hazard.enabled = false;
        config
    }

    fn server(config: ServerConfig) -> (MemoryHub, GameServer<MemoryTransport>) {
        let hub = MemoryHub::new();
        let server = GameServer::new(hub.bind().unwrap(), config, 3).unwrap();
        (hub, server)
    }

    struct Peer {
        transport: MemoryTransport,
        server: Address,
    }

    impl Peer {
        fn send(&self, message: Message) {
            let bytes = message.encode(&NoBaseline).unwrap();
            self.transport.send(&bytes, &self.server).unwrap();
        }

        fn recv_all(&self) -> Vec<Message> {
            let mut out = Vec::new();
            while let Some((bytes, _)) = self.transport.recv().unwrap() {
                // Deltas are never decoded here
                if let Ok(message) = Message::decode(&bytes, &NoBaseline) {
                    out.push(message);
                }
            }
            out
        }
    }

    fn peer(hub: &MemoryHub, server: &GameServer<MemoryTransport>) -> Peer {
        Peer {
            transport: hub.bind().unwrap(),
            server: server.local_addr().unwrap(),
        }
    }

    fn join(server: &mut GameServer<MemoryTransport>, peer: &Peer, name: &str) -> PlayerId {
        peer.send(Message::Ready { name: name.into() });
        server.poll().unwrap();
        peer.send(Message::StateUpdate {
            state: ClientState::LevelLoaded,
        });
        server.poll().unwrap();
        peer.recv_all()
            .into_iter()
            .find_map(|m| match m {
                Message::StartGame { player, .. } => Some(player),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let hub = MemoryHub::new();
        let config = ServerConfig {
            level: "moon".into(),
            ..Default::default()
        };
        assert!(matches!(
            GameServer::new(hub.bind().unwrap(), config, 1),
            Err(Error::UnknownLevel(_))
        ));
    }

    #[test]
    fn test_handshake_spawns_player() {
        let (hub, mut server) = server(quiet_config());
        let client = peer(&hub, &server);
        client.send(Message::Ready { name: "ada".into() });
        server.poll().unwrap();
        assert_eq!(
            client.recv_all(),
            vec![Message::LoadLevel {
                level: "arena_small".into(),
                seed: 3,
                tick_rate: 20
            }]
        );
        assert!(server.world().players.is_empty());

        client.send(Message::StateUpdate {
            state: ClientState::LevelLoaded,
        });
        server.poll().unwrap();
        assert_eq!(
            client.recv_all(),
            vec![Message::StartGame {
                player: PlayerId(0),
                tick: 0
            }]
        );
        assert!(server.world().players.contains_key(&PlayerId(0)));

        server.tick().unwrap();
        let messages = client.recv_all();
        assert!(messages
            .iter()
            .any(|m| matches!(m, Message::FullSnapshot(s) if s.tick == 1)));
    }

    #[test]
    fn test_players_get_distinct_ids() {
        let (hub, mut server) = server(quiet_config());
        let a = peer(&hub, &server);
        let b = peer(&hub, &server);
        assert_eq!(join(&mut server, &a, "a"), PlayerId(0));
        assert_eq!(join(&mut server, &b, "b"), PlayerId(1));
        assert_eq!(server.add_bot("bot").unwrap(), PlayerId(2));
    }

    #[test]
    fn test_server_full() {
        let mut config = quiet_config();
        config.max_players = 1;
        let (hub, mut server) = server(config);
        server.add_bot("bot").unwrap();
        let client = peer(&hub, &server);
        client.send(Message::Ready { name: "late".into() });
        server.poll().unwrap();
        assert!(client.recv_all().is_empty());
        assert!(matches!(server.add_bot("another"), Err(Error::ServerFull(1))));
    }

    #[test]
    fn test_unknown_peer_input_is_ignored() {
        let (hub, mut server) = server(quiet_config());
        let stranger = peer(&hub, &server);
        stranger.send(Message::Input(ClientInputMessage {
            sequence: 1,
            ..Default::default()
        }));
        assert_eq!(server.poll().unwrap(), 1);
        assert!(server.world().players.is_empty());
    }

    #[test]
    fn test_input_moves_player_and_is_acknowledged() {
        let (hub, mut server) = server(quiet_config());
        let client = peer(&hub, &server);
        let player = join(&mut server, &client, "ada");
        let start = server.world().player_entity(player).unwrap().position;

        client.send(Message::Input(ClientInputMessage {
            sequence: 1,
            direction: Vec2::X,
            aim: start + Vec2::X * 50.0,
            ..Default::default()
        }));
        server.poll().unwrap();
        server.tick().unwrap();

        let moved = server.world().player_entity(player).unwrap().position;
        assert!(moved.x > start.x);
        let snapshot = client
            .recv_all()
            .into_iter()
            .find_map(|m| match m {
                Message::FullSnapshot(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(snapshot.last_input_sequence, 1);

        // Replayed sequence changes nothing
        client.send(Message::Input(ClientInputMessage {
            sequence: 1,
            direction: -Vec2::X,
            ..Default::default()
        }));
        server.poll().unwrap();
        server.tick().unwrap();
        let held = server.world().player_entity(player).unwrap().position;
        assert!(held.x > moved.x);
    }

    #[test]
    fn test_acknowledged_snapshot_enables_deltas() {
        let (hub, mut server) = server(quiet_config());
        let client = peer(&hub, &server);
        join(&mut server, &client, "ada");
        server.tick().unwrap();
        assert!(client
            .recv_all()
            .iter()
            .any(|m| matches!(m, Message::FullSnapshot(_))));

        client.send(Message::Input(ClientInputMessage {
            sequence: 1,
            last_received_tick: 1,
            ..Default::default()
        }));
        server.poll().unwrap();
        server.tick().unwrap();
        let connection = server.connections().next().unwrap();
        assert_eq!(connection.acknowledged(), Some(1));
        // Deltas need a baseline to decode, so nothing decodes here
        assert!(client.recv_all().is_empty());
    }

    #[test]
    fn test_disconnect_removes_player() {
        let (hub, mut server) = server(quiet_config());
        let client = peer(&hub, &server);
        let player = join(&mut server, &client, "ada");
        let left = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&left);
        server.subscribe(move |event| {
            if let MatchEvent::PlayerLeft { player } = event {
                sink.borrow_mut().push(*player);
            }
        });

        client.send(Message::StateUpdate {
            state: ClientState::Leaving,
        });
        server.poll().unwrap();
        assert_eq!(*left.borrow(), vec![player]);
        assert!(!server.world().players.contains_key(&player));
        assert_eq!(
            server.connections().next().unwrap().state,
            ConnectionState::Disconnected
        );

        // Further input from the departed peer is ignored
        client.send(Message::Input(ClientInputMessage {
            sequence: 9,
            ..Default::default()
        }));
        server.poll().unwrap();
        server.tick().unwrap();
        assert!(client.recv_all().is_empty());
    }

    #[test]
    fn test_chat_is_broadcast_and_capped() {
        let (hub, mut server) = server(quiet_config());
        let a = peer(&hub, &server);
        let b = peer(&hub, &server);
        let player = join(&mut server, &a, "a");
        join(&mut server, &b, "b");
        server.tick().unwrap();
        a.recv_all();
        b.recv_all();

        a.send(Message::Chat {
            from: None,
            text: "hello".into(),
        });
        server.poll().unwrap();
        assert_eq!(
            b.recv_all(),
            vec![Message::Chat {
                from: Some(player),
                text: "hello".into()
            }]
        );

        server.broadcast_chat(None, &"é".repeat(200)).unwrap();
        let Some(Message::Chat { text, .. }) = a.recv_all().pop() else {
            panic!("expected chat");
        };
        assert!(text.len() <= MAX_STRING_LEN);
        assert_eq!(text.chars().count(), MAX_STRING_LEN / 2);
    }

    #[test]
    fn test_longest_name_still_ticks() {
        let (hub, mut server) = server(quiet_config());
        let watcher = peer(&hub, &server);
        join(&mut server, &watcher, "w");
        server.tick().unwrap();
        watcher.recv_all();

        let long = peer(&hub, &server);
        let name = "n".repeat(MAX_STRING_LEN);
        let player = join(&mut server, &long, &name);
        let recorded = server.lag_compensator().available();
        server.tick().unwrap();
        assert_eq!(server.lag_compensator().available(), recorded + 1);

        let messages = watcher.recv_all();
        let joined = messages
            .iter()
            .find_map(|m| match m {
                Message::Chat { from: None, text } => Some(text.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(joined.len(), MAX_STRING_LEN);
        assert!(joined.starts_with("nnn"));
        assert!(messages
            .iter()
            .any(|m| matches!(m, Message::FullSnapshot(_) | Message::DeltaSnapshot { .. })));
        assert!(server.world().players.contains_key(&player));
    }

    #[test]
    fn test_stale_input_leaves_connection_untouched() {
        let (hub, mut server) = server(quiet_config());
        let client = peer(&hub, &server);
        join(&mut server, &client, "ada");
        for _ in 0..12 {
            server.tick().unwrap();
        }

        client.send(Message::Input(ClientInputMessage {
            sequence: 7,
            last_received_tick: 10,
            ..Default::default()
        }));
        server.poll().unwrap();
        let connection = server.connections().next().unwrap();
        let (rtt, acknowledged) = (connection.rtt(), connection.acknowledged());
        assert_eq!(acknowledged, Some(10));

        client.send(Message::Input(ClientInputMessage {
            sequence: 5,
            last_received_tick: 2,
            ..Default::default()
        }));
        server.poll().unwrap();
        let connection = server.connections().next().unwrap();
        assert_eq!(connection.rtt(), rtt);
        assert_eq!(connection.acknowledged(), acknowledged);
    }

    #[test]
    fn test_bots_fight_and_the_match_ends() {
        let mut config = quiet_config();
        config.score_limit = 1;
        config.respawn_ticks = 20;
        let (_hub, mut server) = server(config);
        server.add_bot("red").unwrap();
        server.add_bot("blue").unwrap();

        let over = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&over);
        server.subscribe(move |event| {
            if let MatchEvent::MatchOver { winner } = event {
                *sink.borrow_mut() = Some(*winner);
            }
        });
        for _ in 0..20 * 120 {
            server.tick().unwrap();
            if server.game_mode().is_over() {
                break;
            }
        }
        assert!(server.game_mode().is_over());
        assert!(over.borrow().is_some());
        assert_eq!(server.lag_compensator().available(), server.lag_compensator().depth());
    }

    #[test]
    fn test_lag_compensated_shot_hits_past_position() {
        let (hub, mut server) = server(quiet_config());
        let client = peer(&hub, &server);
        let shooter = join(&mut server, &client, "ada");
        let target = server.add_bot("target").unwrap();
        server.bots.shift_remove(&target);

        // Line the two up, then move the target out of the line of fire
        let shooter_pos = Vec2::new(100.0, 200.0);
        let target_pos = Vec2::new(200.0, 200.0);
        let shooter_entity = server.world.players[&shooter].entity;
        let target_entity = server.world.players[&target].entity;
        server.world.entities.get_mut(&shooter_entity).unwrap().position = shooter_pos;
        server.world.entities.get_mut(&target_entity).unwrap().position = target_pos;
        for _ in 0..3 {
            server.tick().unwrap();
        }
        server.world.entities.get_mut(&target_entity).unwrap().position.y = 300.0;
        server.tick().unwrap();

        // The client has seen tick 1 and runs two ticks of buffering
        client.send(Message::Input(ClientInputMessage {
            sequence: 1,
            last_received_tick: 1,
            aim: target_pos + crate::combat::MUZZLE_OFFSET,
            shoot: true,
            ..Default::default()
        }));
        server.poll().unwrap();
        server.tick().unwrap();
        assert!(server.world().players[&target].health < skirmish_core::MAX_HEALTH);
        assert_eq!(server.world().hits.len(), 1);
        assert_eq!(server.world().hits[0].target, target_entity);
    }
}
