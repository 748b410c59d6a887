//! Client session driver
//!
//! Owns the client side of one match: the join handshake, snapshot intake,
//! prediction of the local player and the interpolated render view.
//! Everything is polled from the caller's frame loop.

use crate::{
    Address, ClientConfig, ClientPredictor, Interpolator, Result, SnapshotSequence, Transport,
};
use skirmish_core::{
    ClientInputMessage, Clock, Level, NoBaseline, PlayerId, Rect, SnapshotData, SnapshotLookup,
    Tick, TileCoord,
};
use skirmish_wire::{ClientState, Message};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the session is in the join handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// `Ready` sent, waiting for `LoadLevel`
    Joining,
    /// Level loaded, waiting for `StartGame`
    Loading,
    Playing,
}

/// Things the render, audio and UI layers may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LevelLoaded { level: String, seed: u64 },
    Started { player: PlayerId, tick: Tick },
    Chat { from: Option<PlayerId>, text: String },
    PlayerDeath {
        victim: PlayerId,
        killer: Option<PlayerId>,
        headshot: bool,
    },
    TileDeath(TileCoord),
}

/// The client end of a match
pub struct ClientSession<T: Transport> {
    transport: T,
    server: Address,
    config: ClientConfig,
    state: SessionState,
    player: Option<PlayerId>,
    level: Option<Level>,
    clock: Clock,
    snapshots: SnapshotSequence,
    predictor: ClientPredictor,
    interpolator: Interpolator,
    events: Vec<SessionEvent>,
}

impl<T: Transport> ClientSession<T> {
    pub fn new(transport: T, server: Address, config: ClientConfig) -> Self {
        let clock = Clock::new(60);
        Self {
            predictor: ClientPredictor::new(
                clock.tick_rate(),
                config.movement,
                config.input_capacity,
            ),
            interpolator: Interpolator::new(config.interpolation_delay_ticks),
            snapshots: SnapshotSequence::new(config.snapshot_capacity),
            transport,
            server,
            config,
            state: SessionState::Disconnected,
            player: None,
            level: None,
            clock,
            events: Vec::new(),
        }
    }

    fn send(&self, message: &Message) -> Result<()> {
        let bytes = message.encode(&NoBaseline)?;
        self.transport.send(&bytes, &self.server)
    }

    fn statics(&self) -> &[Rect] {
        self.level.as_ref().map_or(&[], |level| level.walls.as_slice())
    }

    /// Ask the server to join
    pub fn connect(&mut self) -> Result<()> {
        self.send(&Message::Ready {
            name: self.config.name.clone(),
        })?;
        self.state = SessionState::Joining;
        info!(server = %self.server, name = %self.config.name, "joining");
        Ok(())
    }

    /// Tell the server we are leaving and stop playing
    pub fn leave(&mut self) -> Result<()> {
        self.send(&Message::StateUpdate {
            state: ClientState::Leaving,
        })?;
        self.state = SessionState::Disconnected;
        self.predictor.reset();
        info!(server = %self.server, "left");
        Ok(())
    }

    /// Drain the transport and handle every message
    ///
    /// Undecodable datagrams and datagrams from anyone but the server are
    /// logged and skipped. Returns the number of messages handled.
    pub fn poll(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some((bytes, from)) = self.transport.recv()? {
            if from != self.server {
                debug!(%from, "ignoring datagram from unknown peer");
                continue;
            }
            match Message::decode(&bytes, &self.snapshots) {
                Ok(message) => {
                    self.handle(message)?;
                    handled += 1;
                }
                Err(error) => warn!(%error, "dropping undecodable message"),
            }
        }
        Ok(handled)
    }

    fn handle(&mut self, message: Message) -> Result<()> {
        match message {
            Message::LoadLevel {
                level,
                seed,
                tick_rate,
            } => {
                let Some(loaded) = Level::builtin(&level) else {
                    warn!(%level, "unknown level");
                    return Ok(());
                };
                self.level = Some(loaded);
                self.clock = Clock::new(tick_rate);
                self.predictor.set_tick_rate(tick_rate);
                self.snapshots.clear();
                self.predictor.reset();
                self.state = SessionState::Loading;
                self.send(&Message::StateUpdate {
                    state: ClientState::LevelLoaded,
                })?;
                info!(%level, seed, tick_rate, "level loaded");
                self.events.push(SessionEvent::LevelLoaded { level, seed });
            }
            Message::StartGame { player, tick } => {
                self.player = Some(player);
                self.predictor.set_local_player(player);
                self.clock.tick = tick;
                self.state = SessionState::Playing;
                info!(%player, tick, "match started");
                self.events.push(SessionEvent::Started { player, tick });
            }
            Message::FullSnapshot(snapshot) => self.receive_snapshot(*snapshot),
            Message::DeltaSnapshot { snapshot, .. } => self.receive_snapshot(*snapshot),
            Message::Chat { from, text } => self.events.push(SessionEvent::Chat { from, text }),
            Message::PlayerDeath {
                victim,
                killer,
                headshot,
            } => self.events.push(SessionEvent::PlayerDeath {
                victim,
                killer,
                headshot,
            }),
            Message::TileDeath { tile } => {
                if let Some(level) = self.level.as_mut() {
                    level.kill_tile(tile);
                }
                self.events.push(SessionEvent::TileDeath(tile));
            }
            Message::Ready { .. } | Message::StateUpdate { .. } | Message::Input(_) => {
                debug!("ignoring client-bound message from server");
            }
        }
        Ok(())
    }

    fn receive_snapshot(&mut self, snapshot: SnapshotData) {
        if self.snapshots.store_snapshot(snapshot).is_err() {
            return;
        }
        let statics = self.level.as_ref().map_or(&[][..], |l| l.walls.as_slice());
        if let Some(latest) = self.snapshots.latest() {
            self.predictor.reconcile(latest, statics);
        }
    }

    /// Feed elapsed frame time, returning the number of ticks now due
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.clock.accumulate(elapsed)
    }

    /// Run one local tick: predict with `input` and send it
    ///
    /// Returns the command as sent, or `None` before the match started.
    pub fn tick(&mut self, input: ClientInputMessage) -> Result<Option<ClientInputMessage>> {
        if self.state != SessionState::Playing {
            return Ok(None);
        }
        let last_received = self.snapshots.last_received_tick().unwrap_or(0);
        let statics = self.level.as_ref().map_or(&[][..], |l| l.walls.as_slice());
        let command =
            self.predictor
                .predict_tick(input, last_received, self.snapshots.latest(), statics);
        self.send(&Message::Input(command))?;
        self.clock.advance();
        Ok(Some(command))
    }

    /// The world to draw: remote entities interpolated, the local player predicted
    ///
    /// History older than the interpolation window and the delta baseline
    /// window is trimmed.
    pub fn render_state(&mut self, alpha: f32) -> Option<SnapshotData> {
        let newest = self.snapshots.latest()?.tick;
        let render_time = self.interpolator.render_time(newest, alpha);
        let mut view = self.interpolator.sample(&self.snapshots, render_time)?;
        self.predictor.apply(&mut view);

        if let Some(bracket) = self.interpolator.bracket(&self.snapshots, render_time) {
            let floor = newest.saturating_sub(self.config.baseline_window_ticks);
            let keep_from = self
                .snapshots
                .iter()
                .position(|s| s.tick >= floor)
                .unwrap_or(0);
            self.snapshots.erase_up_to_index(bracket.from.min(keep_from));
        }
        Some(view)
    }

    /// The confirmed snapshot for `tick`, if still held
    pub fn delta_data(&self, tick: Tick) -> Option<&SnapshotData> {
        self.snapshots.snapshot_at(tick)
    }

    pub fn latest_snapshot(&self) -> Option<&SnapshotData> {
        self.snapshots.latest()
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn player(&self) -> Option<PlayerId> {
        self.player
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn predictor(&self) -> &ClientPredictor {
        &self.predictor
    }

    pub fn snapshots(&self) -> &SnapshotSequence {
        &self.snapshots
    }

    pub fn local_addr(&self) -> Option<Address> {
        self.transport.local_addr()
    }

    /// Collision geometry of the loaded level
    pub fn walls(&self) -> &[Rect] {
        self.statics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryHub, MemoryTransport};
    use glam::Vec2;
    use skirmish_core::{EntityId, EntityKind, EntitySnapshot, PlayerState};

    struct FakeServer {
        transport: MemoryTransport,
        sent: Vec<SnapshotData>,
    }

    impl FakeServer {
        fn send(&self, message: Message, to: Address) {
            let bytes = message.encode(&self.sent).unwrap();
            self.transport.send(&bytes, &to).unwrap();
        }

        fn recv(&self) -> Option<Message> {
            let (bytes, _) = self.transport.recv().unwrap()?;
            Some(Message::decode(&bytes, &NoBaseline).unwrap())
        }
    }

    fn setup() -> (FakeServer, ClientSession<MemoryTransport>, Address) {
        let hub = MemoryHub::new();
        let server = FakeServer {
            transport: hub.bind().unwrap(),
            sent: Vec::new(),
        };
        let client_transport = hub.bind().unwrap();
        let client_addr = client_transport.address();
        let session = ClientSession::new(
            client_transport,
            server.transport.address(),
            ClientConfig::default(),
        );
        (server, session, client_addr)
    }

    fn world(tick: Tick, x: f32) -> SnapshotData {
        let mut snap = SnapshotData::new(tick);
        let entity = EntitySnapshot::new(EntityId(1), EntityKind::Player, Vec2::new(x, 100.0));
        snap.entities.insert(entity.id, entity);
        snap.players
            .insert(PlayerId(0), PlayerState::spawn(entity.id, Vec2::ZERO));
        snap
    }

    fn start(server: &FakeServer, session: &mut ClientSession<MemoryTransport>, client: Address) {
        session.connect().unwrap();
        assert_eq!(
            server.recv(),
            Some(Message::Ready {
                name: "player".into()
            })
        );
        server.send(
            Message::LoadLevel {
                level: "arena".into(),
                seed: 9,
                tick_rate: 30,
            },
            client,
        );
        session.poll().unwrap();
        assert_eq!(session.state(), SessionState::Loading);
        assert_eq!(
            server.recv(),
            Some(Message::StateUpdate {
                state: ClientState::LevelLoaded
            })
        );
        server.send(
            Message::StartGame {
                player: PlayerId(0),
                tick: 5,
            },
            client,
        );
        session.poll().unwrap();
    }

    #[test]
    fn test_handshake() {
        let (server, mut session, client) = setup();
        assert!(session.tick(ClientInputMessage::default()).unwrap().is_none());
        start(&server, &mut session, client);
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.player(), Some(PlayerId(0)));
        assert_eq!(session.clock().tick_rate(), 30);
        assert_eq!(session.clock().tick, 5);
        assert!(!session.walls().is_empty());

        let events = session.take_events();
        assert_eq!(events.len(), 2);
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn test_snapshots_and_deltas() {
        let (mut server, mut session, client) = setup();
        start(&server, &mut session, client);

        let first = world(10, 100.0);
        server.send(Message::FullSnapshot(Box::new(first.clone())), client);
        server.sent.push(first.clone());
        session.poll().unwrap();
        assert_eq!(session.latest_snapshot(), Some(&first));

        let second = world(11, 104.0);
        server.send(
            Message::DeltaSnapshot {
                baseline: Some(10),
                snapshot: Box::new(second.clone()),
            },
            client,
        );
        session.poll().unwrap();
        assert_eq!(session.latest_snapshot(), Some(&second));
        assert_eq!(session.delta_data(10), Some(&first));

        // A replayed old snapshot is ignored
        server.send(Message::FullSnapshot(Box::new(world(10, 0.0))), client);
        session.poll().unwrap();
        assert_eq!(session.delta_data(10), Some(&first));
        assert_eq!(session.snapshots().len(), 2);
    }

    #[test]
    fn test_tick_sends_acknowledging_input() {
        let (server, mut session, client) = setup();
        start(&server, &mut session, client);
        server.send(Message::FullSnapshot(Box::new(world(10, 100.0))), client);
        session.poll().unwrap();

        let sent = session
            .tick(ClientInputMessage {
                direction: Vec2::X,
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(sent.sequence, 1);
        assert_eq!(sent.last_received_tick, 10);
        assert_eq!(server.recv(), Some(Message::Input(sent)));

        let predicted = session.predictor().predicted().unwrap().entity;
        assert!(predicted.position.x > 100.0);

        let view = session.render_state(0.0).unwrap();
        assert_eq!(view.entities[&EntityId(1)], predicted);
    }

    #[test]
    fn test_events_and_tile_death() {
        let (server, mut session, client) = setup();
        start(&server, &mut session, client);
        session.take_events();

        server.send(
            Message::Chat {
                from: None,
                text: "hi".into(),
            },
            client,
        );
        server.send(
            Message::TileDeath {
                tile: TileCoord::new(0, 0),
            },
            client,
        );
        session.poll().unwrap();
        assert!(!session.level().unwrap().is_tile_alive(TileCoord::new(0, 0)));
        assert_eq!(
            session.take_events(),
            vec![
                SessionEvent::Chat {
                    from: None,
                    text: "hi".into()
                },
                SessionEvent::TileDeath(TileCoord::new(0, 0)),
            ]
        );
    }

    #[test]
    fn test_garbage_is_skipped() {
        let (server, mut session, client) = setup();
        server.transport.send(&[250, 1, 2], &client).unwrap();
        assert_eq!(session.poll().unwrap(), 0);
    }
}
