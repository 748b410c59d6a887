//! Client-side prediction and reconciliation
//!
//! The local player is simulated ahead of the server with the same rules the
//! server uses. Every command is kept until a snapshot confirms it; when a
//! newer snapshot arrives, the prediction restarts from the confirmed state
//! and replays the commands the server has not seen yet.

use crate::InputBuffer;
use skirmish_core::player_logic::step_player;
use skirmish_core::{
    ClientInputMessage, Clock, EntitySnapshot, MovementConfig, PlayerId, PlayerState, Rect,
    Sequence, SnapshotData, Tick,
};
use tracing::{debug, trace};

/// Default number of unacknowledged commands kept for replay
pub const DEFAULT_INPUT_CAPACITY: usize = 256;

/// The locally predicted avatar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub entity: EntitySnapshot,
    pub player: PlayerState,
}

/// Prediction engine for the local player
#[derive(Debug)]
pub struct ClientPredictor {
    local_player: Option<PlayerId>,
    /// Commands not yet confirmed by the server
    inputs: InputBuffer,
    /// Sequence of the last sampled command; also the local tick counter
    sequence: Sequence,
    movement: MovementConfig,
    dt: f32,
    last_reconciled: Option<Tick>,
    predicted: Option<Prediction>,
}

impl ClientPredictor {
    pub fn new(tick_rate: u32, movement: MovementConfig, input_capacity: usize) -> Self {
        Self {
            local_player: None,
            inputs: InputBuffer::new(input_capacity),
            sequence: 0,
            movement,
            dt: Clock::new(tick_rate).dt(),
            last_reconciled: None,
            predicted: None,
        }
    }

    /// Match the server's simulation rate
    pub fn set_tick_rate(&mut self, tick_rate: u32) {
        self.dt = Clock::new(tick_rate).dt();
    }

    /// Start predicting `player`, forgetting any previous prediction
    pub fn set_local_player(&mut self, player: PlayerId) {
        self.local_player = Some(player);
        self.predicted = None;
    }

    pub fn local_player(&self) -> Option<PlayerId> {
        self.local_player
    }

    /// Sample one tick of input and advance the local prediction
    ///
    /// Assigns the next sequence, snaps the command onto the wire grid and
    /// buffers it for replay. The local player is stepped against the other
    /// entities of `world` (normally the newest confirmed snapshot); nothing
    /// is predicted while the player is absent from it. Returns the command
    /// to send.
    pub fn predict_tick(
        &mut self,
        input: ClientInputMessage,
        last_received_tick: Tick,
        world: Option<&SnapshotData>,
        statics: &[Rect],
    ) -> ClientInputMessage {
        self.sequence += 1;
        let command = ClientInputMessage {
            sequence: self.sequence,
            last_received_tick,
            ..input
        }
        .quantized();

        if self.inputs.push(command).is_err() {
            debug!(sequence = command.sequence, "input buffer full, command will not be replayed");
        }

        let (Some(player), Some(world)) = (self.local_player, world) else {
            return command;
        };
        if self.predicted.is_none() {
            self.predicted = world
                .player_entity(player)
                .map(|(player, entity)| Prediction {
                    entity: *entity,
                    player: *player,
                });
        }
        if let Some(prediction) = self.predicted.as_mut() {
            let own = prediction.entity.id;
            step_player(
                self.dt,
                &mut prediction.entity,
                &mut prediction.player,
                &command,
                world.entities.values().filter(|e| e.id != own),
                statics,
                &self.movement,
            );
        }
        command
    }

    /// Reconcile against a newly reached snapshot
    ///
    /// Commands up to the snapshot's `last_input_sequence` are dropped; the
    /// rest are replayed on top of the confirmed state of the local player.
    /// Returns false for snapshots that are not newer than the last one
    /// reconciled, or when the local player is absent.
    pub fn reconcile(&mut self, snapshot: &SnapshotData, statics: &[Rect]) -> bool {
        if self.last_reconciled.is_some_and(|last| snapshot.tick <= last) {
            return false;
        }
        self.last_reconciled = Some(snapshot.tick);
        self.inputs.acknowledge(snapshot.last_input_sequence);

        let Some(local) = self.local_player else {
            return false;
        };
        let Some((player, entity)) = snapshot.player_entity(local) else {
            debug!(tick = snapshot.tick, player = %local, "local player absent, prediction skipped");
            self.predicted = None;
            return false;
        };

        let mut prediction = Prediction {
            entity: *entity,
            player: *player,
        };
        let mut replayed = 0;
        for command in self.inputs.inputs_after(snapshot.last_input_sequence) {
            step_player(
                self.dt,
                &mut prediction.entity,
                &mut prediction.player,
                command,
                snapshot.entities.values().filter(|e| e.id != entity.id),
                statics,
                &self.movement,
            );
            replayed += 1;
        }
        trace!(tick = snapshot.tick, replayed, "reconciled");
        self.predicted = Some(prediction);
        true
    }

    /// Overwrite the local avatar in a render view with the prediction
    ///
    /// Only the local entity and the input-driven fields of its player
    /// change; everything else keeps the server or interpolated values.
    pub fn apply(&self, view: &mut SnapshotData) {
        let (Some(local), Some(prediction)) = (self.local_player, self.predicted.as_ref()) else {
            return;
        };
        let Some(player) = view.players.get_mut(&local) else {
            return;
        };
        player.aim = prediction.player.aim;
        player.facing_left = prediction.player.facing_left;
        player.animation = prediction.player.animation;
        if let Some(entity) = view.entities.get_mut(&prediction.entity.id) {
            *entity = prediction.entity;
        }
    }

    pub fn predicted(&self) -> Option<&Prediction> {
        self.predicted.as_ref()
    }

    /// Sequence of the last sampled command
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    /// Number of commands awaiting confirmation
    pub fn pending_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn last_reconciled_tick(&self) -> Option<Tick> {
        self.last_reconciled
    }

    /// Forget the prediction and buffered commands; sequences keep counting
    pub fn reset(&mut self) {
        self.inputs.clear();
        self.last_reconciled = None;
        self.predicted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use skirmish_core::{EntityId, EntityKind};

    const TICK_RATE: u32 = 60;

    fn world(tick: Tick, position: Vec2) -> SnapshotData {
        let mut snap = SnapshotData::new(tick);
        let entity = EntitySnapshot::new(EntityId(1), EntityKind::Player, position);
        snap.entities.insert(entity.id, entity);
        snap.players
            .insert(PlayerId(0), PlayerState::spawn(entity.id, position));
        snap
    }

    fn walls() -> Vec<Rect> {
        vec![Rect::new(140.0, 0.0, 16.0, 300.0)]
    }

    fn command(i: u32) -> ClientInputMessage {
        ClientInputMessage {
            direction: if i % 3 == 0 {
                Vec2::new(1.0, 0.5)
            } else {
                Vec2::new(0.7, -0.2)
            },
            aim: Vec2::new(300.0, 90.0 + i as f32),
            run: i % 2 == 0,
            ..Default::default()
        }
    }

    fn predictor() -> ClientPredictor {
        let mut predictor =
            ClientPredictor::new(TICK_RATE, MovementConfig::default(), DEFAULT_INPUT_CAPACITY);
        predictor.set_local_player(PlayerId(0));
        predictor
    }

    /// Run the server's view of `commands` from `start`
    fn authoritative(start: &SnapshotData, commands: &[ClientInputMessage], tick: Tick) -> SnapshotData {
        let mut snap = start.clone();
        let dt = Clock::new(TICK_RATE).dt();
        let mut entity = snap.entities[&EntityId(1)];
        let mut player = snap.players[&PlayerId(0)];
        for c in commands {
            step_player(dt, &mut entity, &mut player, c, [], &walls(), &MovementConfig::default());
        }
        snap.tick = tick;
        snap.last_input_sequence = commands.last().map_or(0, |c| c.sequence);
        snap.entities.insert(entity.id, entity);
        snap.players.insert(PlayerId(0), player);
        snap
    }

    #[test]
    fn test_replay_converges_to_continuous_prediction() {
        let start = world(0, Vec2::new(100.0, 100.0));
        let mut predictor = predictor();
        let mut sent = Vec::new();
        for i in 1..=10 {
            sent.push(predictor.predict_tick(command(i), 0, Some(&start), &walls()));
        }
        let continuous = *predictor.predicted().unwrap();
        assert_eq!(predictor.pending_inputs(), 10);

        // The server has applied the first four commands
        let confirmed = authoritative(&start, &sent[..4], 4);
        assert!(predictor.reconcile(&confirmed, &walls()));
        assert_eq!(predictor.pending_inputs(), 6);
        assert_eq!(*predictor.predicted().unwrap(), continuous);
    }

    #[test]
    fn test_correction_replays_on_server_state() {
        let start = world(0, Vec2::new(100.0, 100.0));
        let mut predictor = predictor();
        let mut sent = Vec::new();
        for i in 1..=6 {
            sent.push(predictor.predict_tick(command(i), 0, Some(&start), &walls()));
        }

        // The server disagrees: the player was somewhere else after command 2
        let mut confirmed = authoritative(&start, &sent[..2], 2);
        confirmed
            .entities
            .get_mut(&EntityId(1))
            .unwrap()
            .position = Vec2::new(40.0, 40.0);
        assert!(predictor.reconcile(&confirmed, &walls()));

        let expected = authoritative(&confirmed, &sent[2..], 6);
        assert_eq!(
            predictor.predicted().unwrap().entity,
            expected.entities[&EntityId(1)]
        );
    }

    #[test]
    fn test_sequences_and_quantization() {
        let mut predictor = predictor();
        let a = predictor.predict_tick(command(1), 7, None, &[]);
        let b = predictor.predict_tick(command(2), 8, None, &[]);
        assert_eq!((a.sequence, b.sequence), (1, 2));
        assert_eq!(b.last_received_tick, 8);
        assert_eq!(a, a.quantized());
        assert!(predictor.predicted().is_none());
    }

    #[test]
    fn test_absent_player_skips_prediction() {
        let mut predictor = predictor();
        let empty = SnapshotData::new(3);
        predictor.predict_tick(command(1), 0, Some(&empty), &[]);
        assert!(predictor.predicted().is_none());
        assert!(!predictor.reconcile(&empty, &[]));
        assert!(predictor.predicted().is_none());
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let mut predictor = predictor();
        assert!(predictor.reconcile(&world(5, Vec2::ZERO), &[]));
        assert!(!predictor.reconcile(&world(5, Vec2::ONE), &[]));
        assert!(!predictor.reconcile(&world(4, Vec2::ONE), &[]));
        assert_eq!(predictor.predicted().unwrap().entity.position, Vec2::ZERO);
    }

    #[test]
    fn test_apply_overwrites_local_entity_only() {
        let mut predictor = predictor();
        let mut snap = world(1, Vec2::new(10.0, 10.0));
        let other = EntitySnapshot::new(EntityId(2), EntityKind::Player, Vec2::new(60.0, 60.0));
        snap.entities.insert(other.id, other);
        predictor.reconcile(&snap, &[]);
        predictor.predict_tick(command(1), 1, Some(&snap), &[]);

        let mut view = snap.clone();
        predictor.apply(&mut view);
        assert_ne!(view.entities[&EntityId(1)], snap.entities[&EntityId(1)]);
        assert_eq!(view.entities[&EntityId(2)], other);
    }
}
