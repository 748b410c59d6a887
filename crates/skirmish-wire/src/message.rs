//! Message catalogue
//!
//! Every datagram is a one-byte tag, a bit-packed body and a trailing
//! checkpoint. Decoding dispatches on the tag through a fixed table of decoder
//! functions.

use crate::bits::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::snapshot::{
    read_amount, read_delta, read_full, read_item_kind, read_player_id, write_amount, write_delta,
    write_full, write_item_kind, write_player_id,
};
use skirmish_core::time::{MAX_TICK_RATE, MIN_TICK_RATE};
use skirmish_core::{
    ClientInputMessage, EntityId, PickupRequest, PlayerId, SnapshotData, SnapshotLookup, Tick,
    TileCoord,
};

/// Client lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// The level named in `LoadLevel` is ready; spawn me
    LevelLoaded,
    /// The client is leaving the match
    Leaving,
}

impl ClientState {
    const ALL: [ClientState; 2] = [ClientState::LevelLoaded, ClientState::Leaving];
}

/// Discriminant of a [`Message`], sent as the leading byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageTag {
    Ready = 0,
    StateUpdate = 1,
    Input = 2,
    Chat = 3,
    LoadLevel = 4,
    StartGame = 5,
    FullSnapshot = 6,
    DeltaSnapshot = 7,
    PlayerDeath = 8,
    TileDeath = 9,
}

impl MessageTag {
    /// True for messages clients send to the server
    pub fn is_client_to_server(self) -> bool {
        matches!(self, MessageTag::Ready | MessageTag::StateUpdate | MessageTag::Input)
    }
}

/// Every message of the protocol
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client asks to join under a display name
    Ready { name: String },
    StateUpdate { state: ClientState },
    Input(ClientInputMessage),
    /// `from` is `None` for server announcements
    Chat { from: Option<PlayerId>, text: String },
    LoadLevel { level: String, seed: u64, tick_rate: u32 },
    /// The receiving connection controls `player`; the match clock is at `tick`
    StartGame { player: PlayerId, tick: Tick },
    FullSnapshot(Box<SnapshotData>),
    /// Encoded against `baseline` when set; decodes to the reconstructed snapshot
    DeltaSnapshot {
        baseline: Option<Tick>,
        snapshot: Box<SnapshotData>,
    },
    PlayerDeath {
        victim: PlayerId,
        killer: Option<PlayerId>,
        headshot: bool,
    },
    TileDeath { tile: TileCoord },
}

type Decoder = fn(&mut BitReader<'_>, &dyn SnapshotLookup) -> Result<Message>;

/// Decoders indexed by tag
const DECODERS: [Decoder; 10] = [
    decode_ready,
    decode_state_update,
    decode_input,
    decode_chat,
    decode_load_level,
    decode_start_game,
    decode_full_snapshot,
    decode_delta_snapshot,
    decode_player_death,
    decode_tile_death,
];

impl Message {
    pub fn tag(&self) -> MessageTag {
        match self {
            Message::Ready { .. } => MessageTag::Ready,
            Message::StateUpdate { .. } => MessageTag::StateUpdate,
            Message::Input(_) => MessageTag::Input,
            Message::Chat { .. } => MessageTag::Chat,
            Message::LoadLevel { .. } => MessageTag::LoadLevel,
            Message::StartGame { .. } => MessageTag::StartGame,
            Message::FullSnapshot(_) => MessageTag::FullSnapshot,
            Message::DeltaSnapshot { .. } => MessageTag::DeltaSnapshot,
            Message::PlayerDeath { .. } => MessageTag::PlayerDeath,
            Message::TileDeath { .. } => MessageTag::TileDeath,
        }
    }

    /// Serialize to a datagram
    ///
    /// Delta snapshots fetch their baseline from `lookup`, which must hold
    /// the same snapshot the receiver will look up.
    pub fn encode(&self, lookup: &dyn SnapshotLookup) -> Result<Vec<u8>> {
        let mut w = BitWriter::new();
        w.write_u8(self.tag() as u8);
        match self {
            Message::Ready { name } => w.write_string(name)?,
            Message::StateUpdate { state } => {
                w.write_ranged("client state", *state as u32, 0, ClientState::ALL.len() as u32 - 1)?;
            }
            Message::Input(input) => encode_input(&mut w, input)?,
            Message::Chat { from, text } => {
                w.write_bool(from.is_some());
                if let Some(from) = from {
                    write_player_id(&mut w, *from)?;
                }
                w.write_string(text)?;
            }
            Message::LoadLevel {
                level,
                seed,
                tick_rate,
            } => {
                w.write_string(level)?;
                w.write_u64(*seed);
                w.write_ranged("tick rate", *tick_rate, MIN_TICK_RATE, MAX_TICK_RATE)?;
            }
            Message::StartGame { player, tick } => {
                write_player_id(&mut w, *player)?;
                w.write_u32(*tick);
            }
            Message::FullSnapshot(snapshot) => write_full(&mut w, snapshot)?,
            Message::DeltaSnapshot { baseline, snapshot } => {
                let base = match baseline {
                    Some(tick) => Some(lookup.snapshot_at(*tick).ok_or(Error::MissingBaseline(*tick))?),
                    None => None,
                };
                write_delta(&mut w, snapshot, base)?;
            }
            Message::PlayerDeath {
                victim,
                killer,
                headshot,
            } => {
                write_player_id(&mut w, *victim)?;
                w.write_bool(killer.is_some());
                if let Some(killer) = killer {
                    write_player_id(&mut w, *killer)?;
                }
                w.write_bool(*headshot);
            }
            Message::TileDeath { tile } => {
                w.write_u16(tile.x);
                w.write_u16(tile.y);
            }
        }
        w.write_checkpoint();
        Ok(w.into_bytes())
    }

    /// Parse a datagram, resolving delta baselines through `lookup`
    pub fn decode(bytes: &[u8], lookup: &dyn SnapshotLookup) -> Result<Message> {
        let mut r = BitReader::new(bytes);
        let tag = r.read_u8()?;
        let decoder = DECODERS.get(tag as usize).ok_or(Error::UnknownTag(tag))?;
        let message = decoder(&mut r, lookup)?;
        r.read_checkpoint()?;
        Ok(message)
    }
}

fn encode_input(w: &mut BitWriter, input: &ClientInputMessage) -> Result<()> {
    w.write_u32(input.sequence);
    w.write_u32(input.last_received_tick);
    w.write_direction(input.direction);
    w.write_position(input.aim);
    w.write_bool(input.shoot);
    w.write_bool(input.interact);
    w.write_bool(input.run);
    w.write_bool(input.reload);
    w.write_bool(input.change_weapon);
    w.write_u8(input.slot);
    w.write_bool(input.pickup.is_some());
    if let Some(pickup) = &input.pickup {
        write_item_kind(w, pickup.kind)?;
        write_amount(w, pickup.amount)?;
        w.write_u32(pickup.target.raw());
    }
    Ok(())
}

fn decode_ready(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    Ok(Message::Ready {
        name: r.read_string()?,
    })
}

fn decode_state_update(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    let index = r.read_ranged("client state", 0, ClientState::ALL.len() as u32 - 1)?;
    Ok(Message::StateUpdate {
        state: ClientState::ALL[index as usize],
    })
}

fn decode_input(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    let mut input = ClientInputMessage {
        sequence: r.read_u32()?,
        last_received_tick: r.read_u32()?,
        direction: r.read_direction()?,
        aim: r.read_position()?,
        shoot: r.read_bool()?,
        interact: r.read_bool()?,
        run: r.read_bool()?,
        reload: r.read_bool()?,
        change_weapon: r.read_bool()?,
        slot: r.read_u8()?,
        pickup: None,
    };
    if r.read_bool()? {
        input.pickup = Some(PickupRequest {
            kind: read_item_kind(r)?,
            amount: read_amount(r)?,
            target: EntityId(r.read_u32()?),
        });
    }
    Ok(Message::Input(input))
}

fn decode_chat(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    let from = if r.read_bool()? {
        Some(read_player_id(r)?)
    } else {
        None
    };
    Ok(Message::Chat {
        from,
        text: r.read_string()?,
    })
}

fn decode_load_level(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    Ok(Message::LoadLevel {
        level: r.read_string()?,
        seed: r.read_u64()?,
        tick_rate: r.read_ranged("tick rate", MIN_TICK_RATE, MAX_TICK_RATE)?,
    })
}

fn decode_start_game(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    Ok(Message::StartGame {
        player: read_player_id(r)?,
        tick: r.read_u32()?,
    })
}

fn decode_full_snapshot(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    Ok(Message::FullSnapshot(Box::new(read_full(r)?)))
}

fn decode_delta_snapshot(r: &mut BitReader<'_>, lookup: &dyn SnapshotLookup) -> Result<Message> {
    let mut peek = r.clone();
    peek.read_u32()?;
    peek.read_u32()?;
    let baseline = if peek.read_bool()? {
        Some(peek.read_u32()?)
    } else {
        None
    };
    Ok(Message::DeltaSnapshot {
        baseline,
        snapshot: Box::new(read_delta(r, lookup)?),
    })
}

fn decode_player_death(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    let victim = read_player_id(r)?;
    let killer = if r.read_bool()? {
        Some(read_player_id(r)?)
    } else {
        None
    };
    Ok(Message::PlayerDeath {
        victim,
        killer,
        headshot: r.read_bool()?,
    })
}

fn decode_tile_death(r: &mut BitReader<'_>, _: &dyn SnapshotLookup) -> Result<Message> {
    Ok(Message::TileDeath {
        tile: TileCoord::new(r.read_u16()?, r.read_u16()?),
    })
}
