//! The persisted replay file
//!
//! ```text
//! magic        8 bytes  "SKRMREPL"
//! frame count  u64 LE
//! tick rate    u32 LE
//! frames       frame count times: u32 LE length, then a full snapshot body
//! ```
//!
//! A frame body is the bare full-snapshot body the live `FullSnapshot`
//! message carries. It has no message tag byte and no trailing checkpoint,
//! since the record length already frames it.

use crate::{Error, Result};
use skirmish_core::{SnapshotData, SnapshotLookup, Tick};
use skirmish_wire::snapshot::{read_full, write_full};
use skirmish_wire::{BitReader, BitWriter};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const MAGIC: &[u8; 8] = b"SKRMREPL";

/// Bytes before the first frame record
pub const HEADER_LEN: usize = MAGIC.len() + 8 + 4;

/// Tick rates outside `[1, MAX_TICK_RATE]` mark a corrupt header
pub const MAX_TICK_RATE: u32 = 240;

/// Smallest possible record: the length prefix and the fixed snapshot fields
const MIN_RECORD_LEN: usize = 4 + 8;

fn encode_frame(snapshot: &SnapshotData) -> Result<Vec<u8>> {
    let mut w = BitWriter::new();
    write_full(&mut w, snapshot)?;
    Ok(w.into_bytes())
}

/// Accumulates confirmed snapshots and writes them out as a replay file
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    tick_rate: u32,
    records: Vec<Vec<u8>>,
    last_tick: Option<Tick>,
}

impl ReplayRecorder {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate: tick_rate.clamp(1, MAX_TICK_RATE),
            records: Vec::new(),
            last_tick: None,
        }
    }

    /// Append one snapshot
    ///
    /// Snapshots not newer than the last recorded one are skipped and
    /// `Ok(false)` is returned.
    pub fn record(&mut self, snapshot: &SnapshotData) -> Result<bool> {
        if self.last_tick.is_some_and(|last| snapshot.tick <= last) {
            debug!(tick = snapshot.tick, "skipping out-of-order replay frame");
            return Ok(false);
        }
        self.records.push(encode_frame(snapshot)?);
        self.last_tick = Some(snapshot.tick);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// The replay file as bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let body: usize = self.records.iter().map(|r| r.len() + 4).sum();
        let mut out = Vec::with_capacity(HEADER_LEN + body);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(self.records.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.tick_rate.to_le_bytes());
        for record in &self.records {
            out.extend_from_slice(&(record.len() as u32).to_le_bytes());
            out.extend_from_slice(record);
        }
        out
    }

    /// Write the replay file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes())?;
        info!(path = %path.display(), frames = self.records.len(), "replay saved");
        Ok(())
    }
}

/// A loaded replay: its tick rate and frames in increasing tick order
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    tick_rate: u32,
    frames: Vec<SnapshotData>,
}

impl Replay {
    /// Read and check a replay file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let replay = Self::from_bytes(&bytes)?;
        info!(path = %path.display(), frames = replay.frames.len(), "replay loaded");
        Ok(replay)
    }

    /// Parse a replay file image
    ///
    /// Any failed check rejects the whole file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedReplay(format!(
                "{} bytes is shorter than the header",
                bytes.len()
            )));
        }
        let (magic, rest) = bytes.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(Error::MalformedReplay("bad magic".into()));
        }
        let (count, rest) = split_u64(rest)?;
        let (tick_rate, mut rest) = split_u32(rest)?;
        if tick_rate == 0 || tick_rate > MAX_TICK_RATE {
            return Err(Error::MalformedReplay(format!("tick rate {tick_rate}")));
        }
        if count > (rest.len() / MIN_RECORD_LEN) as u64 {
            return Err(Error::MalformedReplay(format!(
                "{count} frames cannot fit in {} bytes",
                rest.len()
            )));
        }

        let mut frames: Vec<SnapshotData> = Vec::with_capacity(count as usize);
        for index in 0..count {
            let (len, tail) = split_u32(rest)?;
            let len = len as usize;
            if len > tail.len() {
                return Err(Error::MalformedReplay(format!(
                    "frame {index} claims {len} bytes, {} left",
                    tail.len()
                )));
            }
            let (record, tail) = tail.split_at(len);
            let frame = read_full(&mut BitReader::new(record))?;
            if frames.last().is_some_and(|prev| frame.tick <= prev.tick) {
                return Err(Error::MalformedReplay(format!(
                    "frame {index} at tick {} is out of order",
                    frame.tick
                )));
            }
            frames.push(frame);
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(Error::MalformedReplay(format!(
                "{} trailing bytes",
                rest.len()
            )));
        }
        Ok(Self { tick_rate, frames })
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn frames(&self) -> &[SnapshotData] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_tick(&self) -> Option<Tick> {
        self.frames.first().map(|f| f.tick)
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.frames.last().map(|f| f.tick)
    }

    /// Index of the newest frame at or before `tick`
    pub fn index_at_or_before(&self, tick: Tick) -> Option<usize> {
        self.frames
            .partition_point(|f| f.tick <= tick)
            .checked_sub(1)
    }
}

impl SnapshotLookup for Replay {
    fn snapshot_at(&self, tick: Tick) -> Option<&SnapshotData> {
        self.frames
            .binary_search_by_key(&tick, |f| f.tick)
            .ok()
            .map(|i| &self.frames[i])
    }
}

fn split_u32(bytes: &[u8]) -> Result<(u32, &[u8])> {
    match bytes.split_first_chunk::<4>() {
        Some((head, rest)) => Ok((u32::from_le_bytes(*head), rest)),
        None => Err(Error::MalformedReplay("truncated length field".into())),
    }
}

fn split_u64(bytes: &[u8]) -> Result<(u64, &[u8])> {
    match bytes.split_first_chunk::<8>() {
        Some((head, rest)) => Ok((u64::from_le_bytes(*head), rest)),
        None => Err(Error::MalformedReplay("truncated frame count".into())),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fixtures::frame;

    /// Test fixtures shared with the player and exporter tests
    pub(crate) mod fixtures {
        use skirmish_core::{
            EntityId, EntityKind, EntitySnapshot, PlayerId, PlayerState, SnapshotData, Tick,
        };

        /// One player walking right a unit per tick
        pub(crate) fn frame(tick: Tick) -> SnapshotData {
            let mut snapshot = SnapshotData::new(tick);
            let id = EntityId(1);
            let mut entity = EntitySnapshot::new(id, EntityKind::Player, Default::default());
            entity.position.x = 100.0 + tick as f32;
            entity.position.y = 64.0;
            snapshot.entities.insert(id, entity);
            snapshot
                .players
                .insert(PlayerId(0), PlayerState::spawn(id, entity.position));
            snapshot
        }
    }

    fn recorded(ticks: &[Tick]) -> Vec<u8> {
        let mut recorder = ReplayRecorder::new(30);
        for tick in ticks {
            assert!(recorder.record(&frame(*tick)).unwrap());
        }
        recorder.to_bytes()
    }

    #[test]
    fn test_header_layout() {
        let bytes = recorded(&[1, 2, 3]);
        assert_eq!(&bytes[..8], MAGIC);
        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 30);
    }

    #[test]
    fn test_load_recorded_frames() {
        let replay = Replay::from_bytes(&recorded(&[1, 2, 5])).unwrap();
        assert_eq!(replay.tick_rate(), 30);
        assert_eq!(replay.len(), 3);
        assert_eq!(replay.frames()[2], frame(5));
        assert_eq!(replay.snapshot_at(2), Some(&frame(2)));
        assert_eq!(replay.snapshot_at(4), None);
        assert_eq!(replay.index_at_or_before(4), Some(1));
        assert_eq!(replay.index_at_or_before(0), None);
    }

    #[test]
    fn test_recorder_skips_stale_frames() {
        let mut recorder = ReplayRecorder::new(30);
        assert!(recorder.record(&frame(4)).unwrap());
        assert!(!recorder.record(&frame(4)).unwrap());
        assert!(!recorder.record(&frame(2)).unwrap());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_empty_replay() {
        let replay = Replay::from_bytes(&ReplayRecorder::new(60).to_bytes()).unwrap();
        assert!(replay.is_empty());
        assert_eq!(replay.first_tick(), None);
    }

    #[test]
    fn test_rejects_bad_header() {
        let good = recorded(&[1]);

        let mut magic = good.clone();
        magic[0] = b'X';
        assert!(matches!(Replay::from_bytes(&magic), Err(Error::MalformedReplay(_))));

        assert!(matches!(Replay::from_bytes(&good[..10]), Err(Error::MalformedReplay(_))));

        let mut rate = good.clone();
        rate[16..20].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(Replay::from_bytes(&rate), Err(Error::MalformedReplay(_))));
    }

    #[test]
    fn test_rejects_impossible_sizes() {
        let good = recorded(&[1, 2]);

        let mut count = good.clone();
        count[8..16].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(Replay::from_bytes(&count), Err(Error::MalformedReplay(_))));

        let truncated = &good[..good.len() - 1];
        assert!(Replay::from_bytes(truncated).is_err());

        let mut trailing = good.clone();
        trailing.push(0);
        assert!(matches!(Replay::from_bytes(&trailing), Err(Error::MalformedReplay(_))));
    }

    /// A frame filling every list to `entities` entries or to its wire limit
    fn crowded(entities: u32) -> SnapshotData {
        use glam::Vec2;
        use skirmish_core::{
            EntityId, EntityKind, EntitySnapshot, HitEvent, InventoryItem, ItemKind, PlayerId,
            PlayerState, MAX_INVENTORY_AMOUNT, MAX_PLAYERS,
        };

        let mut snapshot = SnapshotData::new(Tick::MAX);
        snapshot.last_input_sequence = u32::MAX;
        for raw in 1..=entities {
            let kind = if raw as usize <= MAX_PLAYERS {
                EntityKind::Player
            } else {
                EntityKind::Item {
                    item: ItemKind::Ammo,
                    amount: MAX_INVENTORY_AMOUNT,
                }
            };
            let position = Vec2::new((raw % 500) as f32, (raw / 500) as f32);
            let id = EntityId(raw);
            snapshot.entities.insert(id, EntitySnapshot::new(id, kind, position));
        }
        for slot in 0..MAX_PLAYERS as u32 {
            let entity = EntityId(slot + 1);
            snapshot
                .players
                .insert(PlayerId(slot as u8), PlayerState::spawn(entity, Vec2::ZERO));
            snapshot.hits.push(HitEvent {
                shooter: PlayerId(slot as u8),
                target: entity,
                start: Vec2::ZERO,
                end: Vec2::new(slot as f32, 1.0),
                headshot: slot % 2 == 0,
            });
        }
        snapshot.inventory = vec![
            InventoryItem {
                owner: PlayerId(MAX_PLAYERS as u8 - 1),
                kind: ItemKind::Ammo,
                amount: MAX_INVENTORY_AMOUNT,
            };
            64
        ];
        snapshot
    }

    #[test]
    fn test_round_trip_at_wire_limits() {
        let full = crowded(u16::MAX as u32);
        let mut recorder = ReplayRecorder::new(MAX_TICK_RATE);
        assert!(recorder.record(&full).unwrap());

        // One entity past the list limit is refused without touching the recording
        let mut late = ReplayRecorder::new(MAX_TICK_RATE);
        assert!(matches!(
            late.record(&crowded(u16::MAX as u32 + 1)),
            Err(Error::Wire(_))
        ));
        assert!(late.is_empty());

        let replay = Replay::from_bytes(&recorder.to_bytes()).unwrap();
        assert_eq!(replay.tick_rate(), MAX_TICK_RATE);
        assert_eq!(replay.last_tick(), Some(Tick::MAX));
        assert_eq!(replay.frames(), &[full]);
    }

    #[test]
    fn test_records_hold_the_live_snapshot_body() {
        use skirmish_core::NoBaseline;
        use skirmish_wire::{Message, MessageTag};

        let snapshot = frame(9);
        let live = Message::FullSnapshot(Box::new(snapshot.clone()))
            .encode(&NoBaseline)
            .unwrap();
        let bytes = recorded(&[9]);
        let record = &bytes[HEADER_LEN + 4..];
        // The live datagram adds a tag byte in front and a checkpoint behind
        assert_eq!(live[0], MessageTag::FullSnapshot as u8);
        assert!(record.len() < live.len());
        assert_eq!(read_full(&mut BitReader::new(record)).unwrap(), snapshot);

        let Message::FullSnapshot(decoded) = Message::decode(&live, &NoBaseline).unwrap() else {
            panic!("expected a full snapshot");
        };
        assert_eq!(Replay::from_bytes(&bytes).unwrap().frames()[0], *decoded);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("skirmish-replay-{}.bin", std::process::id()));
        let mut recorder = ReplayRecorder::new(20);
        recorder.record(&frame(7)).unwrap();
        recorder.save(&path).unwrap();
        let replay = Replay::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(replay.frames(), &[frame(7)]);
        assert!(Replay::load(&path).is_err());
    }
}
