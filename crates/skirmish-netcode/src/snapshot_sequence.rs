//! Ordered history of confirmed snapshots on the client
//!
//! Feeds interpolation, reconciliation and delta decoding. Consumed history
//! is trimmed from the front.

use crate::{Error, Result};
use skirmish_core::{SnapshotData, SnapshotLookup, Tick};
use tracing::debug;

/// Default number of snapshots kept before the oldest is dropped
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 64;

/// Confirmed snapshots in strictly increasing tick order
#[derive(Debug, Clone)]
pub struct SnapshotSequence {
    snapshots: Vec<SnapshotData>,
    capacity: usize,
    last_received: Option<Tick>,
}

impl SnapshotSequence {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
            last_received: None,
        }
    }

    /// Append a snapshot
    ///
    /// The first snapshot is always accepted; after that, ticks at or below
    /// the newest received one are rejected with `StaleSnapshot`.
    pub fn store_snapshot(&mut self, snapshot: SnapshotData) -> Result<()> {
        if let Some(last) = self.last_received {
            if snapshot.tick <= last {
                debug!(tick = snapshot.tick, last_received = last, "discarding stale snapshot");
                return Err(Error::StaleSnapshot {
                    tick: snapshot.tick,
                    last_received: last,
                });
            }
        }
        self.last_received = Some(snapshot.tick);
        if self.snapshots.len() >= self.capacity {
            self.snapshots.remove(0);
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Drop every snapshot before `index`
    pub fn erase_up_to_index(&mut self, index: usize) {
        let end = index.min(self.snapshots.len());
        self.snapshots.drain(..end);
    }

    /// Position of the snapshot for `tick`, by linear scan
    pub fn index_for_tick(&self, tick: Tick) -> Option<usize> {
        self.snapshots.iter().position(|s| s.tick == tick)
    }

    pub fn get(&self, index: usize) -> Option<&SnapshotData> {
        self.snapshots.get(index)
    }

    pub fn latest(&self) -> Option<&SnapshotData> {
        self.snapshots.last()
    }

    pub fn oldest(&self) -> Option<&SnapshotData> {
        self.snapshots.first()
    }

    /// Newest tick ever accepted, even if since trimmed
    pub fn last_received_tick(&self) -> Option<Tick> {
        self.last_received
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SnapshotData> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Forget everything, including the stale-tick watermark
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.last_received = None;
    }
}

impl Default for SnapshotSequence {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_CAPACITY)
    }
}

impl SnapshotLookup for SnapshotSequence {
    fn snapshot_at(&self, tick: Tick) -> Option<&SnapshotData> {
        self.index_for_tick(tick).and_then(|i| self.snapshots.get(i))
    }
}
