//! Per-connection server state

use skirmish_core::{PlayerId, SnapshotData, Tick};
use skirmish_netcode::Address;
use std::collections::BTreeMap;
use std::time::Duration;

/// Where a connection is in the join handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// `LoadLevel` sent, waiting for `LevelLoaded`
    Loading,
    Playing,
    Disconnected,
}

/// A remote client
#[derive(Debug)]
pub struct Connection {
    pub address: Address,
    pub player: PlayerId,
    pub name: String,
    pub state: ConnectionState,
    /// Snapshots sent, by tick, kept as delta baselines
    sent: BTreeMap<Tick, SnapshotData>,
    history: usize,
    /// Newest snapshot tick the client reported receiving
    acknowledged: Option<Tick>,
    rtt: Option<Duration>,
}

impl Connection {
    pub fn new(address: Address, player: PlayerId, name: String, history: usize) -> Self {
        Self {
            address,
            player,
            name,
            state: ConnectionState::Loading,
            sent: BTreeMap::new(),
            history: history.max(1),
            acknowledged: None,
            rtt: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == ConnectionState::Playing
    }

    /// Remember a sent snapshot, forgetting the oldest beyond the history limit
    pub fn record_sent(&mut self, snapshot: SnapshotData) {
        self.sent.insert(snapshot.tick, snapshot);
        while self.sent.len() > self.history {
            self.sent.pop_first();
        }
    }

    /// Note the client's newest received tick; older reports are ignored
    pub fn acknowledge(&mut self, tick: Tick) {
        if self.sent.contains_key(&tick) && self.acknowledged.map_or(true, |t| tick > t) {
            self.acknowledged = Some(tick);
        }
    }

    pub fn acknowledged(&self) -> Option<Tick> {
        self.acknowledged
    }

    /// The acknowledged snapshot, if still held
    pub fn baseline(&self) -> Option<&SnapshotData> {
        self.acknowledged.and_then(|tick| self.sent.get(&tick))
    }

    /// Sent snapshots by tick, the lookup delta encoding needs
    pub fn sent(&self) -> &BTreeMap<Tick, SnapshotData> {
        &self.sent
    }

    /// Fold in a round-trip sample (smoothed, 1/8 weight)
    pub fn record_rtt(&mut self, sample: Duration) {
        self.rtt = Some(match self.rtt {
            None => sample,
            Some(rtt) => (rtt * 7 + sample) / 8,
        });
    }

    /// Smoothed round-trip time, zero before the first sample
    pub fn rtt(&self) -> Duration {
        self.rtt.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(history: usize) -> Connection {
        Connection::new(Address::Memory(1), PlayerId(0), "ada".into(), history)
    }

    #[test]
    fn test_baseline_follows_acknowledgement() {
        let mut conn = connection(4);
        assert!(conn.baseline().is_none());
        for tick in 1..=3 {
            conn.record_sent(SnapshotData::new(tick));
        }
        conn.acknowledge(2);
        assert_eq!(conn.baseline().map(|s| s.tick), Some(2));

        // Late, older acknowledgement
        conn.acknowledge(1);
        assert_eq!(conn.acknowledged(), Some(2));
        // Never sent
        conn.acknowledge(9);
        assert_eq!(conn.acknowledged(), Some(2));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut conn = connection(2);
        conn.record_sent(SnapshotData::new(1));
        conn.acknowledge(1);
        conn.record_sent(SnapshotData::new(2));
        conn.record_sent(SnapshotData::new(3));
        assert_eq!(conn.sent().len(), 2);
        // The acknowledged baseline was evicted: fall back to full snapshots
        assert!(conn.baseline().is_none());
    }

    #[test]
    fn test_rtt_smoothing() {
        let mut conn = connection(1);
        assert_eq!(conn.rtt(), Duration::ZERO);
        conn.record_rtt(Duration::from_millis(80));
        assert_eq!(conn.rtt(), Duration::from_millis(80));
        conn.record_rtt(Duration::from_millis(160));
        assert_eq!(conn.rtt(), Duration::from_millis(90));
    }
}
