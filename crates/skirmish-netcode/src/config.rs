//! Client configuration

use crate::prediction::DEFAULT_INPUT_CAPACITY;
use crate::snapshot_sequence::DEFAULT_SNAPSHOT_CAPACITY;
use serde::{Deserialize, Serialize};
use skirmish_core::MovementConfig;

/// Client session settings
///
/// Movement tuning must match the server's or every prediction will be
/// corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Display name sent in `Ready`
    pub name: String,
    /// How far render time trails the newest snapshot
    pub interpolation_delay_ticks: u32,
    /// Unacknowledged commands kept for replay
    pub input_capacity: usize,
    /// Confirmed snapshots kept
    pub snapshot_capacity: usize,
    /// Snapshots this recent are kept for delta decoding even once interpolated past
    pub baseline_window_ticks: u32,
    pub movement: MovementConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "player".into(),
            interpolation_delay_ticks: 2,
            input_capacity: DEFAULT_INPUT_CAPACITY,
            snapshot_capacity: DEFAULT_SNAPSHOT_CAPACITY,
            baseline_window_ticks: 32,
            movement: MovementConfig::default(),
        }
    }
}
