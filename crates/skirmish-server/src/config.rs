//! Server configuration
//!
//! Loaded from RON. Every field has a default, so a config file only needs
//! the values it changes. Out-of-range values are clamped on load.

use crate::Result;
use serde::{Deserialize, Serialize};
use skirmish_core::time::{tick_duration, MAX_TICK_RATE, MIN_TICK_RATE};
use skirmish_core::{MovementConfig, MAX_PLAYERS};
use skirmish_rollback_buffer::depth_for_latency;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Floor hazard progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub enabled: bool,
    /// Ticks after match start before the first tile dies
    pub start_after_ticks: u32,
    /// Ticks between tile deaths; also the damage cadence
    pub interval_ticks: u32,
    /// Damage to players standing on dead floor, once per interval
    pub damage: u8,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_after_ticks: 60 * 60,
            interval_ticks: 120,
            damage: 10,
        }
    }
}

/// Authoritative server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name of a built-in level
    pub level: String,
    /// Simulation ticks per second, clamped to `[1, 240]`
    pub tick_rate: u32,
    /// Highest round-trip latency lag compensation rewinds for
    pub max_compensated_latency_ms: u64,
    /// Ticks of input buffering assumed on clients
    pub client_buffer_ticks: u32,
    /// Send deltas against each client's acknowledged snapshot
    pub delta_snapshots: bool,
    /// Player slots, humans and bots, clamped to `[1, MAX_PLAYERS]`
    pub max_players: usize,
    pub respawn_ticks: u32,
    /// Kills that end the match
    pub score_limit: u32,
    pub hazard: HazardConfig,
    /// Ticks between item spawns, 0 disables them
    pub item_spawn_interval_ticks: u32,
    pub max_items: usize,
    /// Sent snapshots kept per connection as delta baselines
    pub snapshot_history: usize,
    /// Commands a player may have queued between ticks
    pub input_capacity: usize,
    pub movement: MovementConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            level: "arena".into(),
            tick_rate: 60,
            max_compensated_latency_ms: 250,
            client_buffer_ticks: 2,
            delta_snapshots: true,
            max_players: 8,
            respawn_ticks: 120,
            score_limit: 10,
            hazard: HazardConfig::default(),
            item_spawn_interval_ticks: 300,
            max_items: 6,
            snapshot_history: 32,
            input_capacity: 64,
            movement: MovementConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a RON document and clamp it
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: ServerConfig = ron::from_str(text)?;
        Ok(config.clamped())
    }

    /// Load a RON file and clamp it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Serialize to pretty RON
    pub fn to_ron_string(&self) -> std::result::Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Force every value into its valid range
    pub fn clamped(mut self) -> Self {
        self.tick_rate = self.tick_rate.clamp(MIN_TICK_RATE, MAX_TICK_RATE);
        self.max_players = self.max_players.clamp(1, MAX_PLAYERS);
        self.score_limit = self.score_limit.max(1);
        self.hazard.interval_ticks = self.hazard.interval_ticks.max(1);
        self.snapshot_history = self.snapshot_history.max(1);
        self.input_capacity = self.input_capacity.max(1);
        self
    }

    pub fn tick_duration(&self) -> Duration {
        tick_duration(self.tick_rate)
    }

    pub fn max_compensated_latency(&self) -> Duration {
        Duration::from_millis(self.max_compensated_latency_ms)
    }

    /// Frames of history lag compensation needs:
    /// `ceil(max latency / tick) + client buffer ticks`
    pub fn rollback_depth(&self) -> usize {
        depth_for_latency(
            self.max_compensated_latency(),
            self.tick_duration(),
            self.client_buffer_ticks,
        )
    }
}
