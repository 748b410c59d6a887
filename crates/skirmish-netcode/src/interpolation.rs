//! Snapshot interpolation for smooth rendering
//!
//! Remote entities are drawn slightly in the past, blended between the two
//! confirmed snapshots that bracket the render time. The render time trails
//! the newest snapshot by a fixed number of ticks so there is usually a
//! snapshot on either side of it.

use crate::SnapshotSequence;
use skirmish_core::{SnapshotData, Tick};

/// Interpolator over a [`SnapshotSequence`]
#[derive(Debug, Clone, Copy)]
pub struct Interpolator {
    /// How far render time trails the newest snapshot
    delay_ticks: u32,
}

/// The two snapshots around a render time and the blend factor between them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub from: usize,
    pub to: usize,
    /// 0.0 = `from`, 1.0 = `to`
    pub alpha: f32,
}

impl Interpolator {
    pub fn new(delay_ticks: u32) -> Self {
        Self { delay_ticks }
    }

    pub fn delay_ticks(&self) -> u32 {
        self.delay_ticks
    }

    /// Render time in fractional ticks, given the newest snapshot tick and
    /// the fraction of the current tick already elapsed
    pub fn render_time(&self, newest: Tick, alpha: f32) -> f64 {
        newest as f64 + alpha as f64 - self.delay_ticks as f64
    }

    /// Find the snapshots bracketing `render_time`
    ///
    /// Before the oldest snapshot the oldest is used as is; past the newest
    /// the newest is held (no extrapolation).
    pub fn bracket(&self, snapshots: &SnapshotSequence, render_time: f64) -> Option<Bracket> {
        let last = snapshots.len().checked_sub(1)?;
        let from = snapshots
            .iter()
            .rposition(|s| s.tick as f64 <= render_time)
            .unwrap_or(0);
        if from == last {
            return Some(Bracket {
                from,
                to: from,
                alpha: 0.0,
            });
        }
        let (a, b) = (snapshots.get(from)?, snapshots.get(from + 1)?);
        let span = (b.tick - a.tick) as f64;
        let alpha = ((render_time - a.tick as f64) / span).clamp(0.0, 1.0) as f32;
        Some(Bracket {
            from,
            to: from + 1,
            alpha,
        })
    }

    /// The interpolated world at `render_time`
    pub fn sample(&self, snapshots: &SnapshotSequence, render_time: f64) -> Option<SnapshotData> {
        let bracket = self.bracket(snapshots, render_time)?;
        let from = snapshots.get(bracket.from)?;
        let to = snapshots.get(bracket.to)?;
        Some(blend(from, to, bracket.alpha))
    }

    /// Drop history strictly older than the snapshot currently blended from
    pub fn trim(&self, snapshots: &mut SnapshotSequence, render_time: f64) {
        if let Some(bracket) = self.bracket(snapshots, render_time) {
            snapshots.erase_up_to_index(bracket.from);
        }
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Blend two snapshots
///
/// Positions, rotations and aim points are linear blends for entities present
/// in both with the same kind; everything else, including players, inventory
/// and hits, comes from `to`.
pub fn blend(from: &SnapshotData, to: &SnapshotData, alpha: f32) -> SnapshotData {
    let mut result = to.clone();
    if alpha >= 1.0 {
        return result;
    }

    for entity in result.entities.values_mut() {
        let Some(prev) = from.entities.get(&entity.id) else {
            continue;
        };
        if prev.kind != entity.kind {
            continue;
        }
        entity.position = prev.position.lerp(entity.position, alpha);
        entity.rotation = prev.rotation + (entity.rotation - prev.rotation) * alpha;
    }
    for (id, player) in result.players.iter_mut() {
        if let Some(prev) = from.players.get(id) {
            player.aim = prev.aim.lerp(player.aim, alpha);
        }
    }
    result
}
