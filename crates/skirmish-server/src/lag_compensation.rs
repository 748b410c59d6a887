//! Lag compensation by rollback
//!
//! The server keeps the entity frame of every recent tick. To resolve a shot
//! or an interaction, it temporarily installs the frame the acting client was
//! looking at, with the actor's own avatar at its true current position, and
//! restores the live frame before doing anything else.

use crate::world::World;
use skirmish_core::{EntityFrame, EntityId, Tick};
use skirmish_rollback_buffer::RollbackBuffer;
use std::time::Duration;
use tracing::{trace, warn};

/// How many frames back a client with round trip `rtt` is looking:
/// `round((rtt / 2) / tick) + buffer_ticks`
pub fn rollback_ticks(rtt: Duration, tick: Duration, buffer_ticks: u32) -> usize {
    let tick_nanos = tick.as_nanos().max(1) as f64;
    let one_way = rtt.as_nanos() as f64 / 2.0;
    (one_way / tick_nanos).round() as usize + buffer_ticks as usize
}

/// History of authoritative entity frames
#[derive(Debug)]
pub struct LagCompensator {
    history: RollbackBuffer<EntityFrame>,
}

impl LagCompensator {
    pub fn new(depth: usize) -> Self {
        Self {
            history: RollbackBuffer::new(depth),
        }
    }

    /// Store the final frame of `tick`
    pub fn record(&mut self, tick: Tick, frame: &EntityFrame) {
        self.history.push(tick, frame.clone());
    }

    pub fn depth(&self) -> usize {
        self.history.capacity()
    }

    /// Frames currently stored
    pub fn available(&self) -> usize {
        self.history.len()
    }

    /// The composite frame an actor saw `ticks` frames ago
    ///
    /// Refused with `InsufficientRollbackHistory` when fewer frames are stored.
    pub fn rewound_frame(
        &self,
        live: &EntityFrame,
        actor: EntityId,
        ticks: usize,
    ) -> crate::Result<EntityFrame> {
        let historical =
            self.history
                .get_frame(ticks)
                .ok_or(crate::Error::InsufficientRollbackHistory {
                    requested: ticks,
                    available: self.history.len(),
                })?;
        let mut composite = historical.clone();
        match live.get(&actor) {
            Some(current) => {
                composite.insert(actor, *current);
            }
            None => {
                composite.remove(&actor);
            }
        }
        Ok(composite)
    }

    /// Run `resolve` against the world as the actor saw it `ticks` frames ago
    ///
    /// The rewound frame is installed as the world's entity frame for the
    /// duration of the call and the live frame is put back before returning.
    /// With `ticks == 0` or too little history the live world is used as is.
    pub fn compensate<R>(
        &self,
        world: &mut World,
        actor: EntityId,
        ticks: usize,
        resolve: impl FnOnce(&World) -> R,
    ) -> R {
        if ticks == 0 {
            return resolve(world);
        }
        let composite = match self.rewound_frame(&world.entities, actor, ticks) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(tick = world.tick, entity = %actor, %error, "resolving against live state");
                return resolve(world);
            }
        };
        trace!(tick = world.tick, entity = %actor, ticks, "rolled back");
        let live = std::mem::replace(&mut world.entities, composite);
        let result = resolve(world);
        world.entities = live;
        result
    }
}
