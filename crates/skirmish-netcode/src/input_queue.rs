//! Server-side input queue
//!
//! Commands from one player are queued as they arrive and folded into a
//! single effective command once per tick.

use crate::{Error, Result};
use skirmish_core::{ClientInputMessage, Sequence};
use std::collections::VecDeque;
use tracing::debug;

/// Default number of commands a player may have waiting
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Per-player queue of received commands
///
/// Sequence numbers start at 1; anything at or below the newest sequence
/// already seen is rejected, so redelivered or reordered packets never
/// change the simulation.
#[derive(Debug)]
pub struct InputQueue {
    /// Received, not yet combined (oldest first)
    pending: VecDeque<ClientInputMessage>,
    capacity: usize,
    /// Newest sequence folded into a combined command
    last_applied: Sequence,
    /// Newest sequence accepted by `push`
    last_received: Sequence,
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            last_applied: 0,
            last_received: 0,
        }
    }

    /// Queue a received command
    ///
    /// Returns `Err(StaleInput)` for sequences at or below the newest one
    /// seen and `Err(InputBufferFull)` when the window is full.
    pub fn push(&mut self, input: ClientInputMessage) -> Result<()> {
        let newest = self.last_received.max(self.last_applied);
        if input.sequence <= newest {
            debug!(
                sequence = input.sequence,
                last_seen = newest,
                "discarding stale input"
            );
            return Err(Error::StaleInput {
                sequence: input.sequence,
                last_applied: newest,
            });
        }
        if self.pending.len() >= self.capacity {
            return Err(Error::InputBufferFull);
        }
        self.last_received = input.sequence;
        self.pending.push_back(input);
        Ok(())
    }

    /// Fold the whole window into one command
    ///
    /// Direction, aim, slot and sequence take the latest sample; every
    /// boolean flag is OR-reduced so a press shorter than a tick is never
    /// lost; the latest pickup request wins. Returns `None` when nothing new
    /// arrived since the last call.
    pub fn combine(&mut self) -> Option<ClientInputMessage> {
        let last_applied = self.last_applied;
        self.pending.retain(|input| input.sequence > last_applied);

        let mut window = self.pending.drain(..);
        let first = window.next()?;
        let combined = window.fold(first, |mut acc, next| {
            acc.sequence = next.sequence;
            acc.last_received_tick = acc.last_received_tick.max(next.last_received_tick);
            acc.direction = next.direction;
            acc.aim = next.aim;
            acc.slot = next.slot;
            acc.shoot |= next.shoot;
            acc.interact |= next.interact;
            acc.run |= next.run;
            acc.reload |= next.reload;
            acc.change_weapon |= next.change_weapon;
            if next.pickup.is_some() {
                acc.pickup = next.pickup;
            }
            acc
        });

        self.last_applied = combined.sequence;
        Some(combined)
    }

    /// Newest sequence folded into a combined command
    pub fn last_applied(&self) -> Sequence {
        self.last_applied
    }

    /// Newest sequence accepted
    pub fn last_received(&self) -> Sequence {
        self.last_received
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop pending commands, keeping the sequence watermark
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
