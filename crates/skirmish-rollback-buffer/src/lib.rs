//! Skirmish Rollback Buffer - fixed-depth history of world frames
//!
//! The server pushes one frame per tick. Lag compensation then looks back a
//! number of frames from the newest one to see the world the way a lagging
//! client saw it.
//!
//! # Features
//!
//! - **Bounded memory**: Fixed-size ring, the oldest frame is evicted on overflow
//! - **O(1) insertion and lookup by depth**
//! - **Refuses rather than guesses**: asking for more history than is stored
//!   returns `None`
//!
//! # Example
//!
//! ```rust
//! use skirmish_rollback_buffer::RollbackBuffer;
//!
//! let mut buffer = RollbackBuffer::new(3);
//! buffer.push(10, "a");
//! buffer.push(11, "b");
//! buffer.push(12, "c");
//! buffer.push(13, "d");
//!
//! // Depth 1 is the newest frame
//! assert_eq!(buffer.get_frame(1), Some(&"d"));
//! assert_eq!(buffer.get_frame(3), Some(&"b"));
//! // Only three frames are kept
//! assert_eq!(buffer.get_frame(4), None);
//! ```

use skirmish_core::Tick;
use std::time::Duration;

/// A ring buffer of the most recent frames
#[derive(Debug, Clone)]
pub struct RollbackBuffer<T> {
    /// Ring storage: (tick, frame), `None` for empty slots
    frames: Vec<Option<(Tick, T)>>,
    /// Next slot to write
    head: usize,
    /// Number of frames currently stored
    count: usize,
}

impl<T> RollbackBuffer<T> {
    /// Create a buffer holding at most `capacity` frames (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: (0..capacity).map(|_| None).collect(),
            head: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn slot_from_back(&self, depth: usize) -> Option<usize> {
        if depth == 0 || depth > self.count {
            return None;
        }
        let cap = self.capacity();
        Some((self.head + cap - depth) % cap)
    }

    /// Append the frame for `tick`, evicting the oldest frame when full
    pub fn push(&mut self, tick: Tick, frame: T) {
        let cap = self.capacity();
        self.frames[self.head] = Some((tick, frame));
        self.head = (self.head + 1) % cap;
        self.count = (self.count + 1).min(cap);
    }

    /// The frame `depth` steps back, where depth 1 is the newest
    pub fn get_frame(&self, depth: usize) -> Option<&T> {
        self.get_entry(depth).map(|(_, frame)| frame)
    }

    /// The frame `depth` steps back together with its tick
    pub fn get_entry(&self, depth: usize) -> Option<(Tick, &T)> {
        let slot = self.slot_from_back(depth)?;
        self.frames[slot].as_ref().map(|(tick, frame)| (*tick, frame))
    }

    /// The newest frame
    pub fn latest(&self) -> Option<&T> {
        self.get_frame(1)
    }

    /// True if `depth` frames of history are available
    pub fn can_roll_back(&self, depth: usize) -> bool {
        depth > 0 && depth <= self.count
    }

    /// Discard the newest `depth - 1` frames and return the frame that is now newest
    ///
    /// Refused (returns `None`, buffer untouched) when `depth` is zero or
    /// exceeds the stored history.
    pub fn roll_back(&mut self, depth: usize) -> Option<&T> {
        if !self.can_roll_back(depth) {
            return None;
        }
        let cap = self.capacity();
        for _ in 1..depth {
            self.head = (self.head + cap - 1) % cap;
            self.frames[self.head] = None;
            self.count -= 1;
        }
        self.latest()
    }

    pub fn clear(&mut self) {
        for frame in &mut self.frames {
            *frame = None;
        }
        self.head = 0;
        self.count = 0;
    }

}

/// History depth needed to compensate `max_latency`:
/// `ceil(max_latency / tick) + buffer_ticks`, at least one frame
pub fn depth_for_latency(max_latency: Duration, tick: Duration, buffer_ticks: u32) -> usize {
    let tick_nanos = tick.as_nanos().max(1);
    let latency_ticks = max_latency.as_nanos().div_ceil(tick_nanos);
    (latency_ticks as usize + buffer_ticks as usize).max(1)
}
