//! Fixed-timestep clock
//!
//! Both peers advance the simulation in whole ticks of a fixed duration.
//! The clock accumulates real frame time and reports how many ticks are due.

use crate::Tick;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest supported simulation rate
pub const MIN_TICK_RATE: u32 = 1;
/// Highest supported simulation rate
pub const MAX_TICK_RATE: u32 = 240;

/// Simulation clock state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    /// Current tick number
    pub tick: Tick,
    /// Ticks per second
    tick_rate: u32,
    /// Unconsumed frame time, in seconds
    accumulator: f64,
}

impl Clock {
    /// Create a clock running at `tick_rate` ticks per second
    ///
    /// The rate is clamped to `[MIN_TICK_RATE, MAX_TICK_RATE]`.
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick: 0,
            tick_rate: tick_rate.clamp(MIN_TICK_RATE, MAX_TICK_RATE),
            accumulator: 0.0,
        }
    }

    /// Ticks per second
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Duration of one tick
    pub fn tick_duration(&self) -> Duration {
        tick_duration(self.tick_rate)
    }

    /// Timestep of one tick in seconds, as used by the integrator
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Advance to the next tick
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Feed elapsed frame time and return the number of ticks that are now due
    ///
    /// Does not advance `tick`; the caller runs one simulation step per due
    /// tick and calls [`Clock::advance`] after each.
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        let step = 1.0 / self.tick_rate as f64;
        self.accumulator += elapsed.as_secs_f64();
        let mut due = 0;
        while self.accumulator >= step {
            self.accumulator -= step;
            due += 1;
        }
        due
    }

    /// Fraction of the next tick already accumulated, in [0, 1)
    pub fn alpha(&self) -> f32 {
        (self.accumulator * self.tick_rate as f64) as f32
    }
}

/// Duration of one tick at `tick_rate` ticks per second
pub fn tick_duration(tick_rate: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / tick_rate.max(MIN_TICK_RATE) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advance() {
        let mut clock = Clock::new(60);
        assert_eq!(clock.tick, 0);
        clock.advance();
        assert_eq!(clock.tick, 1);
        assert!((clock.dt() - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_accumulate() {
        let mut clock = Clock::new(50);
        assert_eq!(clock.accumulate(Duration::from_millis(10)), 0);
        assert_eq!(clock.accumulate(Duration::from_millis(15)), 1);
        assert_eq!(clock.accumulate(Duration::from_millis(40)), 2);
        assert!(clock.alpha() < 1.0);
    }

    #[test]
    fn test_tick_duration() {
        assert_eq!(tick_duration(20), Duration::from_millis(50));
        assert_eq!(tick_duration(60), Duration::from_nanos(16_666_666));
        assert_eq!(tick_duration(0), Duration::from_secs(1));
    }

    #[test]
    fn test_rate_clamped() {
        assert_eq!(Clock::new(0).tick_rate(), MIN_TICK_RATE);
        assert_eq!(Clock::new(10_000).tick_rate(), MAX_TICK_RATE);
    }
}
