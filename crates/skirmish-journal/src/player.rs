//! Scrubbing through a loaded replay

use crate::Replay;
use skirmish_core::{SnapshotData, Tick};
use std::time::Duration;

/// Speed for replay playback
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReplaySpeed {
    /// Only `step_*` and `goto` move the cursor
    #[default]
    Step,
    /// Recorded tick rate times the factor
    RealTime(f64),
    /// Jump to the end on the next `advance`
    Instant,
}

/// State of the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    Playing,
    Paused,
    /// Cursor is on the last frame
    Finished,
}

/// Cursor over the frames of a [`Replay`]
///
/// Ticks missing from the recording resolve to the newest frame before them.
pub struct ReplayPlayer<'a> {
    replay: &'a Replay,
    state: ReplayState,
    speed: ReplaySpeed,
    cursor: usize,
    /// Playback time not yet turned into a frame step, in ticks
    pending: f64,
}

impl<'a> ReplayPlayer<'a> {
    pub fn new(replay: &'a Replay) -> Self {
        Self {
            replay,
            state: ReplayState::Idle,
            speed: ReplaySpeed::default(),
            cursor: 0,
            pending: 0.0,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn speed(&self) -> ReplaySpeed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: ReplaySpeed) {
        self.speed = speed;
    }

    /// The frame under the cursor, `None` for an empty replay
    pub fn current(&self) -> Option<&'a SnapshotData> {
        self.replay.frames().get(self.cursor)
    }

    pub fn current_tick(&self) -> Option<Tick> {
        self.current().map(|f| f.tick)
    }

    /// Move to the newest frame at or before `tick`
    ///
    /// Ticks before the first frame land on the first frame.
    pub fn goto(&mut self, tick: Tick) -> Option<&'a SnapshotData> {
        if self.replay.is_empty() {
            return None;
        }
        self.cursor = self.replay.index_at_or_before(tick).unwrap_or(0);
        self.pending = 0.0;
        self.settle(ReplayState::Paused);
        self.current()
    }

    /// Move to the frame `time` into the recording
    pub fn seek(&mut self, time: Duration) -> Option<&'a SnapshotData> {
        let first = self.replay.first_tick()?;
        let offset = (time.as_secs_f64() * self.replay.tick_rate() as f64).floor() as Tick;
        self.goto(first.saturating_add(offset))
    }

    /// Step one frame forward; false at the end
    pub fn step_forward(&mut self) -> bool {
        if self.cursor + 1 >= self.replay.len() {
            self.settle(ReplayState::Finished);
            return false;
        }
        self.cursor += 1;
        self.settle(self.state);
        true
    }

    /// Step one frame back; false at the start
    pub fn step_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.settle(ReplayState::Paused);
        true
    }

    pub fn play(&mut self) {
        if self.state != ReplayState::Finished && !self.replay.is_empty() {
            self.state = ReplayState::Playing;
        }
    }

    pub fn pause(&mut self) {
        if self.state == ReplayState::Playing {
            self.state = ReplayState::Paused;
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.pending = 0.0;
        self.state = ReplayState::Idle;
    }

    /// Feed wall-clock time while playing; returns the frames stepped
    ///
    /// Frames advance by recorded tick, so gaps in the recording are
    /// crossed at the recorded pace.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        if self.state != ReplayState::Playing {
            return 0;
        }
        let Some(start) = self.current_tick() else {
            return 0;
        };
        let target = match self.speed {
            ReplaySpeed::Step => return 0,
            ReplaySpeed::Instant => Tick::MAX,
            ReplaySpeed::RealTime(factor) => {
                self.pending +=
                    elapsed.as_secs_f64() * self.replay.tick_rate() as f64 * factor.max(0.0);
                let whole = self.pending.floor();
                self.pending -= whole;
                start.saturating_add(whole as Tick)
            }
        };

        let mut stepped = 0;
        while self
            .replay
            .frames()
            .get(self.cursor + 1)
            .is_some_and(|next| next.tick <= target)
        {
            self.cursor += 1;
            stepped += 1;
        }
        self.settle(ReplayState::Playing);
        stepped
    }

    fn settle(&mut self, otherwise: ReplayState) {
        self.state = if self.cursor + 1 >= self.replay.len() {
            ReplayState::Finished
        } else {
            otherwise
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::tests::fixtures::frame;
    use crate::ReplayRecorder;

    fn replay(ticks: &[Tick]) -> Replay {
        let mut recorder = ReplayRecorder::new(10);
        for tick in ticks {
            recorder.record(&frame(*tick)).unwrap();
        }
        Replay::from_bytes(&recorder.to_bytes()).unwrap()
    }

    #[test]
    fn test_goto_resolves_gaps() {
        let replay = replay(&[1, 2, 5, 6]);
        let mut player = ReplayPlayer::new(&replay);
        assert_eq!(player.goto(4).unwrap().tick, 2);
        assert_eq!(player.state(), ReplayState::Paused);
        assert_eq!(player.goto(0).unwrap().tick, 1);
        assert_eq!(player.goto(99).unwrap().tick, 6);
        assert_eq!(player.state(), ReplayState::Finished);
    }

    #[test]
    fn test_step_both_ways() {
        let replay = replay(&[1, 2, 3]);
        let mut player = ReplayPlayer::new(&replay);
        assert_eq!(player.current_tick(), Some(1));
        assert!(!player.step_backward());
        assert!(player.step_forward());
        assert!(player.step_forward());
        assert_eq!(player.state(), ReplayState::Finished);
        assert!(!player.step_forward());
        assert!(player.step_backward());
        assert_eq!(player.current_tick(), Some(2));
        assert_eq!(player.state(), ReplayState::Paused);
    }

    #[test]
    fn test_seek_by_time() {
        let replay = replay(&[10, 11, 12, 13, 14, 15, 20, 25]);
        let mut player = ReplayPlayer::new(&replay);
        // 10 ticks per second
        assert_eq!(player.seek(Duration::from_millis(500)).unwrap().tick, 15);
        assert_eq!(player.seek(Duration::from_millis(900)).unwrap().tick, 15);
        assert_eq!(player.seek(Duration::from_secs(1)).unwrap().tick, 20);
    }

    #[test]
    fn test_real_time_playback() {
        let replay = replay(&[1, 2, 3, 4, 5]);
        let mut player = ReplayPlayer::new(&replay);
        player.set_speed(ReplaySpeed::RealTime(1.0));
        assert_eq!(player.advance(Duration::from_millis(250)), 0);

        player.play();
        assert_eq!(player.advance(Duration::from_millis(250)), 2);
        assert_eq!(player.advance(Duration::from_millis(100)), 1);
        assert_eq!(player.current_tick(), Some(4));
        player.pause();
        assert_eq!(player.advance(Duration::from_secs(1)), 0);

        player.play();
        assert_eq!(player.advance(Duration::from_secs(1)), 1);
        assert_eq!(player.state(), ReplayState::Finished);
        player.play();
        assert_eq!(player.state(), ReplayState::Finished);
    }

    #[test]
    fn test_instant_and_reset() {
        let replay = replay(&[1, 2, 3, 4]);
        let mut player = ReplayPlayer::new(&replay);
        player.set_speed(ReplaySpeed::Instant);
        player.play();
        assert_eq!(player.advance(Duration::ZERO), 3);
        player.reset();
        assert_eq!(player.current_tick(), Some(1));
        assert_eq!(player.state(), ReplayState::Idle);
    }

    #[test]
    fn test_empty_replay() {
        let replay = replay(&[]);
        let mut player = ReplayPlayer::new(&replay);
        assert!(player.goto(3).is_none());
        assert!(player.seek(Duration::from_secs(1)).is_none());
        player.play();
        assert_eq!(player.state(), ReplayState::Idle);
    }
}
