//! Skirmish Journal - recorded matches for offline scrubbing
//!
//! - **ReplayRecorder**: append confirmed snapshots and write the replay file
//! - **Replay**: load a replay file, rejecting it whole if any check fails
//! - **ReplayPlayer**: goto, step and seek through the frames
//! - **Exporter**: dump frames as RON or a text summary
//!
//! # Example
//!
//! ```rust,ignore
//! use skirmish_journal::{ExportFormat, Exporter, Replay, ReplayPlayer, ReplayRecorder};
//!
//! let mut recorder = ReplayRecorder::new(60);
//! for snapshot in confirmed_snapshots {
//!     recorder.record(&snapshot)?;
//! }
//! recorder.save("match.replay")?;
//!
//! let replay = Replay::load("match.replay")?;
//! let mut player = ReplayPlayer::new(&replay);
//! player.goto(300);
//! println!("{}", Exporter::new(&replay).export(ExportFormat::Text)?);
//! ```

mod error;
mod exporter;
mod player;
mod replay;

pub use error::{Error, Result};
pub use exporter::{ExportFormat, Exporter};
pub use player::{ReplayPlayer, ReplaySpeed, ReplayState};
pub use replay::{Replay, ReplayRecorder, HEADER_LEN, MAGIC, MAX_TICK_RATE};
