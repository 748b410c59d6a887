//! Export replay data to text formats

use crate::{Error, Replay, Result};
use serde::Serialize;
use skirmish_core::{EntityKind, SnapshotData, Tick};
use std::fmt::Write as _;
use std::io::Write;

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Every frame in full, as RON
    Ron,
    /// One human-readable summary line per frame
    Text,
}

/// Exporter for a loaded replay
pub struct Exporter<'a> {
    replay: &'a Replay,
}

impl<'a> Exporter<'a> {
    pub fn new(replay: &'a Replay) -> Self {
        Self { replay }
    }

    /// Export to a string in the specified format
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Ron => self.to_ron(),
            ExportFormat::Text => Ok(self.to_text()),
        }
    }

    /// Export to a writer
    pub fn export_to<W: Write>(&self, writer: &mut W, format: ExportFormat) -> Result<()> {
        let content = self.export(format)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }

    pub fn to_ron(&self) -> Result<String> {
        self.range_to_ron(Tick::MIN, Tick::MAX)
    }

    /// Frames with ticks in `start..=end` as RON
    pub fn range_to_ron(&self, start: Tick, end: Tick) -> Result<String> {
        let export = ExportData {
            version: 1,
            tick_rate: self.replay.tick_rate(),
            frames: self
                .replay
                .frames()
                .iter()
                .filter(|f| (start..=end).contains(&f.tick))
                .collect(),
        };
        ron::ser::to_string_pretty(&export, ron::ser::PrettyConfig::default())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_text(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "=== Replay Export ===\n");
        let _ = writeln!(output, "Frames: {}", self.replay.len());
        let _ = writeln!(output, "Tick rate: {}", self.replay.tick_rate());
        if let (Some(first), Some(last)) = (self.replay.first_tick(), self.replay.last_tick()) {
            let _ = writeln!(output, "Tick range: {first} - {last}");
        }
        output.push_str("\n=== Frames ===\n\n");

        for frame in self.replay.frames() {
            summarize(&mut output, frame);
        }
        output
    }
}

fn summarize(output: &mut String, frame: &SnapshotData) {
    let (mut items, mut projectiles) = (0, 0);
    for entity in frame.entities.values() {
        match entity.kind {
            EntityKind::Item { .. } => items += 1,
            EntityKind::Projectile { .. } => projectiles += 1,
            EntityKind::Player => {}
        }
    }
    let _ = writeln!(
        output,
        "--- Tick {} --- {} players, {} items, {} projectiles, {} hits",
        frame.tick,
        frame.players.len(),
        items,
        projectiles,
        frame.hits.len()
    );
    for (id, player) in &frame.players {
        let position = frame
            .entity(player.entity)
            .map(|e| format!("({:.1}, {:.1})", e.position.x, e.position.y))
            .unwrap_or_else(|| "?".into());
        let _ = writeln!(
            output,
            "  {id} at {position} health={} weapon={:?} ammo={}",
            player.health,
            player.active().kind,
            player.active().ammo
        );
    }
}

#[derive(Debug, Serialize)]
struct ExportData<'a> {
    version: u32,
    tick_rate: u32,
    frames: Vec<&'a SnapshotData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::tests::fixtures::frame;
    use crate::ReplayRecorder;

    fn replay() -> Replay {
        let mut recorder = ReplayRecorder::new(20);
        for tick in 1..=4 {
            recorder.record(&frame(tick)).unwrap();
        }
        Replay::from_bytes(&recorder.to_bytes()).unwrap()
    }

    #[test]
    fn test_export_ron() {
        let replay = replay();
        let ron = Exporter::new(&replay).to_ron().unwrap();
        assert!(ron.contains("version"));
        assert!(ron.contains("tick_rate: 20"));
        assert_eq!(ron.matches("last_input_sequence").count(), 4);
    }

    #[test]
    fn test_export_range() {
        let replay = replay();
        let ron = Exporter::new(&replay).range_to_ron(2, 3).unwrap();
        assert_eq!(ron.matches("last_input_sequence").count(), 2);
    }

    #[test]
    fn test_export_text() {
        let replay = replay();
        let text = Exporter::new(&replay).to_text();
        assert!(text.contains("Replay Export"));
        assert!(text.contains("Tick range: 1 - 4"));
        assert!(text.contains("--- Tick 3 --- 1 players, 0 items, 0 projectiles, 0 hits"));
        assert!(text.contains("player:0 at (103.0, 64.0) health=100 weapon=Pistol"));
    }

    #[test]
    fn test_export_to_writer() {
        let replay = replay();
        let mut out = Vec::new();
        Exporter::new(&replay)
            .export_to(&mut out, ExportFormat::Text)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), Exporter::new(&replay).to_text());
    }
}
