//! Headless Match Demo
//!
//! Runs a deathmatch with three bots and one client whose inputs come from a
//! bot brain, so prediction and reconciliation run against real traffic.
//! Nothing is rendered; the match is logged and can be saved as a replay.
//!
//! ```text
//! headless_match [server.ron] [match.replay]
//! RUST_LOG=skirmish_server=debug headless_match
//! ```

use skirmish_core::ClientInputMessage;
use skirmish_journal::{Replay, ReplayRecorder};
use skirmish_netcode::{ClientConfig, ClientSession, MemoryHub, SessionEvent};
use skirmish_server::{Bot, GameServer, MatchEvent, ServerConfig};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SEED: u64 = 42;
/// Give up on matches nobody wins
const MAX_SECONDS: u32 = 300;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let replay_path = args.next();

    let hub = MemoryHub::with_latency(2);
    let mut server = GameServer::new(hub.bind()?, config, SEED)?;
    server.subscribe(|event| match event {
        MatchEvent::PlayerKilled {
            victim,
            killer: Some(killer),
            headshot,
        } => info!(%victim, %killer, headshot, "kill"),
        MatchEvent::PlayerKilled { victim, .. } => info!(%victim, "fell through the floor"),
        MatchEvent::MatchOver { winner } => info!(?winner, "match over"),
        _ => {}
    });
    for name in ["red", "green", "blue"] {
        server.add_bot(name)?;
    }

    let mut client = ClientSession::new(
        hub.bind()?,
        server.local_addr().ok_or("server transport has no address")?,
        ClientConfig {
            name: "observer".into(),
            ..Default::default()
        },
    );
    client.connect()?;

    let tick = server.config().tick_duration();
    let max_ticks = MAX_SECONDS * server.config().tick_rate;
    let mut brain: Option<Bot> = None;
    let mut recorder = ReplayRecorder::new(server.config().tick_rate);

    for _ in 0..max_ticks {
        server.update(tick)?;
        hub.advance()?;
        client.poll()?;

        for event in client.take_events() {
            match event {
                SessionEvent::Started { player, .. } => brain = Some(Bot::new(player, SEED)),
                SessionEvent::Chat { from: None, text } => info!(%text, "server says"),
                _ => {}
            }
        }
        if let Some(latest) = client.latest_snapshot() {
            recorder.record(latest)?;
        }

        for _ in 0..client.accumulate(tick) {
            let input = match (brain.as_mut(), client.latest_snapshot()) {
                (Some(brain), Some(snapshot)) => brain
                    .think(snapshot, client.walls())
                    .unwrap_or_default(),
                _ => ClientInputMessage::default(),
            };
            client.tick(input)?;
        }
        client.render_state(0.0);

        if server.game_mode().is_over() {
            break;
        }
    }

    if !server.game_mode().is_over() {
        warn!(ticks = server.tick_count(), "no winner before the time limit");
    }
    for (player, score) in server.game_mode().scores() {
        info!(%player, score, "final score");
    }
    info!(
        pending = client.predictor().pending_inputs(),
        frames = recorder.len(),
        "client finished"
    );

    if let Some(path) = replay_path {
        recorder.save(&path)?;
        let replay = Replay::load(&path)?;
        info!(%path, frames = replay.len(), "replay verified");
    }
    Ok(())
}
