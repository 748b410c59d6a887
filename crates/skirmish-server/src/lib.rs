//! Skirmish Server - the authoritative end of a match
//!
//! - **World**: entities, living players and owner-scoped inventories
//! - **Lag Compensation**: actions resolve against the frame the acting
//!   client was looking at, then the live frame is restored
//! - **Combat**: hit-scan shots, projectiles, reloads and pickups
//! - **Game Mode**: deathmatch scoring, respawns, floor hazard, item drops
//! - **Bots**: computer players feeding the same input queues as clients
//! - **Events**: a session-scoped publish/subscribe bus of match events
//!
//! # Example
//!
//! ```rust,ignore
//! use skirmish_netcode::MemoryHub;
//! use skirmish_server::{GameServer, ServerConfig};
//!
//! let hub = MemoryHub::new();
//! let mut server = GameServer::new(hub.bind()?, ServerConfig::load("server.ron")?, seed)?;
//! server.add_bot("red")?;
//!
//! loop {
//!     server.update(frame_time)?;
//! }
//! ```

pub mod bot;
pub mod combat;
mod config;
mod connection;
mod error;
mod events;
pub mod game_mode;
pub mod lag_compensation;
mod server;
mod world;

pub use bot::Bot;
pub use config::{HazardConfig, ServerConfig};
pub use connection::{Connection, ConnectionState};
pub use error::{Error, Result};
pub use events::{EventBus, MatchEvent, SubscriptionId};
pub use game_mode::Deathmatch;
pub use lag_compensation::{rollback_ticks, LagCompensator};
pub use server::GameServer;
pub use world::World;
