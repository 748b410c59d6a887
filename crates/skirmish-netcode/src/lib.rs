//! Skirmish Netcode - keeping clients and the authoritative server in step
//!
//! This crate holds the stateful halves of the protocol on both ends:
//!
//! - **Input Queue** (server): per-player commands merged once per tick
//! - **Input Buffer** (client): commands awaiting confirmation
//! - **Snapshot Sequence** (client): confirmed snapshots in tick order
//! - **Prediction / Reconciliation**: the local player runs ahead of the
//!   server and is corrected by replaying unconfirmed commands
//! - **Interpolation**: remote entities are drawn between two snapshots
//! - **Transport**: datagram trait plus an in-process hub
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ClientSession                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ Input Buffer │─▶│  Predictor   │─▶│  Render view     │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! │         │                  ▲                   ▲            │
//! │         ▼                  │                   │            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │  Transport   │─▶│   Snapshot   │─▶│  Interpolator    │  │
//! │  │              │  │   Sequence   │  │                  │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use skirmish_netcode::{ClientConfig, ClientSession, MemoryHub};
//!
//! let hub = MemoryHub::new();
//! let mut session = ClientSession::new(hub.bind()?, server_addr, ClientConfig::default());
//! session.connect()?;
//!
//! loop {
//!     session.poll()?;
//!     for _ in 0..session.accumulate(frame_time) {
//!         session.tick(read_input())?;
//!     }
//!     if let Some(view) = session.render_state(session.clock().alpha()) {
//!         draw(&view);
//!     }
//! }
//! ```

mod config;
mod error;
mod input_buffer;
mod input_queue;
pub mod interpolation;
mod prediction;
mod session;
mod snapshot_sequence;
mod transport;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use input_buffer::InputBuffer;
pub use input_queue::{InputQueue, DEFAULT_QUEUE_CAPACITY};
pub use interpolation::Interpolator;
pub use prediction::{ClientPredictor, Prediction, DEFAULT_INPUT_CAPACITY};
pub use session::{ClientSession, SessionEvent, SessionState};
pub use snapshot_sequence::{SnapshotSequence, DEFAULT_SNAPSHOT_CAPACITY};
pub use transport::{Address, MemoryHub, MemoryTransport, Transport};
