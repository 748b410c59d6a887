//! Transport traits for network communication
//!
//! The protocol only needs to send and receive whole datagrams. Real games
//! implement [`Transport`] for their network stack (UDP, WebRTC, ...); the
//! in-memory [`MemoryHub`] connects peers inside one process for tests,
//! bots and headless matches.

use crate::{Error, Result};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Network address type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// Socket address (IP + port)
    Socket(SocketAddr),
    /// Endpoint on a [`MemoryHub`]
    Memory(u32),
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::Socket(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Socket(addr) => write!(f, "{addr}"),
            Address::Memory(id) => write!(f, "mem:{id}"),
        }
    }
}

/// Connectionless datagram transport
///
/// Polled from the owning loop; `recv` never blocks.
pub trait Transport: Send + Sync {
    /// Send one datagram to `target`
    fn send(&self, data: &[u8], target: &Address) -> Result<()>;

    /// Receive one datagram if available
    fn recv(&self) -> Result<Option<(Vec<u8>, Address)>>;

    /// Get the local address this transport is bound to
    fn local_addr(&self) -> Option<Address>;

    /// Push out anything batched by `send`
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct Datagram {
    from: Address,
    data: Vec<u8>,
    /// Hub frame at which the datagram becomes visible
    deliver_at: u64,
}

#[derive(Debug, Default)]
struct HubState {
    next_id: u32,
    /// Current hub frame
    frame: u64,
    latency_frames: u64,
    inboxes: IndexMap<u32, VecDeque<Datagram>>,
}

/// An in-process switchboard of [`MemoryTransport`] endpoints
///
/// Datagrams are delivered in order after a fixed number of hub frames.
/// Sends to unbound endpoints are dropped, as a datagram network would.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

fn lock(state: &Mutex<HubState>) -> Result<MutexGuard<'_, HubState>> {
    state
        .lock()
        .map_err(|_| Error::Transport("memory hub lock poisoned".into()))
}

impl MemoryHub {
    /// A hub that delivers on the next `recv`
    pub fn new() -> Self {
        Self::default()
    }

    /// A hub that holds each datagram for `frames` calls to [`MemoryHub::advance`]
    pub fn with_latency(frames: u64) -> Self {
        let hub = Self::default();
        if let Ok(mut state) = hub.state.lock() {
            state.latency_frames = frames;
        }
        hub
    }

    /// Bind a new endpoint
    pub fn bind(&self) -> Result<MemoryTransport> {
        let mut state = lock(&self.state)?;
        state.next_id += 1;
        let id = state.next_id;
        state.inboxes.insert(id, VecDeque::new());
        Ok(MemoryTransport {
            state: Arc::clone(&self.state),
            id,
        })
    }

    /// Move the hub clock one frame forward
    pub fn advance(&self) -> Result<()> {
        lock(&self.state)?.frame += 1;
        Ok(())
    }

    /// Datagrams queued for any endpoint, delivered or not
    pub fn in_flight(&self) -> Result<usize> {
        Ok(lock(&self.state)?.inboxes.values().map(VecDeque::len).sum())
    }
}

/// One endpoint on a [`MemoryHub`]
///
/// Unbinds itself when dropped.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Arc<Mutex<HubState>>,
    id: u32,
}

impl MemoryTransport {
    pub fn address(&self) -> Address {
        Address::Memory(self.id)
    }
}

impl Transport for MemoryTransport {
    fn send(&self, data: &[u8], target: &Address) -> Result<()> {
        let Address::Memory(target) = target else {
            return Err(Error::Transport(format!("{target} is not a memory address")));
        };
        let mut state = lock(&self.state)?;
        let deliver_at = state.frame + state.latency_frames;
        if let Some(inbox) = state.inboxes.get_mut(target) {
            inbox.push_back(Datagram {
                from: Address::Memory(self.id),
                data: data.to_vec(),
                deliver_at,
            });
        }
        Ok(())
    }

    fn recv(&self) -> Result<Option<(Vec<u8>, Address)>> {
        let mut state = lock(&self.state)?;
        let frame = state.frame;
        let Some(inbox) = state.inboxes.get_mut(&self.id) else {
            return Ok(None);
        };
        if inbox.front().is_some_and(|d| d.deliver_at <= frame) {
            Ok(inbox.pop_front().map(|d| (d.data, d.from)))
        } else {
            Ok(None)
        }
    }

    fn local_addr(&self) -> Option<Address> {
        Some(self.address())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.inboxes.shift_remove(&self.id);
        }
    }
}
