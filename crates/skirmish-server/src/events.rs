//! Match event bus
//!
//! A typed publish/subscribe channel owned by one server session. Subscribers
//! are called synchronously from the tick that publishes; published events
//! are also kept until the server drains them for forwarding to clients.

use indexmap::IndexMap;
use skirmish_core::{EntityId, ItemKind, PlayerId, TileCoord};
use std::fmt;

/// Something that happened in the match
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    PlayerJoined { player: PlayerId, name: String },
    PlayerLeft { player: PlayerId },
    PlayerSpawned { player: PlayerId, entity: EntityId },
    PlayerKilled {
        victim: PlayerId,
        /// `None` for hazard deaths
        killer: Option<PlayerId>,
        headshot: bool,
    },
    ItemPickedUp {
        player: PlayerId,
        item: ItemKind,
        amount: u16,
    },
    TileDied { tile: TileCoord },
    MatchOver { winner: Option<PlayerId> },
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<E> = Box<dyn FnMut(&E)>;

/// Session-scoped publish/subscribe channel
pub struct EventBus<E> {
    subscribers: IndexMap<SubscriptionId, Subscriber<E>>,
    next_id: u64,
    /// Published and not yet drained
    pending: Vec<E>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: IndexMap::new(),
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Register a callback for every future event
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.shift_remove(&id).is_some()
    }

    /// Deliver `event` to every subscriber in subscription order and queue it
    pub fn publish(&mut self, event: E) {
        for callback in self.subscribers.values_mut() {
            callback(&event);
        }
        self.pending.push(event);
    }

    /// Take every event published since the last drain
    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: fmt::Debug> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending)
            .finish()
    }
}
