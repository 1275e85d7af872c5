//! Outbound delivery: one FIFO outbox per live connection, scoped fan-out.
//!
//! Every event for a connection goes through its outbox, so delivery order on that
//! connection is the order events were enqueued. Components enqueue while still holding
//! the lock of the entity they mutated.

use crate::gateway::protocol::ServerMessage;
use crate::models::PlayerId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Id of one WebSocket connection; a player's handle in the registry.
pub type ConnectionId = u64;

/// Sending half of a connection's outbound queue; the writer task owns the receiver.
pub type Outbox = mpsc::UnboundedSender<Arc<str>>;

struct Subscriber {
    connection_id: ConnectionId,
    outbox: Outbox,
}

/// Player id -> live outbox.
pub struct Fanout {
    subscribers: RwLock<HashMap<PlayerId, Subscriber>>,
    next_connection_id: AtomicU64,
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

impl Fanout {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Route a player's events to this outbox, replacing any previous connection.
    pub fn attach(&self, player_id: &str, connection_id: ConnectionId, outbox: Outbox) {
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subs.insert(
            player_id.to_string(),
            Subscriber {
                connection_id,
                outbox,
            },
        );
    }

    /// Stop routing to `connection_id`. A newer connection for the same player is kept.
    pub fn detach(&self, player_id: &str, connection_id: ConnectionId) -> bool {
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match subs.get(player_id) {
            Some(sub) if sub.connection_id == connection_id => {
                subs.remove(player_id);
                true
            }
            _ => false,
        }
    }

    pub fn is_online(&self, player_id: &str) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(player_id)
    }

    /// Send to one player, if connected.
    pub fn unicast(&self, player_id: &str, message: &ServerMessage) {
        let Some(text) = message.encode() else { return };
        let subs = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(sub) = subs.get(player_id) {
            deliver(player_id, sub, text);
        }
    }

    /// Send to the listed players (a room's members, a tournament's participants).
    pub fn multicast<'a>(
        &self,
        players: impl IntoIterator<Item = &'a PlayerId>,
        message: &ServerMessage,
        exclude: Option<&str>,
    ) {
        let Some(text) = message.encode() else { return };
        let subs = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for player_id in players {
            if exclude == Some(player_id.as_str()) {
                continue;
            }
            if let Some(sub) = subs.get(player_id) {
                deliver(player_id, sub, text.clone());
            }
        }
    }

    /// Send to every connected player.
    pub fn broadcast(&self, message: &ServerMessage, exclude: Option<&str>) {
        let Some(text) = message.encode() else { return };
        let subs = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for (player_id, sub) in subs.iter() {
            if exclude == Some(player_id.as_str()) {
                continue;
            }
            deliver(player_id, sub, text.clone());
        }
    }
}

fn deliver(player_id: &str, sub: &Subscriber, text: Arc<str>) {
    if sub.outbox.send(text).is_err() {
        log::debug!(
            "Dropping event for {} (connection {} closed)",
            player_id,
            sub.connection_id
        );
    }
}
