/// Live connection registry
///
/// Owns the routing metadata for this process: which connection belongs to
/// which identity, and which connections sit in which board room. It never
/// holds domain data.
///
/// # Indexes
///
/// - connection -> identity and joined rooms, for cleanup on disconnect
/// - identity -> connections, so a user's every tab can be excluded at once
/// - board -> connections, the room itself
///
/// Empty sets are removed as soon as they empty, so a user with no live
/// connections has no entry at all.
///
/// Each connection is represented by a bounded channel of outbound text
/// frames. Emission uses `try_send`, so a slow client drops frames instead of
/// stalling the request that triggered the broadcast.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::BoardEvent;
use super::protocol::event_frame;

/// Outbound frame buffer per connection
pub const OUTBOUND_BUFFER: usize = 64;

/// Process-local handle for one socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct Connection {
    user_id: Uuid,
    sender: mpsc::Sender<String>,
    rooms: HashSet<Uuid>,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    connections: HashMap<ConnectionId, Connection>,
    identities: HashMap<Uuid, HashSet<ConnectionId>>,
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
}

/// Shared registry; clones refer to the same state
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records an authenticated connection
    pub fn register(&self, user_id: Uuid, sender: mpsc::Sender<String>) -> ConnectionId {
        let mut state = self.write();
        state.next_id += 1;
        let id = ConnectionId(state.next_id);

        state.connections.insert(
            id,
            Connection {
                user_id,
                sender,
                rooms: HashSet::new(),
            },
        );
        state.identities.entry(user_id).or_default().insert(id);

        debug!(connection = %id, user_id = %user_id, "Connection registered");
        id
    }

    /// Drops a connection from every index; returns its identity
    pub fn unregister(&self, id: ConnectionId) -> Option<Uuid> {
        let mut state = self.write();
        let connection = state.connections.remove(&id)?;

        if let Some(ids) = state.identities.get_mut(&connection.user_id) {
            ids.remove(&id);
            if ids.is_empty() {
                state.identities.remove(&connection.user_id);
            }
        }

        for board_id in &connection.rooms {
            if let Some(members) = state.rooms.get_mut(board_id) {
                members.remove(&id);
                if members.is_empty() {
                    state.rooms.remove(board_id);
                }
            }
        }

        debug!(connection = %id, user_id = %connection.user_id, "Connection unregistered");
        Some(connection.user_id)
    }

    pub fn identity_of(&self, id: ConnectionId) -> Option<Uuid> {
        self.read().connections.get(&id).map(|c| c.user_id)
    }

    /// All live connections of `user_id`, in registration order
    pub fn connections_for(&self, user_id: Uuid) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .read()
            .identities
            .get(&user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    /// Adds a connection to a board room; idempotent
    ///
    /// Returns `false` only when the connection is unknown.
    pub fn join(&self, id: ConnectionId, board_id: Uuid) -> bool {
        let mut state = self.write();
        let Some(connection) = state.connections.get_mut(&id) else {
            return false;
        };
        connection.rooms.insert(board_id);
        state.rooms.entry(board_id).or_default().insert(id);
        true
    }

    /// Removes a connection from a board room; idempotent
    pub fn leave(&self, id: ConnectionId, board_id: Uuid) -> bool {
        let mut state = self.write();
        let Some(connection) = state.connections.get_mut(&id) else {
            return false;
        };
        connection.rooms.remove(&board_id);

        if let Some(members) = state.rooms.get_mut(&board_id) {
            members.remove(&id);
            if members.is_empty() {
                state.rooms.remove(&board_id);
            }
        }
        true
    }

    /// Removes every connection of `user_id` from a board room
    ///
    /// Returns how many connections were evicted.
    pub fn evict_from_board(&self, board_id: Uuid, user_id: Uuid) -> usize {
        let mut state = self.write();
        let state = &mut *state;
        let Some(ids) = state.identities.get(&user_id) else {
            return 0;
        };

        let mut evicted = 0;
        for id in ids {
            if let Some(connection) = state.connections.get_mut(id) {
                if connection.rooms.remove(&board_id) {
                    evicted += 1;
                }
            }
            if let Some(members) = state.rooms.get_mut(&board_id) {
                members.remove(id);
            }
        }
        if state.rooms.get(&board_id).is_some_and(HashSet::is_empty) {
            state.rooms.remove(&board_id);
        }

        debug!(board_id = %board_id, user_id = %user_id, evicted, "Identity evicted from board");
        evicted
    }

    pub fn room_size(&self, board_id: Uuid) -> usize {
        self.read().rooms.get(&board_id).map_or(0, HashSet::len)
    }

    /// Queues a raw frame on one connection
    pub fn send_to(&self, id: ConnectionId, frame: String) -> bool {
        let state = self.read();
        match state.connections.get(&id) {
            Some(connection) => connection.sender.try_send(frame).is_ok(),
            None => false,
        }
    }

    /// Sends to every connection in the room
    pub fn emit_to_board(&self, board_id: Uuid, event: &str, data: &Value) -> usize {
        self.emit_to_board_except(board_id, event, data, None)
    }

    /// Sends to every connection in the room except those of `exclude`
    ///
    /// Returns the number of connections the frame was queued on.
    pub fn emit_to_board_except(
        &self,
        board_id: Uuid,
        event: &str,
        data: &Value,
        exclude: Option<Uuid>,
    ) -> usize {
        let state = self.read();
        let Some(members) = state.rooms.get(&board_id) else {
            return 0;
        };

        let frame = event_frame(event, data);
        let mut delivered = 0;

        for id in members {
            let Some(connection) = state.connections.get(id) else {
                continue;
            };
            if Some(connection.user_id) == exclude {
                continue;
            }

            match connection.sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(connection = %id, board_id = %board_id, event, "Outbound buffer full, dropping frame");
                }
                // socket task already gone; unregister will follow
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        debug!(board_id = %board_id, event, delivered, "Board event emitted");
        delivered
    }

    /// Applies a [`BoardEvent`] with its own exclusion, then evicts the
    /// revoked identity, if any, so it sees nothing further from the board
    pub fn deliver(&self, event: &BoardEvent) -> usize {
        let delivered = self.emit_to_board_except(
            event.board_id,
            event.event.as_str(),
            &event.data,
            event.exclude_user,
        );
        if let Some(user_id) = event.revoke_user {
            self.evict_from_board(event.board_id, user_id);
        }
        delivered
    }
}
