use std::collections::HashMap;
use std::num::Wrapping;
use system::{ConnectionId, RoomId, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ServerEvent>;

/// Where a connection currently stands. A connection is in at most one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Pending(RoomId),
    Joined(RoomId),
}

struct ConnectionEntry {
    tx: ConnectionTx,
    state: ConnectionState,
}

pub struct ConnectionTxStorage {
    connection_id_source: Wrapping<ConnectionId>,
    entries: HashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_id_source: Wrapping(0),
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, tx: ConnectionTx) -> ConnectionId {
        let connection_id = self.new_connection_id();
        self.entries.insert(
            connection_id,
            ConnectionEntry {
                tx,
                state: ConnectionState::Idle,
            },
        );
        connection_id
    }

    /// Never waits: a full queue means a slow client, and that client alone
    /// misses the event.
    pub fn send(&mut self, to: ConnectionId, event: ServerEvent) -> bool {
        if let Some(entry) = self.entries.get_mut(&to) {
            match entry.tx.try_send(event) {
                Ok(()) => true,
                Err(TrySendError::Full(event)) => {
                    log::warn!("Dropping {:?} for slow connection {}", event, to);
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!("Connection {} is closing, event dropped", to);
                    false
                }
            }
        } else {
            log::debug!("Connection {} is gone, event dropped", to);
            false
        }
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<ConnectionState> {
        self.entries
            .remove(&connection_id)
            .map(|entry| entry.state)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.entries.contains_key(&connection_id)
    }

    pub fn state(&self, connection_id: ConnectionId) -> Option<&ConnectionState> {
        self.entries.get(&connection_id).map(|entry| &entry.state)
    }

    pub fn set_state(&mut self, connection_id: ConnectionId, state: ConnectionState) {
        if let Some(entry) = self.entries.get_mut(&connection_id) {
            entry.state = state;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn new_connection_id(&mut self) -> ConnectionId {
        loop {
            self.connection_id_source += Wrapping(1);
            let candidate = self.connection_id_source.0;
            if candidate != 0 && !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}
