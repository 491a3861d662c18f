use crate::connection_tx_storage::{ConnectionState, ConnectionTx, ConnectionTxStorage};
use std::sync::{Mutex, MutexGuard, PoisonError};
use system::{ConnectionId, Membership, ServerEvent};

/// Fans events out to connections.
///
/// Ordering within a room comes from callers publishing while they hold the
/// room's lock; delivery itself never reorders and never blocks.
pub struct Dispatcher {
    connections: Mutex<ConnectionTxStorage>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(ConnectionTxStorage::new()),
        }
    }

    fn connections(&self) -> MutexGuard<'_, ConnectionTxStorage> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a connection and tells it its id.
    pub fn connect(&self, tx: ConnectionTx) -> ConnectionId {
        let mut connections = self.connections();
        let connection_id = connections.insert(tx);
        connections.send(connection_id, ServerEvent::Connected { connection_id });
        log::info!("Connection {} opened", connection_id);
        connection_id
    }

    pub fn disconnect(&self, connection_id: ConnectionId) -> Option<ConnectionState> {
        let state = self.connections().remove(connection_id);
        if state.is_some() {
            log::info!("Connection {} closed", connection_id);
        }
        state
    }

    pub fn is_connected(&self, connection_id: ConnectionId) -> bool {
        self.connections().contains(connection_id)
    }

    pub fn state(&self, connection_id: ConnectionId) -> Option<ConnectionState> {
        self.connections().state(connection_id).cloned()
    }

    pub fn set_state(&self, connection_id: ConnectionId, state: ConnectionState) {
        self.connections().set_state(connection_id, state);
    }

    /// Back to idle, but only if the connection is still attached to
    /// `room_id` (it may have moved on).
    pub fn release(&self, connection_id: ConnectionId, room_id: &str) {
        let mut connections = self.connections();
        let attached = match connections.state(connection_id) {
            Some(ConnectionState::Joined(current)) | Some(ConnectionState::Pending(current)) => {
                current == room_id
            }
            _ => false,
        };
        if attached {
            connections.set_state(connection_id, ConnectionState::Idle);
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections().len()
    }

    pub fn send(&self, to: ConnectionId, event: ServerEvent) -> bool {
        log::debug!("Egress to {}: {:?}", to, event);
        self.connections().send(to, event)
    }

    /// Delivers `event` to every member of the room, skipping `except` when
    /// given. Returns how many members it reached.
    pub fn publish(
        &self,
        membership: &Membership,
        event: &ServerEvent,
        except: Option<ConnectionId>,
    ) -> usize {
        log::debug!("Broadcast {:?} (except {:?})", event, except);
        let mut connections = self.connections();
        let mut reached = 0;
        for member in membership.members() {
            if Some(member.connection_id) == except {
                continue;
            }
            if connections.send(member.connection_id, event.clone()) {
                reached += 1;
            }
        }
        reached
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use system::Member;
    use tokio::sync::mpsc::{channel, Receiver};

    fn connect(dispatcher: &Dispatcher) -> (ConnectionId, Receiver<ServerEvent>) {
        let (tx, mut rx) = channel(8);
        let id = dispatcher.connect(tx);
        assert_eq!(
            rx.try_recv().ok(),
            Some(ServerEvent::Connected { connection_id: id })
        );
        (id, rx)
    }

    #[test]
    fn publish_skips_originator() {
        let dispatcher = Dispatcher::new();
        let (alice, mut alice_rx) = connect(&dispatcher);
        let (bob, mut bob_rx) = connect(&dispatcher);
        let mut membership = Membership::new(Member::new(alice, "Alice"));
        membership.admit(Member::new(bob, "Bob"));

        let event = ServerEvent::ClearBoard("R1".into());
        assert_eq!(dispatcher.publish(&membership, &event, Some(alice)), 1);
        assert!(alice_rx.try_recv().is_err());
        assert_eq!(bob_rx.try_recv().ok(), Some(event.clone()));

        assert_eq!(dispatcher.publish(&membership, &event, None), 2);
    }

    #[test]
    fn a_dead_member_does_not_block_others() {
        let dispatcher = Dispatcher::new();
        let (alice, alice_rx) = connect(&dispatcher);
        let (bob, mut bob_rx) = connect(&dispatcher);
        drop(alice_rx);
        let mut membership = Membership::new(Member::new(alice, "Alice"));
        membership.admit(Member::new(bob, "Bob"));

        let event = ServerEvent::UpdateMembers(vec!["Alice".into(), "Bob".into()]);
        assert_eq!(dispatcher.publish(&membership, &event, None), 1);
        assert_eq!(bob_rx.try_recv().ok(), Some(event));
    }

    #[test]
    fn release_only_detaches_from_matching_room() {
        let dispatcher = Dispatcher::new();
        let (alice, _rx) = connect(&dispatcher);
        dispatcher.set_state(alice, ConnectionState::Joined("R2".into()));

        dispatcher.release(alice, "R1");
        assert_eq!(
            dispatcher.state(alice),
            Some(ConnectionState::Joined("R2".into()))
        );
        dispatcher.release(alice, "R2");
        assert_eq!(dispatcher.state(alice), Some(ConnectionState::Idle));
    }
}
