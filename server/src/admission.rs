//! Room creation and the join-request state machine.
//!
//! Per (room, requester): requested, then either approved straight away
//! (the name is already a member, i.e. a reconnect) or pending the creator's
//! decision, then admitted or rejected.

use crate::activity::ActivityKind;
use crate::connection_tx_storage::ConnectionState;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::room::Room;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use system::serde_json::json;
use system::{
    validate_room_id, validate_username, ConnectionId, JoinRequest, Member, ServerEvent,
};

const REJECTED_BY_CREATOR: &str = "Request denied by creator";
const REJECTED_TIMED_OUT: &str = "Join request timed out";

impl Engine {
    /// A connection lives in one room at a time. Moving to another room while
    /// only pending elsewhere withdraws that earlier request.
    async fn enter(&self, from: ConnectionId, room_id: &str) -> Result<(), EngineError> {
        match self.dispatcher.state(from) {
            Some(ConnectionState::Joined(current)) if current != room_id => {
                Err(EngineError::AlreadyInRoom(current))
            }
            Some(ConnectionState::Pending(current)) if current != room_id => {
                if let Some(handle) = self.rooms.get(&current) {
                    let mut room = handle.lock().await;
                    if room.membership.take_pending(from).is_some() {
                        log::info!("Connection {} withdrew its request for {}", from, current);
                    }
                }
                self.dispatcher.release(from, &current);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Makes `from` a member under `username`: a no-op if it already is one,
    /// a rebind if the name is taken (reconnect), an append otherwise.
    fn seat(&self, room: &mut Room, from: ConnectionId, username: &str) {
        if room.membership.contains(from) {
            return;
        }
        match room.membership.rebind(username, from) {
            Some(previous) => {
                log::info!(
                    "{} reconnected to {} (connection {} -> {})",
                    username,
                    room.id,
                    previous,
                    from
                );
                self.dispatcher.release(previous, &room.id);
            }
            None => {
                room.membership.admit(Member::new(from, username));
            }
        }
        self.dispatcher
            .set_state(from, ConnectionState::Joined(room.id.clone()));
    }

    /// On an existing room only the creator's own name is taken as a
    /// reconnect. Anyone else is asking to join.
    pub(crate) async fn create_room(
        self: &Arc<Self>,
        from: ConnectionId,
        room_id: &str,
        username: &str,
    ) -> Result<(), EngineError> {
        validate_room_id(room_id)?;
        let username = validate_username(username)?;
        self.enter(from, room_id).await?;

        loop {
            let (handle, created) = self.rooms.get_or_create(room_id, || {
                Room::new(room_id.to_owned(), Member::new(from, username))
            });
            let mut room = handle.lock().await;
            if room.is_closed() {
                // destroyed while we waited; a fresh one can be created now
                continue;
            }

            if created {
                self.dispatcher
                    .set_state(from, ConnectionState::Joined(room.id.clone()));
                self.record(username, ActivityKind::Create, json!({ "roomId": room_id }));
            } else {
                let creator = room
                    .username_of(room.membership.creator())
                    .map(str::to_owned);
                if creator.as_deref() != Some(username) {
                    let pending = self.join_existing(&mut room, from, username);
                    drop(room);
                    if let Some(request_id) = pending {
                        self.schedule_expiry(room_id, from, request_id);
                    }
                    return Ok(());
                }
                room.membership.take_pending(from);
                // the creator role follows the rebound member
                self.seat(&mut room, from, username);
                log::info!("{} reconnected as creator of {}", username, room_id);
            }

            self.dispatcher.publish(
                &room.membership,
                &ServerEvent::UpdateMembers(room.membership.names()),
                None,
            );
            self.dispatcher
                .send(from, ServerEvent::LoadStrokes(room.log.snapshot()));
            return Ok(());
        }
    }

    pub(crate) async fn request_join(
        self: &Arc<Self>,
        from: ConnectionId,
        room_id: &str,
        username: &str,
    ) -> Result<(), EngineError> {
        validate_room_id(room_id)?;
        let username = validate_username(username)?;
        self.enter(from, room_id).await?;

        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        if room.is_closed() {
            return Err(EngineError::RoomNotFound(room_id.to_owned()));
        }
        let pending = self.join_existing(&mut room, from, username);
        drop(room);

        if let Some(request_id) = pending {
            self.schedule_expiry(room_id, from, request_id);
        }
        Ok(())
    }

    /// Materializes the room with the caller as creator if it does not exist,
    /// otherwise behaves like `request_join`. Of several concurrent callers
    /// exactly one creates the room.
    pub(crate) async fn join_or_create(
        self: &Arc<Self>,
        from: ConnectionId,
        room_id: &str,
        username: &str,
    ) -> Result<(), EngineError> {
        validate_room_id(room_id)?;
        let username = validate_username(username)?;
        self.enter(from, room_id).await?;

        loop {
            let (handle, created) = self.rooms.get_or_create(room_id, || {
                Room::new(room_id.to_owned(), Member::new(from, username))
            });
            let mut room = handle.lock().await;
            if room.is_closed() {
                continue;
            }

            if created {
                self.dispatcher
                    .set_state(from, ConnectionState::Joined(room.id.clone()));
                self.dispatcher.send(
                    from,
                    ServerEvent::RoomCreated {
                        room_id: room.id.clone(),
                    },
                );
                self.dispatcher
                    .send(from, ServerEvent::UpdateMembers(room.membership.names()));
                self.record(username, ActivityKind::Create, json!({ "roomId": room_id }));
                return Ok(());
            }

            let pending = self.join_existing(&mut room, from, username);
            drop(room);
            if let Some(request_id) = pending {
                self.schedule_expiry(room_id, from, request_id);
            }
            return Ok(());
        }
    }

    /// Returns the id of the request left pending for the creator, if any.
    fn join_existing(&self, room: &mut Room, from: ConnectionId, username: &str) -> Option<u64> {
        let rejoin =
            room.membership.contains(from) || room.membership.find_by_name(username).is_some();
        if rejoin {
            room.membership.take_pending(from);
            self.seat(room, from, username);
            self.dispatcher.send(
                from,
                ServerEvent::JoinApproved {
                    room_id: room.id.clone(),
                },
            );
            self.dispatcher
                .send(from, ServerEvent::LoadStrokes(room.log.snapshot()));
            self.dispatcher.publish(
                &room.membership,
                &ServerEvent::UpdateMembers(room.membership.names()),
                None,
            );
            self.record(
                username,
                ActivityKind::Join,
                json!({ "roomId": room.id, "rejoin": true }),
            );
            return None;
        }

        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        room.membership.add_pending(JoinRequest {
            request_id,
            requester: from,
            username: username.to_owned(),
        });
        self.dispatcher
            .set_state(from, ConnectionState::Pending(room.id.clone()));

        let creator = room.membership.creator();
        log::info!(
            "{} (connection {}) asks to join {}, waiting for connection {}",
            username,
            from,
            room.id,
            creator
        );
        self.dispatcher.send(
            creator,
            ServerEvent::JoinRequest {
                requester_ref: from,
                username: username.to_owned(),
                room_id: room.id.clone(),
            },
        );
        Some(request_id)
    }

    /// Only the current creator may decide. The requester's name is taken from
    /// its pending request, not from the creator's payload.
    pub(crate) async fn respond_join(
        &self,
        from: ConnectionId,
        room_id: &str,
        requester: ConnectionId,
        accept: bool,
    ) -> Result<(), EngineError> {
        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        if room.is_closed() {
            return Err(EngineError::RoomNotFound(room_id.to_owned()));
        }
        if !room.membership.is_creator(from) {
            return Err(EngineError::Unauthorized);
        }
        let request = room
            .membership
            .take_pending(requester)
            .ok_or(EngineError::JoinRequestNotFound)?;
        if !self.dispatcher.is_connected(requester) {
            return Err(EngineError::JoinRequestNotFound);
        }

        if accept {
            self.seat(&mut room, requester, &request.username);
            self.dispatcher.send(
                requester,
                ServerEvent::JoinApproved {
                    room_id: room.id.clone(),
                },
            );
            self.dispatcher.publish(
                &room.membership,
                &ServerEvent::UpdateMembers(room.membership.names()),
                None,
            );
            // taken under the same lock as the admission
            self.dispatcher
                .send(requester, ServerEvent::LoadStrokes(room.log.snapshot()));
            self.record(
                &request.username,
                ActivityKind::Join,
                json!({ "roomId": room_id, "rejoin": false }),
            );
            log::info!("{} admitted to {}", request.username, room_id);
        } else {
            self.dispatcher.release(requester, room_id);
            self.dispatcher.send(
                requester,
                ServerEvent::JoinRejected(REJECTED_BY_CREATOR.to_string()),
            );
            log::info!("{} rejected from {}", request.username, room_id);
        }
        Ok(())
    }

    fn schedule_expiry(self: &Arc<Self>, room_id: &str, requester: ConnectionId, request_id: u64) {
        let timeout = match self.join_request_timeout {
            Some(timeout) => timeout,
            None => return,
        };
        let engine = Arc::clone(self);
        let room_id = room_id.to_owned();
        tokio::spawn(async move {
            tokio::time::delay_for(timeout).await;
            engine
                .expire_join_request(&room_id, requester, request_id)
                .await;
        });
    }

    pub(crate) async fn expire_join_request(
        &self,
        room_id: &str,
        requester: ConnectionId,
        request_id: u64,
    ) {
        let handle = match self.rooms.get(room_id) {
            Some(handle) => handle,
            None => return,
        };
        let mut room = handle.lock().await;
        if room.is_closed() {
            return;
        }
        if let Some(request) = room.membership.expire_pending(requester, request_id) {
            log::info!(
                "Join request of {} for {} timed out",
                request.username,
                room_id
            );
            self.dispatcher.release(requester, room_id);
            self.dispatcher.send(
                requester,
                ServerEvent::JoinRejected(REJECTED_TIMED_OUT.to_string()),
            );
        }
    }
}
