use crate::activity::ActivityKind;
use crate::connection_tx_storage::ConnectionState;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::room::Room;
use system::serde_json::json;
use system::{ConnectionId, Departure, ServerEvent};

impl Engine {
    pub(crate) async fn leave_room(
        &self,
        from: ConnectionId,
        room_id: &str,
    ) -> Result<(), EngineError> {
        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        if room.is_closed() {
            return Err(EngineError::RoomNotFound(room_id.to_owned()));
        }
        let departure = room
            .membership
            .remove(from)
            .ok_or_else(|| EngineError::NotAMember(room_id.to_owned()))?;
        self.dispatcher.release(from, room_id);
        log::info!("{} left {}", departure.member.username, room_id);

        self.after_departure(&mut room, &departure, true);
        self.record(
            &departure.member.username,
            ActivityKind::Leave,
            json!({ "roomId": room_id, "reason": "leave" }),
        );
        Ok(())
    }

    /// Tells whoever remains, hands over the creator role, and tears the room
    /// down once nobody is left.
    fn after_departure(&self, room: &mut Room, departure: &Departure, explicit: bool) {
        if !room.membership.is_empty() {
            self.dispatcher.publish(
                &room.membership,
                &ServerEvent::UpdateMembers(room.membership.names()),
                None,
            );
        }
        if let Some(new_creator) = departure.new_creator {
            log::info!("Connection {} is now creator of {}", new_creator, room.id);
            self.dispatcher.send(new_creator, ServerEvent::YouAreNowCreator);
        }
        if explicit && !room.membership.is_empty() {
            self.dispatcher.send(
                room.membership.creator(),
                ServerEvent::MemberLeft(departure.member.username.clone()),
            );
        }

        if self.rooms.destroy_if_empty(room) {
            let reason = EngineError::RoomNotFound(room.id.clone()).to_string();
            for request in room.membership.drain_pending() {
                self.dispatcher.release(request.requester, &room.id);
                self.dispatcher
                    .send(request.requester, ServerEvent::JoinRejected(reason.clone()));
            }
        }
    }

    /// Runs once a connection's transport is gone and its worker has
    /// drained. Behaves like leaving every room it was in, without the
    /// `member-left` notice.
    pub async fn disconnect(&self, from: ConnectionId) {
        let state = match self.dispatcher.disconnect(from) {
            Some(state) => state,
            None => return,
        };

        match state {
            ConnectionState::Idle => {}
            ConnectionState::Pending(room_id) => {
                let handle = match self.rooms.get(&room_id) {
                    Some(handle) => handle,
                    None => return,
                };
                let mut room = handle.lock().await;
                if room.is_closed() {
                    return;
                }
                if room.membership.take_pending(from).is_some() {
                    log::info!(
                        "Connection {} dropped its request for {}",
                        from,
                        room_id
                    );
                }
                // admitted while the transport was going away
                if let Some(departure) = room.membership.remove(from) {
                    log::info!(
                        "{} disconnected from {} right after admission",
                        departure.member.username,
                        room_id
                    );
                    self.after_departure(&mut room, &departure, false);
                    self.record(
                        &departure.member.username,
                        ActivityKind::Leave,
                        json!({ "roomId": room_id, "reason": "disconnect" }),
                    );
                }
            }
            ConnectionState::Joined(room_id) => {
                let handle = match self.rooms.get(&room_id) {
                    Some(handle) => handle,
                    None => return,
                };
                let mut room = handle.lock().await;
                if room.is_closed() {
                    return;
                }
                // already replaced by a reconnect under the same name
                let departure = match room.membership.remove(from) {
                    Some(departure) => departure,
                    None => return,
                };
                log::info!(
                    "{} disconnected from {}",
                    departure.member.username,
                    room_id
                );
                self.after_departure(&mut room, &departure, false);
                self.record(
                    &departure.member.username,
                    ActivityKind::Leave,
                    json!({ "roomId": room_id, "reason": "disconnect" }),
                );
            }
        }
    }
}
