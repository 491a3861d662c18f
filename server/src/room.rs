use serde::Serialize;
use system::{ConnectionId, Member, Membership, RoomId, StrokeLog};

/// One collaborative canvas. Only ever touched while its lock is held.
pub struct Room {
    pub id: RoomId,
    pub membership: Membership,
    pub log: StrokeLog,
    closed: bool,
}

impl Room {
    pub fn new(id: RoomId, creator: Member) -> Self {
        Self {
            id,
            membership: Membership::new(creator),
            log: StrokeLog::new(),
            closed: false,
        }
    }

    /// A closed room has been removed from the registry; a task that was
    /// waiting on its lock must treat it as gone.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    pub fn username_of(&self, connection_id: ConnectionId) -> Option<&str> {
        self.membership
            .members()
            .iter()
            .find(|m| m.connection_id == connection_id)
            .map(|m| m.username.as_str())
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            creator: self
                .username_of(self.membership.creator())
                .map(str::to_owned),
            members: self.membership.names(),
            stroke_count: self.log.len(),
            pending_requests: self.membership.pending_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub creator: Option<String>,
    pub members: Vec<String>,
    pub stroke_count: usize,
    pub pending_requests: usize,
}
