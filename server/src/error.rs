use crate::board_store::BoardStoreError;
use system::{InputError, RoomId};
use thiserror::Error;

/// Failure of a single room operation. None of these are fatal: the worst
/// outcome is a rejection delivered to the originating connection.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Room not found")]
    RoomNotFound(RoomId),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("Not a member of room {0}")]
    NotAMember(RoomId),

    #[error("Already in room {0}")]
    AlreadyInRoom(RoomId),

    /// The requester withdrew, disconnected or was already answered.
    #[error("Join request not found")]
    JoinRequestNotFound,

    /// Dropped at the protocol boundary without a reply.
    #[error("Only the room creator may answer join requests")]
    Unauthorized,

    #[error("Board {0} has not been saved")]
    BoardNotFound(RoomId),

    #[error("No free board id")]
    NoFreeBoardId,

    /// Collaborator failure: logged, never shown to participants.
    #[error("Board store unavailable: {0}")]
    Store(#[from] BoardStoreError),
}

impl EngineError {
    /// Whether the originating connection is told about this error.
    pub fn is_reported(&self) -> bool {
        !matches!(self, EngineError::Unauthorized | EngineError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_reports_room_not_found_plainly() {
        assert_eq!(
            EngineError::RoomNotFound("R1".into()).to_string(),
            "Room not found"
        );
    }

    #[test]
    fn it_hides_unauthorized_and_store_failures() {
        assert!(!EngineError::Unauthorized.is_reported());
        assert!(!EngineError::Store(BoardStoreError::InvalidRoomId("..".into())).is_reported());
        assert!(EngineError::NotAMember("R1".into()).is_reported());
    }
}
