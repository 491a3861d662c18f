use thiserror::Error;

pub const MAX_ROOM_ID_LEN: usize = 64;
pub const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("room id must not be empty")]
    EmptyRoomId,
    #[error("room id is longer than {} characters", MAX_ROOM_ID_LEN)]
    RoomIdTooLong,
    #[error("room id contains invalid character {0:?}")]
    RoomIdInvalidChar(char),
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username is longer than {} characters", MAX_USERNAME_LEN)]
    UsernameTooLong,
}

/// Room ids end up in board file names, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_room_id(room_id: &str) -> Result<(), InputError> {
    if room_id.is_empty() {
        return Err(InputError::EmptyRoomId);
    }
    if room_id.chars().count() > MAX_ROOM_ID_LEN {
        return Err(InputError::RoomIdTooLong);
    }
    match room_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        Some(c) => Err(InputError::RoomIdInvalidChar(c)),
        None => Ok(()),
    }
}

/// Returns the trimmed name.
pub fn validate_username(username: &str) -> Result<&str, InputError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        Err(InputError::EmptyUsername)
    } else if trimmed.chars().count() > MAX_USERNAME_LEN {
        Err(InputError::UsernameTooLong)
    } else {
        Ok(trimmed)
    }
}
