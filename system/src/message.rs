use serde::{Deserialize, Serialize};

pub type ConnectionId = u32;
pub type RoomId = String;

/// One atomic canvas mutation. A continuous pen stroke arrives as many `Line`
/// point samples, so the log is a flat sequence of points rather than paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeOp {
    #[serde(rename_all = "camelCase")]
    Line {
        x: f32,
        y: f32,
        color: String,
        stroke_width: f32,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        x: f32,
        y: f32,
        text: String,
        color: String,
        stroke_width: f32,
    },
}

impl StrokeOp {
    pub fn line(x: f32, y: f32, color: impl Into<String>, stroke_width: f32) -> Self {
        Self::Line {
            x,
            y,
            color: color.into(),
            stroke_width,
        }
    }

    pub fn text(
        x: f32,
        y: f32,
        text: impl Into<String>,
        color: impl Into<String>,
        stroke_width: f32,
    ) -> Self {
        Self::Text {
            x,
            y,
            text: text.into(),
            color: color.into(),
            stroke_width,
        }
    }

    /// Tool name reported to the activity recorder.
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Line { .. } => "line",
            Self::Text { .. } => "text",
        }
    }
}

/// Client -> engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    CreateRoom { room_id: RoomId, username: String },
    #[serde(rename_all = "camelCase")]
    RequestJoin { room_id: RoomId, username: String },
    #[serde(rename_all = "camelCase")]
    JoinOrCreate { room_id: RoomId, username: String },
    #[serde(rename_all = "camelCase")]
    RespondJoin {
        room_id: RoomId,
        requester_ref: ConnectionId,
        accept: bool,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    DrawStroke { room_id: RoomId, stroke: StrokeOp },
    #[serde(rename_all = "camelCase")]
    ClearBoard { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    Undo { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    Redo { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId, username: String },
    #[serde(rename_all = "camelCase")]
    SaveBoard { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    LoadBoard { room_id: RoomId },
}

impl ClientCommand {
    pub fn room_id(&self) -> &str {
        match self {
            Self::CreateRoom { room_id, .. }
            | Self::RequestJoin { room_id, .. }
            | Self::JoinOrCreate { room_id, .. }
            | Self::RespondJoin { room_id, .. }
            | Self::DrawStroke { room_id, .. }
            | Self::ClearBoard { room_id }
            | Self::Undo { room_id }
            | Self::Redo { room_id }
            | Self::LeaveRoom { room_id, .. }
            | Self::SaveBoard { room_id }
            | Self::LoadBoard { room_id } => room_id,
        }
    }

    /// Event name as it appears on the wire, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::RequestJoin { .. } => "request-join",
            Self::JoinOrCreate { .. } => "join-or-create",
            Self::RespondJoin { .. } => "respond-join",
            Self::DrawStroke { .. } => "draw-stroke",
            Self::ClearBoard { .. } => "clear-board",
            Self::Undo { .. } => "undo",
            Self::Redo { .. } => "redo",
            Self::LeaveRoom { .. } => "leave-room",
            Self::SaveBoard { .. } => "save-board",
            Self::LoadBoard { .. } => "load-board",
        }
    }
}

/// Engine -> client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    JoinApproved { room_id: RoomId },
    JoinRejected(String),
    /// Delivered to the creator only.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        requester_ref: ConnectionId,
        username: String,
        room_id: RoomId,
    },
    UpdateMembers(Vec<String>),
    LoadStrokes(Vec<StrokeOp>),
    #[serde(rename_all = "camelCase")]
    DrawStroke { room_id: RoomId, stroke: StrokeOp },
    ClearBoard(RoomId),
    MemberLeft(String),
    YouAreNowCreator,
    #[serde(rename_all = "camelCase")]
    BoardSaved { room_id: RoomId, stroke_count: usize },
    Error(String),
}
