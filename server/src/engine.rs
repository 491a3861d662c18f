use crate::activity::{Activity, ActivityKind, ActivityRecorder};
use crate::board_store::BoardStore;
use crate::config::{Config, DEFAULT_CONNECTION_BUFFER};
use crate::connection_tx_storage::ConnectionTx;
use crate::dispatcher::Dispatcher;
use crate::error::EngineError;
use crate::registry::{RoomHandle, RoomRegistry};
use crate::room::{Room, RoomSummary};
use rand::Rng;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use system::serde_json::{json, Value};
use system::{validate_room_id, ClientCommand, ConnectionId, RoomId, ServerEvent, StrokeOp};

/// The collaborative session engine.
///
/// Every connection gets one worker that feeds its commands here one at a
/// time. Anything touching a room runs under that room's lock, which makes
/// each room a serial queue while different rooms proceed in parallel.
pub struct Engine {
    pub(crate) rooms: RoomRegistry,
    pub(crate) dispatcher: Dispatcher,
    activity: Arc<dyn ActivityRecorder>,
    boards: Arc<dyn BoardStore>,
    pub(crate) join_request_timeout: Option<Duration>,
    pub(crate) next_request_id: AtomicU64,
    connection_buffer: usize,
}

impl Engine {
    pub fn new(activity: Arc<dyn ActivityRecorder>, boards: Arc<dyn BoardStore>) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            dispatcher: Dispatcher::new(),
            activity,
            boards,
            join_request_timeout: None,
            next_request_id: AtomicU64::new(1),
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }

    pub fn from_config(
        config: &Config,
        activity: Arc<dyn ActivityRecorder>,
        boards: Arc<dyn BoardStore>,
    ) -> Self {
        Self::new(activity, boards)
            .with_join_request_timeout(config.join_request_timeout)
            .with_connection_buffer(config.connection_buffer)
    }

    pub fn with_join_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.join_request_timeout = timeout;
        self
    }

    pub fn with_connection_buffer(mut self, connection_buffer: usize) -> Self {
        self.connection_buffer = connection_buffer.max(1);
        self
    }

    pub fn connection_buffer(&self) -> usize {
        self.connection_buffer
    }

    pub fn board_store(&self) -> &Arc<dyn BoardStore> {
        &self.boards
    }

    /// Registers a connection's outbound queue. The connection is told its id
    /// with a `connected` event.
    pub fn connect(&self, tx: ConnectionTx) -> ConnectionId {
        self.dispatcher.connect(tx)
    }

    pub fn connection_count(&self) -> usize {
        self.dispatcher.connection_count()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub async fn room_summary(&self, room_id: &str) -> Option<RoomSummary> {
        let handle = self.rooms.get(room_id)?;
        let room = handle.lock().await;
        if room.is_closed() {
            None
        } else {
            Some(room.summary())
        }
    }

    pub async fn room_summaries(&self) -> Vec<RoomSummary> {
        let mut result = Vec::new();
        for handle in self.rooms.handles() {
            let room = handle.lock().await;
            if !room.is_closed() {
                result.push(room.summary());
            }
        }
        result.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        result
    }

    pub async fn handle_command(self: &Arc<Self>, from: ConnectionId, command: ClientCommand) {
        if !self.dispatcher.is_connected(from) {
            log::warn!("Ignoring {} from unknown connection {}", command.name(), from);
            return;
        }
        log::debug!("Ingress from {}: {:?}", from, command);

        let name = command.name();
        let joining = matches!(
            command,
            ClientCommand::RequestJoin { .. } | ClientCommand::JoinOrCreate { .. }
        );
        let result = match command {
            ClientCommand::CreateRoom { room_id, username } => {
                self.create_room(from, &room_id, &username).await
            }
            ClientCommand::RequestJoin { room_id, username } => {
                self.request_join(from, &room_id, &username).await
            }
            ClientCommand::JoinOrCreate { room_id, username } => {
                self.join_or_create(from, &room_id, &username).await
            }
            ClientCommand::RespondJoin {
                room_id,
                requester_ref,
                accept,
                ..
            } => {
                self.respond_join(from, &room_id, requester_ref, accept)
                    .await
            }
            ClientCommand::DrawStroke { room_id, stroke } => {
                self.draw_stroke(from, &room_id, stroke).await
            }
            ClientCommand::ClearBoard { room_id } => self.clear_board(from, &room_id).await,
            ClientCommand::Undo { room_id } => self.undo(from, &room_id).await,
            ClientCommand::Redo { room_id } => self.redo(from, &room_id).await,
            ClientCommand::LeaveRoom { room_id, .. } => self.leave_room(from, &room_id).await,
            ClientCommand::SaveBoard { room_id } => self.save_board(from, &room_id).await,
            ClientCommand::LoadBoard { room_id } => self.load_board(from, &room_id).await,
        };

        if let Err(error) = result {
            self.report(from, name, joining, error);
        }
    }

    fn report(&self, from: ConnectionId, name: &str, joining: bool, error: EngineError) {
        match error {
            EngineError::Unauthorized => {
                log::warn!("Ignoring {} from connection {}: {}", name, from, error)
            }
            EngineError::Store(ref e) => {
                log::error!("Board store failed during {} from {}: {}", name, from, e)
            }
            error if joining => {
                self.dispatcher
                    .send(from, ServerEvent::JoinRejected(error.to_string()));
            }
            error => {
                log::info!("Rejected {} from {}: {}", name, from, error);
                self.dispatcher.send(from, ServerEvent::Error(error.to_string()));
            }
        }
    }

    pub(crate) fn room(&self, room_id: &str) -> Result<RoomHandle, EngineError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_owned()))
    }

    /// Fire-and-forget.
    pub(crate) fn record(&self, user: &str, kind: ActivityKind, details: Value) {
        self.activity.record(Activity::new(user, kind, details));
    }

    async fn draw_stroke(
        &self,
        from: ConnectionId,
        room_id: &str,
        stroke: StrokeOp,
    ) -> Result<(), EngineError> {
        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        let username = ensure_member(&room, from)?;

        let details = stroke_details(room_id, &stroke);
        room.log.append(stroke.clone());
        self.dispatcher.publish(
            &room.membership,
            &ServerEvent::DrawStroke {
                room_id: room.id.clone(),
                stroke,
            },
            Some(from),
        );
        self.record(&username, ActivityKind::Draw, details);
        Ok(())
    }

    async fn clear_board(&self, from: ConnectionId, room_id: &str) -> Result<(), EngineError> {
        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        let username = ensure_member(&room, from)?;

        room.log.clear();
        self.dispatcher.publish(
            &room.membership,
            &ServerEvent::ClearBoard(room.id.clone()),
            Some(from),
        );
        self.record(&username, ActivityKind::Clear, json!({ "roomId": room_id }));
        Ok(())
    }

    async fn undo(&self, from: ConnectionId, room_id: &str) -> Result<(), EngineError> {
        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        let username = ensure_member(&room, from)?;

        if room.log.undo() {
            self.resync_all(&room);
            self.record(
                &username,
                ActivityKind::Undo,
                json!({ "roomId": room_id, "remainingStrokes": room.log.len() }),
            );
        }
        Ok(())
    }

    async fn redo(&self, from: ConnectionId, room_id: &str) -> Result<(), EngineError> {
        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        let username = ensure_member(&room, from)?;

        if room.log.redo() {
            self.resync_all(&room);
            self.record(
                &username,
                ActivityKind::Redo,
                json!({ "roomId": room_id, "totalStrokes": room.log.len() }),
            );
        }
        Ok(())
    }

    /// The store is called without holding the room lock, so a slow disk
    /// never stalls drawing.
    async fn save_board(&self, from: ConnectionId, room_id: &str) -> Result<(), EngineError> {
        let (username, strokes) = {
            let handle = self.room(room_id)?;
            let room = handle.lock().await;
            let username = ensure_member(&room, from)?;
            let strokes = room.log.snapshot();
            (username, strokes)
        };

        self.boards.save(room_id, &strokes).await?;
        self.dispatcher.send(
            from,
            ServerEvent::BoardSaved {
                room_id: room_id.to_owned(),
                stroke_count: strokes.len(),
            },
        );
        self.record(
            &username,
            ActivityKind::Save,
            json!({ "roomId": room_id, "strokeCount": strokes.len() }),
        );
        Ok(())
    }

    async fn load_board(&self, from: ConnectionId, room_id: &str) -> Result<(), EngineError> {
        {
            let handle = self.room(room_id)?;
            let room = handle.lock().await;
            ensure_member(&room, from)?;
        }

        let strokes = self
            .boards
            .load(room_id)
            .await?
            .ok_or_else(|| EngineError::BoardNotFound(room_id.to_owned()))?;

        // membership may have changed while the store was busy
        let handle = self.room(room_id)?;
        let mut room = handle.lock().await;
        let username = ensure_member(&room, from)?;
        let stroke_count = strokes.len();
        room.log.replace(strokes);
        self.resync_all(&room);
        self.record(
            &username,
            ActivityKind::Load,
            json!({ "roomId": room_id, "strokeCount": stroke_count }),
        );
        Ok(())
    }

    /// Reserves a fresh six-digit board id by saving an empty board under it.
    pub async fn create_board(&self, username: &str) -> Result<RoomId, EngineError> {
        for _ in 0..MAX_BOARD_ID_ATTEMPTS {
            let room_id = random_board_id();
            if self.rooms.get(&room_id).is_some() || self.boards.load(&room_id).await?.is_some() {
                continue;
            }
            self.boards.save(&room_id, &[]).await?;
            self.record(
                username,
                ActivityKind::Create,
                json!({ "roomId": room_id, "source": "http" }),
            );
            return Ok(room_id);
        }
        Err(EngineError::NoFreeBoardId)
    }

    /// Overwrites a saved board without touching the live room of the same
    /// id. Returns the stored stroke count.
    pub async fn store_board(
        &self,
        room_id: &str,
        username: &str,
        strokes: &[StrokeOp],
    ) -> Result<usize, EngineError> {
        validate_room_id(room_id)?;
        self.boards.save(room_id, strokes).await?;
        self.record(
            username,
            ActivityKind::Save,
            json!({ "roomId": room_id, "strokeCount": strokes.len(), "source": "http" }),
        );
        Ok(strokes.len())
    }

    fn resync_all(&self, room: &Room) {
        self.dispatcher.publish(
            &room.membership,
            &ServerEvent::LoadStrokes(room.log.snapshot()),
            None,
        );
    }
}

const MAX_BOARD_ID_ATTEMPTS: usize = 16;

fn random_board_id() -> RoomId {
    rand::thread_rng().gen_range(100_000..1_000_000u32).to_string()
}

/// Returns the caller's display name.
pub(crate) fn ensure_member(room: &Room, from: ConnectionId) -> Result<String, EngineError> {
    if room.is_closed() {
        return Err(EngineError::RoomNotFound(room.id.clone()));
    }
    room.username_of(from)
        .map(str::to_owned)
        .ok_or_else(|| EngineError::NotAMember(room.id.clone()))
}

fn stroke_details(room_id: &str, stroke: &StrokeOp) -> Value {
    match stroke {
        StrokeOp::Line {
            color,
            stroke_width,
            ..
        } => json!({
            "roomId": room_id,
            "tool": stroke.tool(),
            "color": color,
            "strokeWidth": stroke_width,
            "textLength": 0,
        }),
        StrokeOp::Text {
            text,
            color,
            stroke_width,
            ..
        } => json!({
            "roomId": room_id,
            "tool": stroke.tool(),
            "color": color,
            "strokeWidth": stroke_width,
            "textLength": text.chars().count(),
        }),
    }
}
