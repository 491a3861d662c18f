//! Board snapshots, saved and loaded only on explicit request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use system::{bincode, validate_room_id, RoomId, StrokeOp};
use thiserror::Error;
use tokio::fs;

const BOARD_FILE_EXTENSION: &str = "board";

#[derive(Debug, Error)]
pub enum BoardStoreError {
    #[error("invalid room id {0:?}")]
    InvalidRoomId(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt board file: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Last write wins; there is no history.
#[async_trait]
pub trait BoardStore: Send + Sync {
    async fn save(&self, room_id: &str, strokes: &[StrokeOp]) -> Result<(), BoardStoreError>;

    async fn load(&self, room_id: &str) -> Result<Option<Vec<StrokeOp>>, BoardStoreError>;

    async fn list(&self) -> Result<Vec<RoomId>, BoardStoreError>;
}

#[derive(Serialize, Deserialize)]
struct BoardFile {
    room_id: RoomId,
    strokes: Vec<StrokeOp>,
}

/// One bincode file per board, `<room id>.board`, in a single directory.
pub struct FileBoardStore {
    dir: PathBuf,
    /// Gives every in-flight write its own temporary file.
    write_seq: AtomicU64,
}

impl FileBoardStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_seq: AtomicU64::new(0),
        }
    }

    fn file_path(&self, room_id: &str) -> Result<PathBuf, BoardStoreError> {
        validate_room_id(room_id).map_err(|_| BoardStoreError::InvalidRoomId(room_id.into()))?;
        Ok(self
            .dir
            .join(format!("{}.{}", room_id, BOARD_FILE_EXTENSION)))
    }
}

#[async_trait]
impl BoardStore for FileBoardStore {
    async fn save(&self, room_id: &str, strokes: &[StrokeOp]) -> Result<(), BoardStoreError> {
        let path = self.file_path(room_id)?;
        let content = bincode::serialize(&BoardFile {
            room_id: room_id.to_owned(),
            strokes: strokes.to_vec(),
        })?;
        fs::create_dir_all(&self.dir).await?;
        // write-then-rename so a reader never sees a half-written board
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.dir.join(format!("{}.{}.tmp", room_id, seq));
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path).await?;
        log::info!("Board {} saved ({} strokes)", room_id, strokes.len());
        Ok(())
    }

    async fn load(&self, room_id: &str) -> Result<Option<Vec<StrokeOp>>, BoardStoreError> {
        let path = self.file_path(room_id)?;
        match fs::read(&path).await {
            Ok(content) => {
                let board: BoardFile = bincode::deserialize(&content)?;
                Ok(Some(board.strokes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<RoomId>, BoardStoreError> {
        let mut result = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(result),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOARD_FILE_EXTENSION) {
                continue;
            }
            if let Some(room_id) = path.file_stem().and_then(|stem| stem.to_str()) {
                if validate_room_id(room_id).is_ok() {
                    result.push(room_id.to_owned());
                }
            }
        }
        result.sort();
        Ok(result)
    }
}

#[derive(Default)]
pub struct MemoryBoardStore {
    boards: Mutex<HashMap<RoomId, Vec<StrokeOp>>>,
}

impl MemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BoardStore for MemoryBoardStore {
    async fn save(&self, room_id: &str, strokes: &[StrokeOp]) -> Result<(), BoardStoreError> {
        self.boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room_id.to_owned(), strokes.to_vec());
        Ok(())
    }

    async fn load(&self, room_id: &str) -> Result<Option<Vec<StrokeOp>>, BoardStoreError> {
        Ok(self
            .boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room_id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<RoomId>, BoardStoreError> {
        let mut ids: Vec<RoomId> = self
            .boards
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        Ok(ids)
    }
}
