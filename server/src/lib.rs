pub extern crate actix_web;

pub mod activity;
mod admission;
pub mod board_store;
pub mod config;
pub mod connection;
mod connection_tx_storage;
mod dispatcher;
pub mod engine;
pub mod error;
pub mod handlers;
mod lifecycle;
mod registry;
pub mod room;

pub use activity::{
    Activity, ActivityKind, ActivityRecorder, JsonLinesActivityRecorder, LogActivityRecorder,
    MemoryActivityRecorder,
};
pub use board_store::{BoardStore, BoardStoreError, FileBoardStore, MemoryBoardStore};
pub use config::{Config, ConfigError};
pub use engine::Engine;
pub use error::EngineError;
pub use room::RoomSummary;
