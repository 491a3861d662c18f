use crate::message::{ClientCommand, ServerEvent};
use bincode::Options;
use thiserror::Error;

/// Upper bound for a single binary frame, so a forged length prefix cannot
/// make the decoder allocate unbounded memory.
pub const MAX_BINARY_MESSAGE: u64 = 1 << 20;

/// Text frames carry JSON, binary frames carry bincode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Bincode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed json message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed binary message: {0}")]
    Bincode(#[from] bincode::Error),
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_BINARY_MESSAGE)
}

pub fn decode_command(frame: &Frame) -> Result<ClientCommand, CodecError> {
    match frame {
        Frame::Text(text) => Ok(serde_json::from_str(text)?),
        Frame::Binary(bytes) => Ok(bincode_options().deserialize(bytes)?),
    }
}

pub fn encode_event(event: &ServerEvent, format: WireFormat) -> Result<Frame, CodecError> {
    match format {
        WireFormat::Json => Ok(Frame::Text(serde_json::to_string(event)?)),
        WireFormat::Bincode => Ok(Frame::Binary(bincode_options().serialize(event)?)),
    }
}

/// Client-side counterpart of `encode_event`, used by tools and tests.
pub fn encode_command(command: &ClientCommand, format: WireFormat) -> Result<Frame, CodecError> {
    match format {
        WireFormat::Json => Ok(Frame::Text(serde_json::to_string(command)?)),
        WireFormat::Bincode => Ok(Frame::Binary(bincode_options().serialize(command)?)),
    }
}

pub fn decode_event(frame: &Frame) -> Result<ServerEvent, CodecError> {
    match frame {
        Frame::Text(text) => Ok(serde_json::from_str(text)?),
        Frame::Binary(bytes) => Ok(bincode_options().deserialize(bytes)?),
    }
}
