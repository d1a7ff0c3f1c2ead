//! Unified error types.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("No auth token available for the private channel")]
    MissingToken,
}

/// WebSocket transport errors.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    Timeout,
}

/// Engine.IO / Socket.IO frame decoding errors.
#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("Empty frame")]
    Empty,

    #[error("Unknown engine packet type: {0}")]
    UnknownEnginePacket(char),

    #[error("Unknown socket packet type: {0}")]
    UnknownSocketPacket(char),

    #[error("Malformed event payload: {0}")]
    MalformedEvent(String),

    #[error("Malformed handshake: {0}")]
    MalformedHandshake(String),
}

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}
