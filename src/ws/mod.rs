//! WebSocket layer: channel messages, connection states, transport config.
//!
//! The transport is compile-time gated:
//! - `ws-native` feature: `tokio-tungstenite` (native.rs)
//!
//! This module defines the types shared by the codec, the transport and
//! the engine.

pub mod codec;
pub mod subscriptions;

#[cfg(feature = "ws-native")]
pub mod native;

use serde::{Deserialize, Serialize};

pub use subscriptions::Subscription;

// ─── ChannelKind ─────────────────────────────────────────────────────────────

/// Which logical channel a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Market data for one symbol.
    Public,
    /// Authenticated account data.
    Private,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChannelKind::Public => write!(f, "public"),
            ChannelKind::Private => write!(f, "private"),
        }
    }
}

// ─── RawMessage ──────────────────────────────────────────────────────────────

/// A decoded Socket.IO event before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub channel: ChannelKind,
    /// Event name (`orderbook`, `trades`, `user`, `orders`, `wallet`,
    /// `update`, `error`, …).
    pub event: String,
    pub payload: serde_json::Value,
}

impl RawMessage {
    pub fn new(channel: ChannelKind, event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            channel,
            event: event.into(),
            payload,
        }
    }
}

// ─── ConnectionState ─────────────────────────────────────────────────────────

/// Connection state of one channel.
///
/// `Closed` is terminal and only reached through an explicit close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Errored = 3,
    Closed = 4,
}

impl ConnectionState {
    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl From<u16> for ConnectionState {
    fn from(value: u16) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Errored,
            4 => ConnectionState::Closed,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Errored => "errored",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ─── ChannelEvent ────────────────────────────────────────────────────────────

/// Items yielded by a channel handle.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    State(ConnectionState),
    Message(RawMessage),
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Reconnect behavior after a transport-level disconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    /// Consecutive failed attempts before the channel gives up.
    pub max_attempts: u32,
    pub base_delay_ms: u32,
    pub max_delay_ms: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 10,
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (1-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> u32 {
        let exp = attempt.saturating_sub(1).min(10);
        self.base_delay_ms
            .saturating_mul(1u32 << exp)
            .min(self.max_delay_ms)
    }
}

/// Settings for one transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL; namespaces are appended per channel.
    pub url: String,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout_ms: u64,
    /// Capacity of each channel's event queue.
    pub event_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: crate::network::DEFAULT_WS_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout_ms: 30_000,
            event_capacity: 256,
        }
    }
}
