//! # exchange-sync
//!
//! Keeps a client's view of one user's account and one market's public
//! data in sync with an exchange's real-time channels.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: newtypes, domain slices, typed events (always available)
//! 2. **Reduction**: classification, projections, session guard, notifications
//! 3. **WebSocket**: Socket.IO codec plus the `tokio-tungstenite` transport
//! 4. **Engine**: `SyncEngine` drives both channels and publishes snapshots
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use exchange_sync::prelude::*;
//! use std::sync::Arc;
//!
//! let session = Arc::new(StaticSession::new(token));
//! let (mut engine, mut notifications) = SyncEngine::new(SyncConfig::default(), session)?;
//! engine.start()?;
//!
//! let market = engine.market();
//! while let Some(update) = engine.next_update().await {
//!     println!("best bid: {:?}", market.borrow().orderbook.best_bid());
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Domain modules (vertical slices): types, wire types, conversions, state.
pub mod domain;

/// Typed inbound events.
pub mod event;

/// Unified error types.
pub mod error;

/// Network URL constants.
pub mod network;

/// Engine configuration.
pub mod config;

// ── Layer 2: Reduction ───────────────────────────────────────────────────────

/// Raw message → typed event.
pub mod classify;

/// Account and market projections.
pub mod projection;

/// Session guard and the auth collaborator trait.
pub mod session;

/// User-facing notifications.
pub mod notify;

// ── Layer 3: WebSocket ───────────────────────────────────────────────────────

/// WebSocket layer: codec, channel types, transport.
pub mod ws;

// ── Layer 4: Engine ──────────────────────────────────────────────────────────

/// `SyncEngine`, the primary entry point.
#[cfg(feature = "ws-native")]
pub mod engine;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{CurrencyCode, OrderId, Side, Symbol};

    // Domain types
    pub use crate::domain::balance::{BalanceSheet, Balances, CurrencyBalance};
    pub use crate::domain::notice::FundsNotice;
    pub use crate::domain::order::{Order, OrderType, UserOrders};
    pub use crate::domain::orderbook::{OrderbookSnapshot, PriceLevel};
    pub use crate::domain::trade::{Trade, TradeHistory};
    pub use crate::domain::user::UserProfile;

    // Events and reduction
    pub use crate::classify::classify;
    pub use crate::event::InboundEvent;
    pub use crate::notify::{dispatch, NotificationCategory, UserNotification};
    pub use crate::projection::{AccountProjection, Applied, MarketProjection};
    pub use crate::session::{AuthSession, SessionAction, SessionGuard, StaticSession};

    // Config + errors
    pub use crate::config::SyncConfig;
    pub use crate::error::{CodecError, ConfigError, SyncError, WsError};

    // Network
    pub use crate::network::DEFAULT_WS_URL;

    // WebSocket types
    pub use crate::ws::{
        ChannelEvent, ChannelKind, ConnectionState, RawMessage, ReconnectPolicy, Subscription,
    };
    #[cfg(feature = "ws-native")]
    pub use crate::ws::native::{ChannelHandle, Transport};

    // Engine
    #[cfg(feature = "ws-native")]
    pub use crate::engine::{
        ConnectionStates, NotificationReceiver, SyncEngine, SyncUpdate,
    };
}
