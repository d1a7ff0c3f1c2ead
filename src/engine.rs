//! Orchestration: channels in, projections and notifications out.
//!
//! The engine owns both channel handles and is the only writer of the
//! account and market projections. Events are applied one at a time in
//! the order they are received; readers observe committed snapshots via
//! `tokio::sync::watch`.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::classify::classify;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::event::InboundEvent;
use crate::notify::{self, UserNotification};
use crate::projection::{AccountProjection, Applied, MarketProjection};
use crate::session::{AuthSession, SessionAction, SessionGuard};
use crate::shared::Symbol;
use crate::ws::native::{ChannelHandle, Transport};
use crate::ws::{ChannelEvent, ChannelKind, ConnectionState};

/// Receiving end for user notifications.
pub type NotificationReceiver = mpsc::Receiver<UserNotification>;

/// What one call to [`SyncEngine::next_update`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    /// A channel changed connection state.
    Connection {
        channel: ChannelKind,
        state: ConnectionState,
    },
    /// An event was routed to its projection.
    Applied {
        channel: ChannelKind,
        kind: &'static str,
        outcome: Applied,
    },
    /// A message that was not understood.
    Discarded { channel: ChannelKind, reason: String },
    /// The server denied the session. The private channel is closed and
    /// account state cleared.
    SessionTerminated { reason: String },
    /// A channel stopped delivering (closed or out of reconnect attempts).
    ChannelEnded {
        channel: ChannelKind,
        state: ConnectionState,
    },
}

/// Last known state of each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStates {
    pub public: ConnectionState,
    pub private: ConnectionState,
}

impl Default for ConnectionStates {
    fn default() -> Self {
        Self {
            public: ConnectionState::Disconnected,
            private: ConnectionState::Disconnected,
        }
    }
}

impl ConnectionStates {
    fn set(&mut self, channel: ChannelKind, state: ConnectionState) {
        match channel {
            ChannelKind::Public => self.public = state,
            ChannelKind::Private => self.private = state,
        }
    }
}

/// Keeps the local account and market views in sync with the server.
///
/// ```rust,ignore
/// let session = Arc::new(StaticSession::new(token));
/// let (mut engine, mut notifications) = SyncEngine::new(SyncConfig::default(), session)?;
/// engine.start()?;
/// let account = engine.account();
///
/// while let Some(update) = engine.next_update().await {
///     println!("{:?} open orders: {}", update, account.borrow().orders.len());
/// }
/// ```
pub struct SyncEngine {
    config: SyncConfig,
    transport: Transport,
    session: Arc<dyn AuthSession>,
    guard: SessionGuard,
    public: Option<ChannelHandle>,
    private: Option<ChannelHandle>,
    account_tx: watch::Sender<AccountProjection>,
    market_tx: watch::Sender<MarketProjection>,
    notification_tx: mpsc::Sender<UserNotification>,
    states: ConnectionStates,
}

impl SyncEngine {
    /// Build an engine. Nothing connects until [`start`](Self::start).
    pub fn new(
        config: SyncConfig,
        session: Arc<dyn AuthSession>,
    ) -> Result<(Self, NotificationReceiver), SyncError> {
        config.validate()?;

        let (account_tx, _) =
            watch::channel(AccountProjection::new(config.account_trade_retention));
        let (market_tx, _) = watch::channel(MarketProjection::new(
            config.symbol.clone(),
            config.market_trade_retention,
        ));
        let (notification_tx, notification_rx) = mpsc::channel(config.notification_capacity);

        let engine = Self {
            transport: Transport::new(config.transport()),
            config,
            session,
            guard: SessionGuard::new(),
            public: None,
            private: None,
            account_tx,
            market_tx,
            notification_tx,
            states: ConnectionStates::default(),
        };
        Ok((engine, notification_rx))
    }

    /// Open whichever channels are not open yet.
    ///
    /// The private channel is only opened when the session has a token, so
    /// calling this again after login brings it up.
    pub fn start(&mut self) -> Result<(), SyncError> {
        if self.public.is_none() {
            self.open_public();
        }
        match self.connect_private() {
            Err(SyncError::MissingToken) => {
                tracing::info!("No auth token, private channel not opened");
                Ok(())
            }
            other => other,
        }
    }

    /// Open the private channel with the session's current token.
    pub fn connect_private(&mut self) -> Result<(), SyncError> {
        if self.private.is_some() {
            return Ok(());
        }
        let token = self
            .session
            .token()
            .filter(|token| !token.is_empty())
            .ok_or(SyncError::MissingToken)?;

        self.private = Some(self.transport.open_private(token));
        self.states
            .set(ChannelKind::Private, ConnectionState::Disconnected);
        Ok(())
    }

    /// Wait for the next channel event and process it.
    ///
    /// Returns `None` once no channel is open.
    pub async fn next_update(&mut self) -> Option<SyncUpdate> {
        if self.public.is_none() && self.private.is_none() {
            return None;
        }

        let (channel, event) = tokio::select! {
            event = next_from(self.public.as_mut()) => (ChannelKind::Public, event),
            event = next_from(self.private.as_mut()) => (ChannelKind::Private, event),
        };

        Some(match event {
            Some(ChannelEvent::State(state)) => {
                self.states.set(channel, state);
                SyncUpdate::Connection { channel, state }
            }
            Some(ChannelEvent::Message(raw)) => self.process(channel, classify(&raw)),
            None => {
                let state = self
                    .take_handle(channel)
                    .map(|handle| handle.state())
                    .unwrap_or(ConnectionState::Disconnected);
                self.states.set(channel, state);
                tracing::warn!(%channel, %state, "Channel ended");
                SyncUpdate::ChannelEnded { channel, state }
            }
        })
    }

    /// Follow a different market. Only the public channel is reopened.
    pub fn switch_symbol(&mut self, symbol: Symbol) -> Result<(), SyncError> {
        let mut config = self.config.clone();
        config.symbol = symbol.clone();
        config.validate()?;
        self.config = config;

        tracing::info!(%symbol, "Switching symbol");
        if let Some(mut handle) = self.public.take() {
            handle.close();
        }
        self.market_tx.send_modify(|market| market.reset(symbol));
        self.open_public();
        Ok(())
    }

    /// Close both channels. Safe to call more than once.
    pub fn shutdown(&mut self) {
        for channel in [ChannelKind::Public, ChannelKind::Private] {
            if let Some(mut handle) = self.take_handle(channel) {
                handle.close();
                self.states.set(channel, ConnectionState::Closed);
            }
        }
    }

    /// Committed account snapshots.
    pub fn account(&self) -> watch::Receiver<AccountProjection> {
        self.account_tx.subscribe()
    }

    /// Committed market snapshots.
    pub fn market(&self) -> watch::Receiver<MarketProjection> {
        self.market_tx.subscribe()
    }

    pub fn connection_states(&self) -> ConnectionStates {
        let mut states = self.states;
        if let Some(handle) = &self.public {
            states.public = handle.state();
        }
        if let Some(handle) = &self.private {
            states.private = handle.state();
        }
        states
    }

    pub fn symbol(&self) -> &Symbol {
        &self.config.symbol
    }

    // ── internals ───────────────────────────────────────────────────────

    fn open_public(&mut self) {
        self.public = Some(self.transport.open_public(self.config.symbol.clone()));
        self.states
            .set(ChannelKind::Public, ConnectionState::Disconnected);
    }

    fn take_handle(&mut self, channel: ChannelKind) -> Option<ChannelHandle> {
        match channel {
            ChannelKind::Public => self.public.take(),
            ChannelKind::Private => self.private.take(),
        }
    }

    fn process(&mut self, channel: ChannelKind, event: InboundEvent) -> SyncUpdate {
        if let InboundEvent::Discard { reason } = &event {
            tracing::debug!(%channel, "Discarding message: {}", reason);
            return SyncUpdate::Discarded {
                channel,
                reason: reason.clone(),
            };
        }

        if channel == ChannelKind::Private {
            if let SessionAction::Terminate { reason } = self.guard.inspect(&event) {
                self.terminate_session(&reason);
                return SyncUpdate::SessionTerminated { reason };
            }
        }

        if let Some(notification) = notify::dispatch(&event) {
            self.deliver(notification);
        }

        let mut outcome = Applied::NotApplicable;
        match channel {
            ChannelKind::Public => {
                self.market_tx.send_if_modified(|market| {
                    outcome = market.apply(&event);
                    outcome.is_changed()
                });
            }
            ChannelKind::Private => {
                self.account_tx.send_if_modified(|account| {
                    outcome = account.apply(&event);
                    outcome.is_changed()
                });
            }
        }

        SyncUpdate::Applied {
            channel,
            kind: event.kind(),
            outcome,
        }
    }

    fn terminate_session(&mut self, reason: &str) {
        if let Some(mut handle) = self.private.take() {
            handle.close();
        }
        self.states
            .set(ChannelKind::Private, ConnectionState::Closed);
        self.account_tx.send_modify(AccountProjection::clear);
        self.session.invalidate(reason);
        tracing::info!("Session terminated, account state cleared");
    }

    fn deliver(&self, notification: UserNotification) {
        match self.notification_tx.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!("Notification queue full, dropping: {}", dropped.message);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Notification receiver dropped");
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn next_from(handle: Option<&mut ChannelHandle>) -> Option<ChannelEvent> {
    match handle {
        Some(handle) => handle.next().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notice::FundsNotice;
    use crate::domain::order::Order;
    use crate::notify::NotificationCategory;
    use crate::session::StaticSession;
    use crate::shared::OrderId;
    use crate::ws::RawMessage;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn order(id: &str) -> Order {
        Order {
            id: OrderId::from(id),
            symbol: None,
            side: None,
            order_type: None,
            price: None,
            size: Decimal::ONE,
            filled: Decimal::ZERO,
            created_at: None,
            updated_at: None,
        }
    }

    fn engine(session: Arc<StaticSession>, capacity: usize) -> (SyncEngine, NotificationReceiver) {
        let config = SyncConfig {
            ws_url: "ws://127.0.0.1:1".into(),
            notification_capacity: capacity,
            ..Default::default()
        };
        SyncEngine::new(config, session).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SyncConfig {
            account_trade_retention: 0,
            ..Default::default()
        };
        let result = SyncEngine::new(config, Arc::new(StaticSession::anonymous()));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_access_denied_clears_account_and_logs_out() {
        let session = Arc::new(StaticSession::new("token"));
        let (mut engine, _rx) = engine(Arc::clone(&session), 4);
        let account = engine.account();

        engine.process(ChannelKind::Private, InboundEvent::OrderAdded(order("1")));
        assert_eq!(account.borrow().orders.len(), 1);

        let update = engine.process(
            ChannelKind::Private,
            InboundEvent::AuthError("Access Denied".into()),
        );
        assert_eq!(
            update,
            SyncUpdate::SessionTerminated {
                reason: "Access Denied".into()
            }
        );
        assert!(account.borrow().is_empty());
        assert!(session.token().is_none());
        assert_eq!(engine.connection_states().private, ConnectionState::Closed);
    }

    #[test]
    fn test_other_auth_errors_keep_state() {
        let session = Arc::new(StaticSession::new("token"));
        let (mut engine, _rx) = engine(Arc::clone(&session), 4);
        engine.process(ChannelKind::Private, InboundEvent::OrderAdded(order("1")));

        let update = engine.process(
            ChannelKind::Private,
            InboundEvent::AuthError("Internal error".into()),
        );
        assert!(matches!(
            update,
            SyncUpdate::Applied {
                outcome: Applied::NotApplicable,
                ..
            }
        ));
        assert_eq!(engine.account().borrow().orders.len(), 1);
        assert!(session.token().is_some());
    }

    #[test]
    fn test_fill_notifies_and_removes() {
        let (mut engine, mut rx) = engine(Arc::new(StaticSession::new("t")), 4);
        engine.process(ChannelKind::Private, InboundEvent::OrderAdded(order("1")));
        let update = engine.process(
            ChannelKind::Private,
            InboundEvent::OrderFilled(vec![OrderId::from("1")]),
        );

        assert_eq!(
            update,
            SyncUpdate::Applied {
                channel: ChannelKind::Private,
                kind: "order_filled",
                outcome: Applied::Changed,
            }
        );
        assert!(engine.account().borrow().orders.is_empty());
        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.category, NotificationCategory::OrderFilled);
    }

    #[test]
    fn test_full_notification_queue_drops_without_blocking() {
        let (mut engine, mut rx) = engine(Arc::new(StaticSession::new("t")), 1);
        let notice = FundsNotice::from_value(&json!({"amount": 1, "currency": "btc"})).unwrap();

        for _ in 0..3 {
            engine.process(
                ChannelKind::Private,
                InboundEvent::WithdrawalNotice(notice.clone()),
            );
        }
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_discard_changes_nothing() {
        let (mut engine, _rx) = engine(Arc::new(StaticSession::new("t")), 4);
        let raw = RawMessage::new(ChannelKind::Private, "mystery", json!({}));
        let update = engine.process(ChannelKind::Private, classify(&raw));
        assert!(matches!(update, SyncUpdate::Discarded { .. }));
        assert!(engine.account().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_start_without_token_opens_public_only() {
        let (mut engine, _rx) = engine(Arc::new(StaticSession::anonymous()), 4);
        engine.start().unwrap();
        assert!(engine.public.is_some());
        assert!(engine.private.is_none());
        assert!(matches!(
            engine.connect_private(),
            Err(SyncError::MissingToken)
        ));

        engine.shutdown();
        engine.shutdown();
        assert_eq!(engine.connection_states().public, ConnectionState::Closed);
        assert!(engine.next_update().await.is_none());
    }

    #[tokio::test]
    async fn test_switch_symbol_resets_market() {
        let (mut engine, _rx) = engine(Arc::new(StaticSession::anonymous()), 4);
        engine.start().unwrap();
        let market = engine.market();

        engine.switch_symbol(Symbol::from("eth")).unwrap();
        assert_eq!(engine.symbol(), &Symbol::from("eth"));
        assert_eq!(market.borrow().symbol, Symbol::from("eth"));
        assert!(engine.switch_symbol(Symbol::from("")).is_err());
        assert_eq!(engine.symbol(), &Symbol::from("eth"));
        engine.shutdown();
    }
}
