//! Typed inbound events produced by [`classify`](crate::classify::classify).

use crate::domain::balance::BalanceSheet;
use crate::domain::notice::FundsNotice;
use crate::domain::order::Order;
use crate::domain::orderbook::OrderbookSnapshot;
use crate::domain::trade::Trade;
use crate::domain::user::UserProfile;
use crate::shared::{OrderId, Symbol};
use std::collections::BTreeMap;

/// One decoded server message.
///
/// Events are immutable once built. Market events carry every symbol the
/// server included; the projection picks the one it is subscribed to.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    // Public channel
    Orderbook(BTreeMap<Symbol, OrderbookSnapshot>),
    TradeBatch(BTreeMap<Symbol, Vec<Trade>>),

    // Private channel: snapshots
    UserSnapshot(UserProfile),
    OrdersSnapshot(Vec<Order>),
    BalanceUpdated(BalanceSheet),

    // Private channel: order lifecycle
    OrderAdded(Order),
    OrderUpdated(Order),
    OrderPartiallyFilled(Order),
    OrderRemoved(Vec<OrderId>),
    OrderFilled(Vec<OrderId>),

    // Private channel: account activity
    TradeRecorded(Vec<Trade>),
    DepositNotice(FundsNotice),
    WithdrawalNotice(FundsNotice),

    /// Server-side error text on the private channel.
    AuthError(String),

    /// Anything not understood. Never changes state.
    Discard { reason: String },
}

impl InboundEvent {
    pub fn discard(reason: impl Into<String>) -> Self {
        InboundEvent::Discard {
            reason: reason.into(),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Orderbook(_) => "orderbook",
            InboundEvent::TradeBatch(_) => "trade_batch",
            InboundEvent::UserSnapshot(_) => "user_snapshot",
            InboundEvent::OrdersSnapshot(_) => "orders_snapshot",
            InboundEvent::BalanceUpdated(_) => "balance_updated",
            InboundEvent::OrderAdded(_) => "order_added",
            InboundEvent::OrderUpdated(_) => "order_updated",
            InboundEvent::OrderPartiallyFilled(_) => "order_partially_filled",
            InboundEvent::OrderRemoved(_) => "order_removed",
            InboundEvent::OrderFilled(_) => "order_filled",
            InboundEvent::TradeRecorded(_) => "trade_recorded",
            InboundEvent::DepositNotice(_) => "deposit",
            InboundEvent::WithdrawalNotice(_) => "withdrawal",
            InboundEvent::AuthError(_) => "auth_error",
            InboundEvent::Discard { .. } => "discard",
        }
    }

    /// Whether this event belongs to the account (private) side.
    pub fn is_account_event(&self) -> bool {
        !matches!(
            self,
            InboundEvent::Orderbook(_) | InboundEvent::TradeBatch(_) | InboundEvent::Discard { .. }
        )
    }
}
