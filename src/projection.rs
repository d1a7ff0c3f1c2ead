//! Local projections of account and market state.
//!
//! Each projection has exactly one writer (the engine) which applies
//! events one at a time. An application either commits entirely or
//! leaves the projection untouched.

use crate::domain::balance::Balances;
use crate::domain::order::UserOrders;
use crate::domain::orderbook::OrderbookSnapshot;
use crate::domain::trade::TradeHistory;
use crate::domain::user::UserProfile;
use crate::event::InboundEvent;
use crate::shared::Symbol;
use serde::Serialize;

/// Outcome of applying one event to a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Applied {
    /// State changed.
    Changed,
    /// The event was for this projection but changed nothing (unknown id,
    /// identical balance, empty batch, other symbol).
    Unchanged,
    /// The event is not handled by this projection.
    NotApplicable,
}

impl Applied {
    pub fn is_changed(self) -> bool {
        self == Applied::Changed
    }

    fn from_changed(changed: bool) -> Self {
        if changed {
            Applied::Changed
        } else {
            Applied::Unchanged
        }
    }
}

// ─── AccountProjection ───────────────────────────────────────────────────────

/// The authenticated user's orders, balances and fills.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountProjection {
    pub user: Option<UserProfile>,
    pub orders: UserOrders,
    pub balances: Balances,
    pub recent_trades: TradeHistory,
}

impl AccountProjection {
    pub fn new(trade_retention: usize) -> Self {
        Self {
            user: None,
            orders: UserOrders::new(),
            balances: Balances::new(),
            recent_trades: TradeHistory::new(trade_retention),
        }
    }

    pub fn apply(&mut self, event: &InboundEvent) -> Applied {
        match event {
            InboundEvent::UserSnapshot(profile) => {
                let changed = self.user.as_ref() != Some(profile);
                self.user = Some(profile.clone());
                Applied::from_changed(changed)
            }
            InboundEvent::OrdersSnapshot(orders) => {
                self.orders.replace_all(orders.clone());
                Applied::Changed
            }
            InboundEvent::OrderAdded(order) => {
                self.orders.upsert(order.clone());
                Applied::Changed
            }
            InboundEvent::OrderUpdated(order) | InboundEvent::OrderPartiallyFilled(order) => {
                Applied::from_changed(self.orders.update_existing(order.clone()))
            }
            InboundEvent::OrderRemoved(ids) | InboundEvent::OrderFilled(ids) => {
                Applied::from_changed(self.orders.remove_many(ids) > 0)
            }
            InboundEvent::BalanceUpdated(sheet) => {
                Applied::from_changed(self.balances.replace(sheet.clone()))
            }
            InboundEvent::TradeRecorded(trades) => {
                if trades.is_empty() || self.recent_trades.capacity() == 0 {
                    return Applied::Unchanged;
                }
                self.recent_trades.prepend_batch(trades.clone());
                Applied::Changed
            }
            InboundEvent::Orderbook(_)
            | InboundEvent::TradeBatch(_)
            | InboundEvent::DepositNotice(_)
            | InboundEvent::WithdrawalNotice(_)
            | InboundEvent::AuthError(_)
            | InboundEvent::Discard { .. } => Applied::NotApplicable,
        }
    }

    /// Drop everything, e.g. after the session ends.
    pub fn clear(&mut self) {
        self.user = None;
        self.orders.clear();
        self.balances.clear();
        self.recent_trades.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none()
            && self.orders.is_empty()
            && self.balances.is_empty()
            && self.recent_trades.is_empty()
    }
}

// ─── MarketProjection ────────────────────────────────────────────────────────

/// Public book and tape for the subscribed symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketProjection {
    pub symbol: Symbol,
    pub orderbook: OrderbookSnapshot,
    pub recent_public_trades: TradeHistory,
}

impl MarketProjection {
    pub fn new(symbol: Symbol, trade_retention: usize) -> Self {
        Self {
            symbol,
            orderbook: OrderbookSnapshot::new(),
            recent_public_trades: TradeHistory::new(trade_retention),
        }
    }

    pub fn apply(&mut self, event: &InboundEvent) -> Applied {
        match event {
            InboundEvent::Orderbook(books) => match books.get(&self.symbol) {
                Some(book) => {
                    let changed = self.orderbook != *book;
                    self.orderbook = book.clone();
                    Applied::from_changed(changed)
                }
                None => Applied::Unchanged,
            },
            InboundEvent::TradeBatch(batches) => match batches.get(&self.symbol) {
                Some(trades) if !trades.is_empty() && self.recent_public_trades.capacity() > 0 => {
                    self.recent_public_trades.prepend_batch(trades.clone());
                    Applied::Changed
                }
                _ => Applied::Unchanged,
            },
            _ => Applied::NotApplicable,
        }
    }

    /// Start over for a new symbol.
    pub fn reset(&mut self, symbol: Symbol) {
        self.symbol = symbol;
        self.orderbook.clear();
        self.recent_public_trades.clear();
    }
}
