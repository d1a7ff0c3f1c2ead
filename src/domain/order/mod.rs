//! Order domain: open orders and their lifecycle updates.

mod convert;
pub mod state;
pub mod wire;

use crate::shared::{OrderId, Side, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::UserOrders;

// ─── OrderType ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OrderType::Limit => write!(f, "Limit"),
            OrderType::Market => write!(f, "Market"),
            OrderType::Unknown => write!(f, "Unknown"),
        }
    }
}

// ─── Order ───────────────────────────────────────────────────────────────────

/// An open order as tracked by the account projection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Option<Symbol>,
    pub side: Option<Side>,
    pub order_type: Option<OrderType>,
    pub price: Option<Decimal>,
    pub size: Decimal,
    pub filled: Decimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Size still resting on the book.
    pub fn remaining(&self) -> Decimal {
        (self.size - self.filled).max(Decimal::ZERO)
    }

    pub fn is_partially_filled(&self) -> bool {
        !self.filled.is_zero() && self.filled < self.size
    }
}
