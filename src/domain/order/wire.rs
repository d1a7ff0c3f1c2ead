//! Wire types for order messages on the private channel.

use crate::shared::{OrderId, Side, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::OrderType;

/// Order record as sent in `orders` snapshots and `order_*` updates.
#[derive(Deserialize, Debug, Clone)]
pub struct WsOrder {
    pub id: OrderId,
    #[serde(default)]
    pub symbol: Option<Symbol>,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default, rename = "type")]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub size: Decimal,
    #[serde(default)]
    pub filled: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Reference to an order in removal/fill payloads.
///
/// The server sends either bare ids or full order records.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum OrderRef {
    Record { id: OrderId },
    Id(OrderId),
}

impl OrderRef {
    pub fn into_id(self) -> OrderId {
        match self {
            OrderRef::Record { id } | OrderRef::Id(id) => id,
        }
    }
}
