//! Wire types for public `orderbook` messages.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

/// A price level as sent by the server: `[price, size]` or `{price, size}`.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(untagged)]
pub enum WsLevel {
    Pair(Decimal, Decimal),
    Object { price: Decimal, size: Decimal },
}

/// One symbol's book inside an `orderbook` message.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct WsOrderbook {
    #[serde(default)]
    pub bids: Vec<WsLevel>,
    #[serde(default)]
    pub asks: Vec<WsLevel>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
