//! Conversions: WS wire levels → [`PriceLevel`].

use super::wire::{WsLevel, WsOrderbook};
use super::{OrderbookSnapshot, PriceLevel};

impl From<WsLevel> for PriceLevel {
    fn from(level: WsLevel) -> Self {
        match level {
            WsLevel::Pair(price, size) | WsLevel::Object { price, size } => {
                PriceLevel::new(price, size)
            }
        }
    }
}

impl From<WsOrderbook> for OrderbookSnapshot {
    fn from(book: WsOrderbook) -> Self {
        let mut snapshot = OrderbookSnapshot::new();
        snapshot.replace(book);
        snapshot
    }
}
