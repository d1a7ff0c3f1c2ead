//! Orderbook state container: app-owned, SDK-provided update logic.

use super::wire::WsOrderbook;
use super::PriceLevel;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The book for one symbol.
///
/// Every message is a full snapshot: applying one replaces both sides.
/// Zero-size levels are dropped; a repeated price keeps its last size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderbookSnapshot {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    timestamp: Option<DateTime<Utc>>,
}

impl OrderbookSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole book with a new snapshot.
    pub fn replace(&mut self, book: WsOrderbook) {
        self.bids = collect_side(book.bids.into_iter().map(PriceLevel::from));
        self.asks = collect_side(book.asks.into_iter().map(PriceLevel::from));
        self.timestamp = book.timestamp;
    }

    /// Bids sorted by price descending.
    pub fn bids(&self) -> Vec<PriceLevel> {
        self.bids
            .iter()
            .rev()
            .map(|(&price, &size)| PriceLevel::new(price, size))
            .collect()
    }

    /// Asks sorted by price ascending.
    pub fn asks(&self) -> Vec<PriceLevel> {
        self.asks
            .iter()
            .map(|(&price, &size)| PriceLevel::new(price, size))
            .collect()
    }

    /// Highest bid price.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest ask price.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    /// Mid price (average of best bid and best ask).
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            _ => None,
        }
    }

    /// Spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.timestamp = None;
    }
}

fn collect_side(levels: impl Iterator<Item = PriceLevel>) -> BTreeMap<Decimal, Decimal> {
    levels
        .filter(|level| !level.size.is_zero())
        .map(|level| (level.price, level.size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::orderbook::wire::WsLevel;

    fn order_book(bids: Vec<(i64, i64)>, asks: Vec<(i64, i64)>) -> WsOrderbook {
        let level = |(p, s): (i64, i64)| WsLevel::Pair(Decimal::from(p), Decimal::from(s));
        WsOrderbook {
            bids: bids.into_iter().map(level).collect(),
            asks: asks.into_iter().map(level).collect(),
            timestamp: None,
        }
    }

    #[test]
    fn test_snapshot_replaces_state() {
        let mut snap = OrderbookSnapshot::new();
        snap.replace(order_book(vec![(50, 10)], vec![(51, 5)]));
        snap.replace(order_book(vec![(49, 20), (48, 1)], vec![(52, 8)]));

        assert_eq!(snap.bids().len(), 2);
        assert_eq!(snap.asks().len(), 1);
        assert_eq!(snap.best_bid(), Some(Decimal::from(49)));
        assert_eq!(snap.best_ask(), Some(Decimal::from(52)));
    }

    #[test]
    fn test_sides_are_sorted() {
        let mut snap = OrderbookSnapshot::new();
        snap.replace(order_book(vec![(48, 1), (50, 1), (49, 1)], vec![(53, 1), (51, 1), (52, 1)]));

        let bid_prices: Vec<_> = snap.bids().iter().map(|l| l.price).collect();
        let ask_prices: Vec<_> = snap.asks().iter().map(|l| l.price).collect();
        assert_eq!(bid_prices, vec![Decimal::from(50), Decimal::from(49), Decimal::from(48)]);
        assert_eq!(ask_prices, vec![Decimal::from(51), Decimal::from(52), Decimal::from(53)]);
    }

    #[test]
    fn test_zero_size_levels_dropped() {
        let mut snap = OrderbookSnapshot::new();
        snap.replace(order_book(vec![(50, 0), (49, 2)], vec![]));
        assert_eq!(snap.bids().len(), 1);
        assert_eq!(snap.best_bid(), Some(Decimal::from(49)));
    }

    #[test]
    fn test_mid_price_and_spread() {
        let mut snap = OrderbookSnapshot::new();
        snap.replace(order_book(vec![(50, 10)], vec![(52, 5)]));
        assert_eq!(snap.mid_price(), Some(Decimal::from(51)));
        assert_eq!(snap.spread(), Some(Decimal::from(2)));
    }

    #[test]
    fn test_clear() {
        let mut snap = OrderbookSnapshot::new();
        snap.replace(order_book(vec![(50, 10)], vec![(51, 5)]));
        snap.clear();
        assert!(snap.is_empty());
    }
}
