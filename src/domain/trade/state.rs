//! Trade state containers: app-owned, SDK-provided update logic.

use super::Trade;
use std::collections::VecDeque;

/// Rolling trade history buffer, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeHistory {
    trades: VecDeque<Trade>,
    max_size: usize,
}

impl TradeHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Push a new trade, evicting the oldest if at capacity.
    pub fn push(&mut self, trade: Trade) {
        if self.max_size == 0 {
            return;
        }
        if self.trades.len() >= self.max_size {
            self.trades.pop_back();
        }
        self.trades.push_front(trade);
    }

    /// Put a batch in front of the existing history, keeping the batch's own
    /// order, then evict from the old end.
    pub fn prepend_batch(&mut self, batch: Vec<Trade>) {
        for trade in batch.into_iter().rev() {
            self.trades.push_front(trade);
        }
        self.trades.truncate(self.max_size);
    }

    pub fn trades(&self) -> &VecDeque<Trade> {
        &self.trades
    }

    pub fn latest(&self) -> Option<&Trade> {
        self.trades.front()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.trades.clear();
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
