//! Balance domain: per-currency available/locked amounts.

mod convert;
pub mod state;
pub mod wire;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::{BalanceSheet, Balances};

/// Amounts held in one currency.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrencyBalance {
    pub available: Decimal,
    pub locked: Decimal,
}

impl CurrencyBalance {
    pub fn new(available: Decimal, locked: Decimal) -> Self {
        Self { available, locked }
    }

    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }
}
