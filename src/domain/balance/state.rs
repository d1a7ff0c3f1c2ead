//! Balance state container.

use super::CurrencyBalance;
use crate::shared::CurrencyCode;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A complete balance mapping as delivered by one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceSheet {
    pub entries: BTreeMap<CurrencyCode, CurrencyBalance>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BalanceSheet {
    pub fn get(&self, code: &CurrencyCode) -> Option<&CurrencyBalance> {
        self.entries.get(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The account's balances. Every update replaces the mapping wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balances {
    sheet: BalanceSheet,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole mapping. Returns `false` if nothing changed.
    pub fn replace(&mut self, sheet: BalanceSheet) -> bool {
        if self.sheet == sheet {
            return false;
        }
        self.sheet = sheet;
        true
    }

    pub fn get(&self, code: &CurrencyCode) -> Option<&CurrencyBalance> {
        self.sheet.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, &CurrencyBalance)> {
        self.sheet.entries.iter()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.sheet.updated_at
    }

    pub fn clear(&mut self) {
        self.sheet = BalanceSheet::default();
    }

    pub fn is_empty(&self) -> bool {
        self.sheet.is_empty()
    }
}
