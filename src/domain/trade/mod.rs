//! Trade domain: executed trades and bounded history.

pub mod state;

use crate::shared::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use state::TradeHistory;

/// A trade execution record.
///
/// Used for both the public tape and the user's own fills; `fee` is only
/// present on the latter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub price: Decimal,
    pub size: Decimal,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub fee: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
