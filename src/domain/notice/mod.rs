//! Funds notices: deposits and withdrawals announced on the private channel.

use crate::shared::serde_util::decimal_from_value;
use crate::shared::CurrencyCode;
use rust_decimal::Decimal;
use serde::Deserialize;

/// A deposit or withdrawal announcement.
///
/// `status` is kept loosely typed; see
/// [`truthy`](crate::shared::serde_util::truthy) for how it is read.
#[derive(Debug, Clone, PartialEq)]
pub struct FundsNotice {
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub status: serde_json::Value,
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
struct WsFundsNotice {
    amount: serde_json::Value,
    currency: CurrencyCode,
    #[serde(default)]
    status: serde_json::Value,
}

impl FundsNotice {
    /// Parse a notice payload. Returns `None` when `amount` or `currency`
    /// is missing or not numeric.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let wire = WsFundsNotice::deserialize(value).ok()?;
        Some(Self {
            amount: decimal_from_value(&wire.amount)?,
            currency: wire.currency,
            status: wire.status,
            raw: value.clone(),
        })
    }
}
