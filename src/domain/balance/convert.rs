//! Conversions: raw balance maps → [`BalanceSheet`](super::state::BalanceSheet).

use super::state::BalanceSheet;
use super::wire::WsBalance;
use super::CurrencyBalance;
use crate::shared::serde_util::decimal_from_value;
use crate::shared::CurrencyCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

const BALANCE_SUFFIX: &str = "_balance";
const AVAILABLE_SUFFIX: &str = "_available";

#[derive(Default)]
struct Partial {
    balance: Option<Decimal>,
    available: Option<Decimal>,
    locked: Option<Decimal>,
}

impl Partial {
    fn finish(self) -> Option<CurrencyBalance> {
        match (self.balance, self.available, self.locked) {
            (_, Some(available), Some(locked)) => Some(CurrencyBalance::new(available, locked)),
            (Some(total), Some(available), None) => Some(CurrencyBalance::new(
                available,
                (total - available).max(Decimal::ZERO),
            )),
            (Some(total), None, locked) => {
                let locked = locked.unwrap_or(Decimal::ZERO);
                Some(CurrencyBalance::new((total - locked).max(Decimal::ZERO), locked))
            }
            (None, Some(available), None) => Some(CurrencyBalance::new(available, Decimal::ZERO)),
            (None, None, Some(locked)) => Some(CurrencyBalance::new(Decimal::ZERO, locked)),
            (None, None, None) => None,
        }
    }
}

impl From<WsBalance> for BalanceSheet {
    fn from(raw: WsBalance) -> Self {
        let mut partials: BTreeMap<CurrencyCode, Partial> = BTreeMap::new();
        let mut updated_at: Option<DateTime<Utc>> = None;

        for (key, value) in raw.0 {
            if key == "updated_at" {
                updated_at = value
                    .as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc));
                continue;
            }

            if let serde_json::Value::Object(fields) = &value {
                let entry = partials.entry(CurrencyCode::new(&key)).or_default();
                entry.balance = fields.get("balance").and_then(decimal_from_value);
                entry.available = fields.get("available").and_then(decimal_from_value);
                entry.locked = fields
                    .get("locked")
                    .or_else(|| fields.get("hold"))
                    .and_then(decimal_from_value);
                continue;
            }

            let Some(amount) = decimal_from_value(&value) else {
                tracing::debug!("Ignoring non-numeric balance field '{}'", key);
                continue;
            };

            if let Some(code) = key.strip_suffix(BALANCE_SUFFIX) {
                partials.entry(CurrencyCode::new(code)).or_default().balance = Some(amount);
            } else if let Some(code) = key.strip_suffix(AVAILABLE_SUFFIX) {
                partials.entry(CurrencyCode::new(code)).or_default().available = Some(amount);
            } else {
                tracing::debug!("Ignoring unrecognized balance field '{}'", key);
            }
        }

        let entries = partials
            .into_iter()
            .filter_map(|(code, partial)| partial.finish().map(|b| (code, b)))
            .collect();

        BalanceSheet { entries, updated_at }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sheet(value: serde_json::Value) -> BalanceSheet {
        serde_json::from_value::<WsBalance>(value).unwrap().into()
    }

    #[test]
    fn test_flat_layout() {
        let sheet = sheet(json!({
            "fiat_balance": 0,
            "btc_balance": 300000,
            "btc_available": 250000,
            "updated_at": "2017-07-26T13:20:40.464Z"
        }));

        let btc = sheet.get(&CurrencyCode::from("btc")).unwrap();
        assert_eq!(btc.available, Decimal::from(250000));
        assert_eq!(btc.locked, Decimal::from(50000));

        let fiat = sheet.get(&CurrencyCode::from("fiat")).unwrap();
        assert_eq!(fiat.total(), Decimal::ZERO);
        assert!(sheet.updated_at.is_some());
    }

    #[test]
    fn test_nested_layout() {
        let sheet = sheet(json!({
            "eth": { "available": "1.5", "locked": "0.5" }
        }));
        let eth = sheet.get(&CurrencyCode::from("ETH")).unwrap();
        assert_eq!(eth.available, Decimal::new(15, 1));
        assert_eq!(eth.locked, Decimal::new(5, 1));
    }

    #[test]
    fn test_balance_without_available_is_fully_available() {
        let sheet = sheet(json!({ "btc_balance": "2" }));
        let btc = sheet.get(&CurrencyCode::from("btc")).unwrap();
        assert_eq!(btc.available, Decimal::from(2));
        assert_eq!(btc.locked, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let sheet = sheet(json!({ "verification_level": "gold", "btc_available": 1 }));
        assert_eq!(sheet.len(), 1);
    }
}
