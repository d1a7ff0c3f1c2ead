//! Message classification: raw channel messages → [`InboundEvent`].
//!
//! Pure and total. Anything that does not match a known shape becomes
//! [`InboundEvent::Discard`] so a newer server never breaks the client.

use crate::domain::balance::wire::WalletPayload;
use crate::domain::balance::BalanceSheet;
use crate::domain::notice::FundsNotice;
use crate::domain::order::wire::{OrderRef, WsOrder};
use crate::domain::order::Order;
use crate::domain::orderbook::wire::WsOrderbook;
use crate::domain::orderbook::OrderbookSnapshot;
use crate::domain::trade::Trade;
use crate::domain::user::UserProfile;
use crate::event::InboundEvent;
use crate::shared::serde_util::OneOrMany;
use crate::shared::{OrderId, Symbol};
use crate::ws::{ChannelKind, RawMessage};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Envelope of private `update` messages.
#[derive(Deserialize)]
struct UpdateEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Classify one raw message.
pub fn classify(msg: &RawMessage) -> InboundEvent {
    let result = match msg.channel {
        ChannelKind::Public => classify_public(&msg.event, &msg.payload),
        ChannelKind::Private => classify_private(&msg.event, &msg.payload),
    };
    result.unwrap_or_else(InboundEvent::discard)
}

fn classify_public(event: &str, payload: &serde_json::Value) -> Result<InboundEvent, String> {
    match event {
        "orderbook" => {
            let books = parse_per_symbol::<WsOrderbook>(payload, event)?;
            Ok(InboundEvent::Orderbook(
                books
                    .into_iter()
                    .map(|(symbol, book)| (symbol, OrderbookSnapshot::from(book)))
                    .collect(),
            ))
        }
        "trades" => Ok(InboundEvent::TradeBatch(parse_per_symbol(payload, event)?)),
        other => Err(format!("unknown public event `{}`", other)),
    }
}

fn classify_private(event: &str, payload: &serde_json::Value) -> Result<InboundEvent, String> {
    match event {
        "user" => Ok(InboundEvent::UserSnapshot(parse(payload, event)?)),
        "orders" => {
            let orders: Vec<WsOrder> = parse(payload, event)?;
            Ok(InboundEvent::OrdersSnapshot(
                orders.into_iter().map(Order::from).collect(),
            ))
        }
        "wallet" => {
            let wallet: WalletPayload = parse(payload, event)?;
            Ok(InboundEvent::BalanceUpdated(BalanceSheet::from(
                wallet.balance,
            )))
        }
        "error" => Ok(InboundEvent::AuthError(error_text(payload))),
        "update" => {
            let envelope: UpdateEnvelope = parse(payload, event)?;
            classify_update(&envelope.kind, &envelope.data)
        }
        other => Err(format!("unknown private event `{}`", other)),
    }
}

fn classify_update(kind: &str, data: &serde_json::Value) -> Result<InboundEvent, String> {
    match kind {
        "order_added" => Ok(InboundEvent::OrderAdded(parse_order(data, kind)?)),
        "order_updated" => Ok(InboundEvent::OrderUpdated(parse_order(data, kind)?)),
        // The server spells it both ways.
        "order_partialy_filled" | "order_partially_filled" => Ok(
            InboundEvent::OrderPartiallyFilled(parse_order(data, kind)?),
        ),
        "order_filled" => Ok(InboundEvent::OrderFilled(parse_ids(data, kind)?)),
        "order_removed" => Ok(InboundEvent::OrderRemoved(parse_ids(data, kind)?)),
        "trade" => {
            let trades: OneOrMany<Trade> = parse(data, kind)?;
            Ok(InboundEvent::TradeRecorded(trades.into_vec()))
        }
        "deposit" => FundsNotice::from_value(data)
            .map(InboundEvent::DepositNotice)
            .ok_or_else(|| "malformed deposit notice".to_string()),
        "withdrawal" => FundsNotice::from_value(data)
            .map(InboundEvent::WithdrawalNotice)
            .ok_or_else(|| "malformed withdrawal notice".to_string()),
        // Intermediate matching-engine states; the order itself follows in
        // a later update.
        "order_queued" | "order_processed" => Err(format!("ignored update `{}`", kind)),
        other => Err(format!("unknown update type `{}`", other)),
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn parse<T: DeserializeOwned>(value: &serde_json::Value, what: &str) -> Result<T, String> {
    T::deserialize(value).map_err(|e| format!("malformed `{}` payload: {}", what, e))
}

/// Parse a `{ [symbol]: T }` map entry by entry. A malformed entry only
/// drops that symbol; the message is discarded when nothing survives.
fn parse_per_symbol<T: DeserializeOwned>(
    payload: &serde_json::Value,
    what: &str,
) -> Result<BTreeMap<Symbol, T>, String> {
    let entries: serde_json::Map<String, serde_json::Value> = parse(payload, what)?;
    let total = entries.len();

    let mut parsed = BTreeMap::new();
    for (symbol, value) in entries {
        match T::deserialize(&value) {
            Ok(item) => {
                parsed.insert(Symbol::from(symbol), item);
            }
            Err(e) => {
                tracing::debug!(%symbol, "Dropping malformed `{}` entry: {}", what, e);
            }
        }
    }

    if parsed.is_empty() && total > 0 {
        return Err(format!("no well-formed `{}` entries", what));
    }
    Ok(parsed)
}

fn parse_order(value: &serde_json::Value, what: &str) -> Result<Order, String> {
    parse::<WsOrder>(value, what).map(Order::from)
}

fn parse_ids(value: &serde_json::Value, what: &str) -> Result<Vec<OrderId>, String> {
    let refs: OneOrMany<OrderRef> = parse(value, what)?;
    Ok(refs.into_vec().into_iter().map(OrderRef::into_id).collect())
}

fn error_text(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) => match map.get("message") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => payload.to_string(),
        },
        other => other.to_string(),
    }
}
