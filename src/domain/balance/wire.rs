//! Wire types for balance messages.

use serde::Deserialize;

/// Raw balance object.
///
/// Two layouts are in use: flat (`btc_balance`, `btc_available`, …,
/// `updated_at`) and nested (`{ "btc": { "available": …, "locked": … } }`).
/// Both are kept as a JSON map and normalized in `convert`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct WsBalance(pub serde_json::Map<String, serde_json::Value>);

/// Payload of the bare `wallet` message.
#[derive(Deserialize, Debug, Clone)]
pub struct WalletPayload {
    pub balance: WsBalance,
}
