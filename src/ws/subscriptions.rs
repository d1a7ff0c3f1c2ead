//! Subscription parameters for the two channels.

use crate::network::{PRIVATE_NAMESPACE, PUBLIC_NAMESPACE};
use crate::shared::Symbol;
use crate::ws::ChannelKind;

/// What a channel subscribes to. Kept by the transport so a reconnect
/// reuses the last parameters.
#[derive(Clone, PartialEq, Eq)]
pub enum Subscription {
    /// Public market data for one symbol.
    Market { symbol: Symbol },
    /// Private account data for the bearer of `token`.
    Account { token: String },
}

impl Subscription {
    pub fn channel(&self) -> ChannelKind {
        match self {
            Subscription::Market { .. } => ChannelKind::Public,
            Subscription::Account { .. } => ChannelKind::Private,
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            Subscription::Market { .. } => PUBLIC_NAMESPACE,
            Subscription::Account { .. } => PRIVATE_NAMESPACE,
        }
    }

    /// Query parameters carried on the handshake URL.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Subscription::Market { symbol } => vec![("symbol", symbol.to_string())],
            Subscription::Account { token } => vec![("token", format!("Bearer {}", token))],
        }
    }
}

// The token never reaches logs.
impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscription::Market { symbol } => {
                f.debug_struct("Market").field("symbol", symbol).finish()
            }
            Subscription::Account { .. } => f
                .debug_struct("Account")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}
