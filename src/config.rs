//! Engine configuration.

use crate::error::ConfigError;
use crate::network::DEFAULT_WS_URL;
use crate::shared::Symbol;
use crate::ws::{ReconnectPolicy, TransportConfig};
use serde::{Deserialize, Serialize};

/// Market subscribed to when none is configured.
pub const DEFAULT_SYMBOL: &str = "btc";

/// Settings for a [`SyncEngine`](crate::engine::SyncEngine).
///
/// Every field has a default, so a config document only needs the keys it
/// overrides:
///
/// ```json
/// { "ws_url": "wss://api.example.com", "symbol": "eth", "reconnect": { "max_attempts": 3 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the real-time server.
    pub ws_url: String,
    /// Market whose book and tape are tracked.
    pub symbol: Symbol,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout_ms: u64,
    /// Maximum number of the user's own trades kept.
    pub account_trade_retention: usize,
    /// Maximum number of public trades kept.
    pub market_trade_retention: usize,
    /// Queue size per channel.
    pub event_channel_capacity: usize,
    /// Queue size for user notifications; overflow is dropped.
    pub notification_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            symbol: Symbol::from(DEFAULT_SYMBOL),
            reconnect: ReconnectPolicy::default(),
            connect_timeout_ms: 30_000,
            account_trade_retention: 50,
            market_trade_retention: 50,
            event_channel_capacity: 256,
            notification_capacity: 64,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.ws_url.trim();
        if url.is_empty() {
            return Err(invalid("ws_url", "must not be empty"));
        }
        if !["ws://", "wss://", "http://", "https://"]
            .iter()
            .any(|scheme| url.starts_with(scheme))
        {
            return Err(invalid("ws_url", "must use ws, wss, http or https"));
        }
        if self.symbol.as_str().trim().is_empty() {
            return Err(invalid("symbol", "must not be empty"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(invalid("connect_timeout_ms", "must be positive"));
        }
        if self.account_trade_retention == 0 {
            return Err(invalid("account_trade_retention", "must be positive"));
        }
        if self.market_trade_retention == 0 {
            return Err(invalid("market_trade_retention", "must be positive"));
        }
        if self.event_channel_capacity == 0 {
            return Err(invalid("event_channel_capacity", "must be positive"));
        }
        if self.notification_capacity == 0 {
            return Err(invalid("notification_capacity", "must be positive"));
        }
        if self.reconnect.base_delay_ms > self.reconnect.max_delay_ms {
            return Err(invalid(
                "reconnect.base_delay_ms",
                "must not exceed reconnect.max_delay_ms",
            ));
        }
        Ok(())
    }

    /// Settings handed to the transport.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            url: self.ws_url.trim().to_string(),
            reconnect: self.reconnect.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            event_capacity: self.event_channel_capacity,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.account_trade_retention, 50);
        assert_eq!(config.notification_capacity, 64);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SyncConfig::from_json_str(
            r#"{"ws_url": "wss://api.example.com", "symbol": "eth", "reconnect": {"max_attempts": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.symbol, Symbol::from("eth"));
        assert_eq!(config.reconnect.max_attempts, 3);
        assert!(config.reconnect.enabled);
        assert_eq!(config.market_trade_retention, 50);
    }

    #[test]
    fn test_validation_errors() {
        let config = SyncConfig {
            symbol: Symbol::from(""),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "symbol", .. })
        ));

        let config = SyncConfig {
            market_trade_retention: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "market_trade_retention",
                ..
            })
        ));

        let config = SyncConfig {
            ws_url: "ftp://nope".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SyncConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            SyncConfig::from_json_str(r#"{"notification_capacity": 0}"#),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_transport_settings() {
        let config = SyncConfig {
            ws_url: " ws://localhost:3000 ".into(),
            event_channel_capacity: 8,
            ..Default::default()
        };
        let transport = config.transport();
        assert_eq!(transport.url, "ws://localhost:3000");
        assert_eq!(transport.event_capacity, 8);
    }
}
