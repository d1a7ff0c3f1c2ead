//! Socket.IO over Engine.IO text framing.
//!
//! Only the subset the exchange uses is implemented: text frames, one
//! namespace per connection, no binary attachments.
//!
//! ```text
//! 0{"sid":"…","pingInterval":25000,"pingTimeout":5000}   engine open
//! 2 / 3                                                  engine ping / pong
//! 40/realtime?symbol=btc-eur,                            namespace connect
//! 42/realtime,["orderbook",{…}]                          event
//! 44/user,"Access Denied"                                error
//! ```

use crate::error::CodecError;
use crate::network::ENGINE_IO_VERSION;
use crate::ws::{ChannelKind, RawMessage, Subscription};
use serde::Deserialize;

const SOCKET_IO_PATH: &str = "/socket.io/";
const ROOT_NAMESPACE: &str = "/";

// ─── Packets ─────────────────────────────────────────────────────────────────

/// Engine.IO open handshake payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

/// A decoded Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// A decoded Socket.IO packet carried in an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        nsp: String,
    },
    Disconnect {
        nsp: String,
    },
    Event {
        nsp: String,
        name: String,
        payload: serde_json::Value,
    },
    Ack {
        nsp: String,
        id: u64,
    },
    Error {
        nsp: String,
        payload: serde_json::Value,
    },
}

impl SocketPacket {
    pub fn nsp(&self) -> &str {
        match self {
            SocketPacket::Connect { nsp }
            | SocketPacket::Disconnect { nsp }
            | SocketPacket::Event { nsp, .. }
            | SocketPacket::Ack { nsp, .. }
            | SocketPacket::Error { nsp, .. } => nsp,
        }
    }

    /// Convert to a [`RawMessage`]. Error packets surface as an `error`
    /// event; control packets yield `None`.
    pub fn into_raw(self, channel: ChannelKind) -> Option<RawMessage> {
        match self {
            SocketPacket::Event { name, payload, .. } => {
                Some(RawMessage::new(channel, name, payload))
            }
            SocketPacket::Error { payload, .. } => Some(RawMessage::new(channel, "error", payload)),
            SocketPacket::Connect { .. }
            | SocketPacket::Disconnect { .. }
            | SocketPacket::Ack { .. } => None,
        }
    }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Decode one WebSocket text frame.
pub fn decode(frame: &str) -> Result<EnginePacket, CodecError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str::<Handshake>(rest)
            .map(EnginePacket::Open)
            .map_err(|e| CodecError::MalformedHandshake(e.to_string())),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(rest.to_string())),
        '3' => Ok(EnginePacket::Pong(rest.to_string())),
        '4' => decode_socket(rest).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(CodecError::UnknownEnginePacket(other)),
    }
}

fn decode_socket(body: &str) -> Result<SocketPacket, CodecError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let mut rest = chars.as_str();

    // Optional namespace, terminated by ',' (or the end of the packet).
    let nsp = if rest.starts_with('/') {
        let (nsp, tail) = match rest.find(',') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };
        rest = tail;
        strip_query(nsp).to_string()
    } else {
        ROOT_NAMESPACE.to_string()
    };

    // Optional ack id.
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    let ack_id = rest[..digits].parse::<u64>().ok();
    let data = &rest[digits..];

    match kind {
        '0' => Ok(SocketPacket::Connect { nsp }),
        '1' => Ok(SocketPacket::Disconnect { nsp }),
        '2' => {
            let (name, payload) = decode_event_args(data)?;
            Ok(SocketPacket::Event { nsp, name, payload })
        }
        '3' => Ok(SocketPacket::Ack {
            nsp,
            id: ack_id.unwrap_or_default(),
        }),
        '4' => {
            // Error data is usually JSON, but older servers send bare text.
            let payload = serde_json::from_str(data)
                .unwrap_or_else(|_| serde_json::Value::String(data.to_string()));
            Ok(SocketPacket::Error { nsp, payload })
        }
        other => Err(CodecError::UnknownSocketPacket(other)),
    }
}

fn decode_event_args(data: &str) -> Result<(String, serde_json::Value), CodecError> {
    let args: Vec<serde_json::Value> =
        serde_json::from_str(data).map_err(|e| CodecError::MalformedEvent(e.to_string()))?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(serde_json::Value::String(name)) => name,
        Some(other) => {
            return Err(CodecError::MalformedEvent(format!(
                "event name is not a string: {}",
                other
            )))
        }
        None => return Err(CodecError::MalformedEvent("empty event".into())),
    };
    Ok((name, args.next().unwrap_or(serde_json::Value::Null)))
}

fn strip_query(nsp: &str) -> &str {
    nsp.split('?').next().unwrap_or(nsp)
}

// ─── Encoding ────────────────────────────────────────────────────────────────

/// Engine.IO ping.
pub fn encode_ping() -> String {
    "2".to_string()
}

/// Engine.IO pong echoing the ping payload.
pub fn encode_pong(payload: &str) -> String {
    format!("3{}", payload)
}

/// Namespace connect, carrying the subscription parameters.
pub fn encode_connect(subscription: &Subscription) -> String {
    format!(
        "40{}?{},",
        subscription.namespace(),
        query_string(subscription)
    )
}

/// Namespace disconnect.
pub fn encode_disconnect(subscription: &Subscription) -> String {
    format!("41{},", subscription.namespace())
}

/// Build the WebSocket URL for a subscription.
///
/// `http(s)` bases are rewritten to `ws(s)`. The subscription parameters
/// are repeated on the handshake query so servers reading either place
/// see them.
pub fn build_url(base: &str, subscription: &Subscription) -> String {
    let base = base.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!(
        "{}{}?EIO={}&transport=websocket&{}",
        base,
        SOCKET_IO_PATH,
        ENGINE_IO_VERSION,
        query_string(subscription)
    )
}

fn query_string(subscription: &Subscription) -> String {
    subscription
        .query_pairs()
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Symbol;
    use serde_json::json;

    fn market() -> Subscription {
        Subscription::Market {
            symbol: Symbol::from("btc-eur"),
        }
    }

    #[test]
    fn test_decode_open() {
        let packet =
            decode(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":5000}"#)
                .unwrap();
        match packet {
            EnginePacket::Open(hs) => {
                assert_eq!(hs.sid, "abc");
                assert_eq!(hs.ping_interval, 25000);
                assert_eq!(hs.ping_timeout, 5000);
            }
            other => panic!("expected open, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_ping_pong() {
        assert_eq!(decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(decode("3probe").unwrap(), EnginePacket::Pong("probe".into()));
    }

    #[test]
    fn test_decode_namespaced_event() {
        let packet = decode(r#"42/realtime,["orderbook",{"btc-eur":{"bids":[],"asks":[]}}]"#)
            .unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                nsp: "/realtime".into(),
                name: "orderbook".into(),
                payload: json!({"btc-eur": {"bids": [], "asks": []}}),
            })
        );
    }

    #[test]
    fn test_decode_root_event_with_ack_id() {
        let packet = decode(r#"4212["user",{"id":1}]"#).unwrap();
        assert_eq!(
            packet,
            EnginePacket::Message(SocketPacket::Event {
                nsp: "/".into(),
                name: "user".into(),
                payload: json!({"id": 1}),
            })
        );
    }

    #[test]
    fn test_decode_event_without_payload() {
        let packet = decode(r#"42/user,["orders"]"#).unwrap();
        match packet {
            EnginePacket::Message(SocketPacket::Event { payload, .. }) => {
                assert_eq!(payload, serde_json::Value::Null)
            }
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_connect_strips_query() {
        assert_eq!(
            decode("40/realtime?symbol=btc-eur,").unwrap(),
            EnginePacket::Message(SocketPacket::Connect {
                nsp: "/realtime".into()
            })
        );
        assert_eq!(
            decode("40/user").unwrap(),
            EnginePacket::Message(SocketPacket::Connect { nsp: "/user".into() })
        );
    }

    #[test]
    fn test_decode_error_json_and_bare() {
        let json_err = decode(r#"44/user,"Access Denied""#).unwrap();
        let bare_err = decode("44/user,Access Denied").unwrap();
        for packet in [json_err, bare_err] {
            match packet {
                EnginePacket::Message(p @ SocketPacket::Error { .. }) => {
                    let raw = p.into_raw(ChannelKind::Private).unwrap();
                    assert_eq!(raw.event, "error");
                    assert_eq!(raw.payload, json!("Access Denied"));
                }
                other => panic!("expected error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode(""), Err(CodecError::Empty));
        assert_eq!(decode("x"), Err(CodecError::UnknownEnginePacket('x')));
        assert_eq!(decode("49"), Err(CodecError::UnknownSocketPacket('9')));
        assert!(matches!(decode("42/user,{"), Err(CodecError::MalformedEvent(_))));
        assert!(matches!(decode("42[1,2]"), Err(CodecError::MalformedEvent(_))));
        assert!(matches!(decode("0{}"), Err(CodecError::MalformedHandshake(_))));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_ping(), "2");
        assert_eq!(encode_pong("probe"), "3probe");
        assert_eq!(encode_connect(&market()), "40/realtime?symbol=btc-eur,");
        assert_eq!(encode_disconnect(&market()), "41/realtime,");

        let account = Subscription::Account { token: "t0k".into() };
        assert_eq!(encode_connect(&account), "40/user?token=Bearer%20t0k,");
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            build_url("https://api.example.com/", &market()),
            "wss://api.example.com/socket.io/?EIO=3&transport=websocket&symbol=btc-eur"
        );
        let account = Subscription::Account { token: "a b".into() };
        assert_eq!(
            build_url("ws://127.0.0.1:9000", &account),
            "ws://127.0.0.1:9000/socket.io/?EIO=3&transport=websocket&token=Bearer%20a%20b"
        );
    }
}
