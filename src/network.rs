//! Network URL constants.

/// Default WebSocket base URL. Channel namespaces are appended to it.
pub const DEFAULT_WS_URL: &str = "wss://api.exchange.local";

/// Namespace of the public market-data channel.
pub const PUBLIC_NAMESPACE: &str = "/realtime";

/// Namespace of the private account channel.
pub const PRIVATE_NAMESPACE: &str = "/user";

/// Engine.IO protocol revision spoken by the server.
pub const ENGINE_IO_VERSION: u8 = 3;
