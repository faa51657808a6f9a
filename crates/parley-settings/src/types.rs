//! Settings types with compiled defaults.

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// HTTP/WebSocket server settings.
    pub server: ServerSettings,
    /// Chat/relay settings.
    pub chat: ChatSettings,
    /// Message database settings.
    pub database: DatabaseSettings,
}

/// HTTP/WebSocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` auto-assigns).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Seconds between server-initiated Ping frames.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence before an unresponsive client is dropped.
    pub heartbeat_timeout_secs: u64,
    /// Per-connection outbound queue capacity (messages).
    pub send_queue_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8720,
            max_connections: 1024,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            send_queue_capacity: 256,
        }
    }
}

/// Chat/relay settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    /// The well-known support identity every customer conversation
    /// funnels through.
    pub support_user_id: i64,
    /// Most-recent-N window returned by history queries.
    pub history_limit: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            support_user_id: 1,
            history_limit: 500,
        }
    }
}

/// Message database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Path to the `SQLite` file. Empty means the default under
    /// `~/.parley/`.
    pub path: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let s = ParleySettings::default();
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.server.port, 8720);
        assert_eq!(s.chat.support_user_id, 1);
        assert_eq!(s.chat.history_limit, 500);
        assert_eq!(s.database.pool_size, 8);
    }

    #[test]
    fn serde_roundtrip() {
        let s = ParleySettings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: ParleySettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.port, s.server.port);
        assert_eq!(back.chat.support_user_id, s.chat.support_user_id);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let back: ParleySettings =
            serde_json::from_str(r#"{"chat": {"supportUserId": 77}}"#).unwrap();
        assert_eq!(back.chat.support_user_id, 77);
        // Untouched sections keep their defaults.
        assert_eq!(back.chat.history_limit, 500);
        assert_eq!(back.server.port, 8720);
    }

    #[test]
    fn field_names_are_camel_case() {
        let json = serde_json::to_value(ParleySettings::default()).unwrap();
        assert!(json["server"].get("maxConnections").is_some());
        assert!(json["chat"].get("supportUserId").is_some());
        assert!(json["database"].get("busyTimeoutMs").is_some());
    }
}
