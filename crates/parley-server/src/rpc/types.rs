//! RPC wire-format types.
//!
//! One strict camelCase schema for requests, responses, and server pushes.
//! Requests and responses are correlated by the client-chosen `id`; push
//! events stand alone and carry their own type tag.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use parley_core::Message;

/// Push event type for the post-upgrade greeting.
pub const EVENT_CONNECTION_ESTABLISHED: &str = "connection.established";
/// Push event type for a relayed chat message.
pub const EVENT_MESSAGE_RECEIVED: &str = "message.received";
/// Push event type for protocol-level errors (unparseable frames),
/// sent only to the originating connection.
pub const EVENT_ERROR: &str = "error";

/// Incoming RPC request from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    /// Unique request identifier, echoed in the response.
    pub id: String,
    /// Method name (e.g. `chat.send`).
    pub method: String,
    /// Optional parameters object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Outgoing RPC response to a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed request identifier.
    pub id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (present when `success == false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

/// Structured error body inside an `RpcResponse`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Machine-readable error code (e.g. `EMPTY_MESSAGE`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Server-pushed event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushEvent {
    /// Event type tag.
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO-8601 UTC timestamp of emission.
    pub timestamp: String,
    /// Event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    /// Build a success response.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(
        id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(RpcErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            }),
        }
    }
}

impl PushEvent {
    /// Create an event stamped with the current UTC time.
    pub fn new(event_type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now().to_rfc3339(),
            data,
        }
    }

    /// The `message.received` push for a persisted message.
    ///
    /// Field layout is the hub's wire contract: flat attachment fields,
    /// absent keys omitted rather than null.
    #[must_use]
    pub fn message_received(message: &Message) -> Self {
        let mut data = serde_json::Map::new();
        let _ = data.insert("id".into(), Value::from(message.id));
        let _ = data.insert("fromUserId".into(), Value::from(message.sender_id.get()));
        let _ = data.insert("toUserId".into(), Value::from(message.recipient_id.get()));
        let _ = data.insert("sentAt".into(), Value::from(message.sent_at.to_rfc3339()));
        if let Some(content) = &message.content {
            let _ = data.insert("content".into(), Value::from(content.clone()));
        }
        if let Some(att) = &message.attachment {
            let _ = data.insert("fileUrl".into(), Value::from(att.url.clone()));
            let _ = data.insert("fileName".into(), Value::from(att.name.clone()));
            let _ = data.insert("fileType".into(), Value::from(att.kind.as_str()));
            let _ = data.insert("fileSizeBytes".into(), Value::from(att.size_bytes));
        }
        Self::new(EVENT_MESSAGE_RECEIVED, Some(Value::Object(data)))
    }

    /// The `error` push for protocol-level failures.
    #[must_use]
    pub fn protocol_error(message: impl Into<String>) -> Self {
        Self::new(
            EVENT_ERROR,
            Some(serde_json::json!({ "message": message.into() })),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
