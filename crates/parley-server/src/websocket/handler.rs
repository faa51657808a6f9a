//! WebSocket frame dispatch — parses incoming text as an RPC request and
//! routes it through the `MethodRegistry`.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::rpc::context::RpcContext;
use crate::rpc::registry::MethodRegistry;
use crate::rpc::types::{PushEvent, RpcRequest, RpcResponse};
use crate::websocket::connection::ClientConnection;

/// Result of handling one inbound text frame.
pub enum HandleOutcome {
    /// A well-formed request was dispatched; send back its response.
    Response {
        /// Serialized `RpcResponse`.
        json: String,
        /// The dispatched method (for logging).
        method: String,
        /// Typed response, for callers that need structured access.
        response: RpcResponse,
    },
    /// The frame was not a request envelope at all. There is no request
    /// id to correlate, so the reply is an `error` push event addressed
    /// only to this connection.
    ProtocolError {
        /// Serialized `PushEvent` of type `error`.
        json: String,
    },
}

/// Handle one incoming WebSocket text frame.
#[instrument(skip_all, fields(conn_id = %caller.id, method))]
pub async fn handle_frame(
    frame: &str,
    registry: &MethodRegistry,
    caller: &Arc<ClientConnection>,
    ctx: &RpcContext,
) -> HandleOutcome {
    let request: RpcRequest = match serde_json::from_str(frame) {
        Ok(r) => r,
        Err(e) => {
            warn!("frame is not a request envelope");
            let event = PushEvent::protocol_error(format!("unreadable request: {e}"));
            let json = serde_json::to_string(&event).unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to serialize error event");
                String::new()
            });
            return HandleOutcome::ProtocolError { json };
        }
    };

    let method = request.method.clone();
    let _ = tracing::Span::current().record("method", method.as_str());
    debug!(method, id = request.id, "dispatching RPC");

    if !registry.has_method(&method) {
        warn!(method, "unknown RPC method");
    }

    let response = registry.dispatch(request, caller, ctx).await;
    let json = serde_json::to_string(&response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response");
        String::new()
    });
    HandleOutcome::Response {
        json,
        method,
        response,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
