//! Conversation history handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use parley_core::UserId;

use crate::rpc::context::RpcContext;
use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodHandler;
use crate::websocket::connection::ClientConnection;

/// Params for `chat.history`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct HistoryParams {
    counterpart_user_id: Option<i64>,
}

/// `chat.history` — replay a conversation, ascending by send time.
///
/// Customers are pinned to their own support conversation regardless of
/// the counterpart they name; support must name a customer. Timestamps
/// are UTC on the wire.
pub struct HistoryHandler;

#[async_trait]
impl MethodHandler for HistoryHandler {
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let p: HistoryParams = match params {
            None | Some(Value::Null) => HistoryParams::default(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| RpcError::invalid_params(format!("invalid params: {e}")))?,
        };
        let counterpart = p.counterpart_user_id.map(UserId::new);
        let messages = ctx.hub.history_for(caller.identity, counterpart).await?;
        Ok(serde_json::json!({ "messages": messages }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
