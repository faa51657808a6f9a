//! Chat send and read-state handlers.
//!
//! Sender identity is never read from params — it comes from the calling
//! connection, which is the whole point of the authenticated-connection
//! model (a client cannot speak as anyone else).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use parley_core::{Attachment, UserId};

use crate::rpc::context::RpcContext;
use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodHandler;
use crate::websocket::connection::ClientConnection;

fn parse_params<T: serde::de::DeserializeOwned + Default>(
    params: Option<Value>,
) -> Result<T, RpcError> {
    match params {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| RpcError::invalid_params(format!("invalid params: {e}"))),
    }
}

/// Params for `chat.send`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SendParams {
    content: Option<String>,
    attachment: Option<Attachment>,
}

/// `chat.send` — customer → support.
///
/// The recipient is fixed to the well-known support identity; the
/// response body is the persisted message (the sender's own echo).
pub struct SendHandler;

#[async_trait]
impl MethodHandler for SendHandler {
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let p: SendParams = parse_params(params)?;
        let message = ctx
            .hub
            .send_from_customer(caller, p.content, p.attachment)
            .await?;
        serde_json::to_value(message).map_err(|e| RpcError::Internal {
            message: format!("failed to serialize message: {e}"),
        })
    }
}

/// Params for `chat.sendTo`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SendToParams {
    to_user_id: Option<i64>,
    content: Option<String>,
    attachment: Option<Attachment>,
}

/// `chat.sendTo` — support → a named customer.
pub struct SendToHandler;

#[async_trait]
impl MethodHandler for SendToHandler {
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let p: SendToParams = parse_params(params)?;
        // Absent maps to the zero sentinel; the hub rejects it as
        // MissingRecipient.
        let recipient = UserId::new(p.to_user_id.unwrap_or(0));
        let message = ctx
            .hub
            .send_from_support(caller, recipient, p.content, p.attachment)
            .await?;
        serde_json::to_value(message).map_err(|e| RpcError::Internal {
            message: format!("failed to serialize message: {e}"),
        })
    }
}

/// Params for `chat.markRead`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MarkReadParams {
    counterpart_user_id: Option<i64>,
}

/// `chat.markRead` — flag the caller's inbound conversation as read.
///
/// Counterpart resolution mirrors history: customers are pinned to the
/// support conversation, support must name a customer.
pub struct MarkReadHandler;

#[async_trait]
impl MethodHandler for MarkReadHandler {
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let p: MarkReadParams = parse_params(params)?;
        let counterpart = p.counterpart_user_id.map(UserId::new);
        let updated = ctx.hub.mark_read(caller.identity, counterpart).await?;
        Ok(serde_json::json!({ "updated": updated }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
