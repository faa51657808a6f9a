//! Group membership handlers — the per-resource comment streams.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use parley_core::GroupName;

use crate::rpc::context::RpcContext;
use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodHandler;
use crate::websocket::connection::ClientConnection;

/// Params for `group.join` / `group.leave`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GroupParams {
    group: String,
}

fn parse_group(params: Option<Value>) -> Result<GroupName, RpcError> {
    let p: GroupParams = serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|_| RpcError::invalid_params("missing 'group' parameter"))?;
    if p.group.trim().is_empty() {
        return Err(RpcError::invalid_params("'group' must be non-empty"));
    }
    Ok(GroupName::from(p.group))
}

/// `group.join` — add the calling connection to a named group.
pub struct JoinHandler;

#[async_trait]
impl MethodHandler for JoinHandler {
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let group = parse_group(params)?;
        ctx.hub.join_group(caller.clone(), group.clone()).await?;
        Ok(serde_json::json!({ "joined": group }))
    }
}

/// `group.leave` — remove the calling connection from a named group.
pub struct LeaveHandler;

#[async_trait]
impl MethodHandler for LeaveHandler {
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let group = parse_group(params)?;
        let left = ctx.hub.leave_group(caller, &group).await?;
        Ok(serde_json::json!({ "left": left }))
    }
}
