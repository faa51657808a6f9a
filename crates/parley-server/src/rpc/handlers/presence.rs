//! Presence snapshot handler (support dashboard).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::rpc::context::RpcContext;
use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodHandler;
use crate::websocket::connection::ClientConnection;

/// `presence.online` — user ids with at least one live connection.
///
/// Support-only: this backs the admin dashboard's online-customer list
/// and is not customer-visible information.
pub struct OnlineHandler;

#[async_trait]
impl MethodHandler for OnlineHandler {
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        _params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let online = ctx.hub.online_user_ids(caller.identity).await?;
        Ok(serde_json::json!({ "userIds": online }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::testutil::{connect_caller, make_ctx, SUPPORT_USER};

    #[tokio::test]
    async fn support_sees_online_users() {
        let ctx = make_ctx();
        let (support, _srx) = connect_caller(&ctx, SUPPORT_USER, true).await;
        let (_c1, _rx1) = connect_caller(&ctx, 42, false).await;
        let (_c2, _rx2) = connect_caller(&ctx, 7, false).await;

        let result = OnlineHandler.handle(&support, None, &ctx).await.unwrap();
        let ids: Vec<i64> = result["userIds"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![SUPPORT_USER, 7, 42]);
    }

    #[tokio::test]
    async fn customer_is_forbidden() {
        let ctx = make_ctx();
        let (customer, _rx) = connect_caller(&ctx, 42, false).await;

        let err = OnlineHandler.handle(&customer, None, &ctx).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn disconnected_user_leaves_snapshot() {
        let ctx = make_ctx();
        let (support, _srx) = connect_caller(&ctx, SUPPORT_USER, true).await;
        let (customer, _crx) = connect_caller(&ctx, 42, false).await;

        ctx.hub.disconnect(&customer).await;

        let result = OnlineHandler.handle(&support, None, &ctx).await.unwrap();
        let ids = result["userIds"].as_array().unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0], SUPPORT_USER);
    }
}
