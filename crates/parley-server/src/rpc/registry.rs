//! Method registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::warn;

use crate::metrics::{RPC_ERRORS_TOTAL, RPC_REQUESTS_TOTAL, RPC_REQUEST_DURATION_SECONDS};
use crate::rpc::context::RpcContext;
use crate::rpc::errors::{self, RpcError};
use crate::rpc::types::{RpcRequest, RpcResponse};
use crate::websocket::connection::ClientConnection;

/// Trait implemented by every RPC method handler.
///
/// `caller` is the connection the request arrived on; its verified
/// identity is the only sender/authorization input a handler may use.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler.
    async fn handle(
        &self,
        caller: &Arc<ClientConnection>,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Whether a method is registered.
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Maximum time a single RPC handler is allowed to run.
    const HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

    /// Dispatch a request to the appropriate handler.
    pub async fn dispatch(
        &self,
        request: RpcRequest,
        caller: &Arc<ClientConnection>,
        ctx: &RpcContext,
    ) -> RpcResponse {
        let method = request.method.clone();
        counter!(RPC_REQUESTS_TOTAL, "method" => method.clone()).increment(1);

        let Some(handler) = self.handlers.get(&method) else {
            counter!(RPC_ERRORS_TOTAL, "method" => method.clone(), "error_type" => "method_not_found")
                .increment(1);
            return RpcResponse::error(
                &request.id,
                errors::METHOD_NOT_FOUND,
                format!("Method '{method}' not found"),
            );
        };

        let start = std::time::Instant::now();
        let result = tokio::time::timeout(
            Self::HANDLER_TIMEOUT,
            handler.handle(caller, request.params, ctx),
        )
        .await;

        let response = match result {
            Ok(Ok(result)) => RpcResponse::success(&request.id, result),
            Ok(Err(err)) => {
                counter!(RPC_ERRORS_TOTAL, "method" => method.clone(), "error_type" => err.code().to_owned())
                    .increment(1);
                RpcResponse {
                    id: request.id,
                    success: false,
                    result: None,
                    error: Some(err.to_error_body()),
                }
            }
            Err(_elapsed) => {
                counter!(RPC_ERRORS_TOTAL, "method" => method.clone(), "error_type" => "timeout")
                    .increment(1);
                tracing::error!(method, "RPC handler timed out after {:?}", Self::HANDLER_TIMEOUT);
                RpcResponse::error(
                    &request.id,
                    errors::INTERNAL_ERROR,
                    format!("Handler for '{method}' timed out"),
                )
            }
        };

        let duration = start.elapsed();
        histogram!(RPC_REQUEST_DURATION_SECONDS, "method" => method.clone())
            .record(duration.as_secs_f64());

        if duration.as_secs() >= 5 {
            warn!(
                method,
                duration_secs = duration.as_secs_f64(),
                "slow RPC request"
            );
        }

        response
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::testutil::{make_caller, make_ctx};
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(
            &self,
            _caller: &Arc<ClientConnection>,
            params: Option<Value>,
            _ctx: &RpcContext,
        ) -> Result<Value, RpcError> {
            Ok(params.unwrap_or(Value::Null))
        }
    }

    struct WhoAmIHandler;

    #[async_trait]
    impl MethodHandler for WhoAmIHandler {
        async fn handle(
            &self,
            caller: &Arc<ClientConnection>,
            _params: Option<Value>,
            _ctx: &RpcContext,
        ) -> Result<Value, RpcError> {
            Ok(json!({ "userId": caller.identity.user_id }))
        }
    }

    struct FailHandler;

    #[async_trait]
    impl MethodHandler for FailHandler {
        async fn handle(
            &self,
            _caller: &Arc<ClientConnection>,
            _params: Option<Value>,
            _ctx: &RpcContext,
        ) -> Result<Value, RpcError> {
            Err(RpcError::Internal {
                message: "boom".into(),
            })
        }
    }

    fn registry() -> MethodRegistry {
        let mut reg = MethodRegistry::new();
        reg.register("test.echo", EchoHandler);
        reg.register("test.whoami", WhoAmIHandler);
        reg.register("test.fail", FailHandler);
        reg
    }

    fn request(id: &str, method: &str, params: Option<Value>) -> RpcRequest {
        RpcRequest {
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    #[tokio::test]
    async fn dispatch_routes_to_handler() {
        let reg = registry();
        let ctx = make_ctx();
        let (caller, _rx) = make_caller(42, false);

        let resp = reg
            .dispatch(request("r1", "test.echo", Some(json!({"x": 1}))), &caller, &ctx)
            .await;
        assert!(resp.success);
        assert_eq!(resp.id, "r1");
        assert_eq!(resp.result.unwrap()["x"], 1);
    }

    #[tokio::test]
    async fn unknown_method_not_found() {
        let reg = registry();
        let ctx = make_ctx();
        let (caller, _rx) = make_caller(42, false);

        let resp = reg.dispatch(request("r2", "no.such", None), &caller, &ctx).await;
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().code, "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn handler_sees_caller_identity() {
        let reg = registry();
        let ctx = make_ctx();
        let (caller, _rx) = make_caller(77, false);

        let resp = reg
            .dispatch(request("r3", "test.whoami", None), &caller, &ctx)
            .await;
        assert_eq!(resp.result.unwrap()["userId"], 77);
    }

    #[tokio::test]
    async fn handler_error_becomes_error_response() {
        let reg = registry();
        let ctx = make_ctx();
        let (caller, _rx) = make_caller(42, false);

        let resp = reg.dispatch(request("r4", "test.fail", None), &caller, &ctx).await;
        assert!(!resp.success);
        let err = resp.error.unwrap();
        assert_eq!(err.code, "INTERNAL_ERROR");
        assert_eq!(err.message, "boom");
    }

    #[tokio::test]
    async fn response_preserves_request_id() {
        let reg = registry();
        let ctx = make_ctx();
        let (caller, _rx) = make_caller(42, false);

        let resp = reg
            .dispatch(request("unique_42", "test.echo", None), &caller, &ctx)
            .await;
        assert_eq!(resp.id, "unique_42");
    }

    #[test]
    fn has_method_and_methods() {
        let reg = registry();
        assert!(reg.has_method("test.echo"));
        assert!(!reg.has_method("chat.send"));
        assert_eq!(reg.methods().len(), 3);
    }

    #[test]
    fn empty_registry_default() {
        let reg = MethodRegistry::default();
        assert!(reg.methods().is_empty());
    }
}
