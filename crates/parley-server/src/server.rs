//! `ParleyServer` — Axum HTTP + WebSocket server.
//!
//! Routes: `/health`, `/metrics`, and the `/ws` upgrade. Identity is
//! verified *before* the upgrade completes — a bad token is refused with
//! 401 and never becomes a connection.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::IdentityVerifier;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_AUTH_FAILURES_TOTAL;
use crate::rpc::context::RpcContext;
use crate::rpc::registry::MethodRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::run_ws_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// RPC method registry.
    pub registry: Arc<MethodRegistry>,
    /// Handler context (hub + start time).
    pub ctx: Arc<RpcContext>,
    /// Identity verification seam.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Server configuration.
    pub config: ServerConfig,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle (absent in tests without a recorder).
    pub prometheus: Option<PrometheusHandle>,
}

/// The Parley server.
pub struct ParleyServer {
    state: AppState,
}

impl ParleyServer {
    /// Assemble a server from its parts.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        registry: MethodRegistry,
        ctx: Arc<RpcContext>,
        verifier: Arc<dyn IdentityVerifier>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            state: AppState {
                registry: Arc::new(registry),
                ctx,
                verifier,
                config,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                start_time: Instant::now(),
                prometheus,
            },
        }
    }

    /// Build the Axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Get the handler context.
    #[must_use]
    pub fn ctx(&self) -> &Arc<RpcContext> {
        &self.state.ctx
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.ctx.hub.registry();
    let resp = health::health_check(
        state.start_time,
        registry.connection_count(),
        registry.online_user_count().await,
    );
    Json(resp)
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// Query parameters for the `/ws` upgrade.
#[derive(Debug, Deserialize)]
struct WsQuery {
    /// Connection token minted by the external auth collaborator.
    token: Option<String>,
}

/// GET /ws — verify the token, then upgrade.
async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = query.token else {
        counter!(WS_AUTH_FAILURES_TOTAL).increment(1);
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    };

    let identity = match state.verifier.verify(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            counter!(WS_AUTH_FAILURES_TOTAL).increment(1);
            warn!(error = %err, "refusing connection");
            return (StatusCode::UNAUTHORIZED, err.to_string()).into_response();
        }
    };

    // Connection cap: refuse before the upgrade rather than after.
    let live = state.ctx.hub.registry().connection_count();
    if live >= state.config.max_connections {
        warn!(live, cap = state.config.max_connections, "connection cap reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let registry = state.registry.clone();
    let ctx = state.ctx.clone();
    let config = state.config.clone();
    let token = state.shutdown.token();
    ws.on_upgrade(move |socket| run_ws_session(socket, identity, registry, ctx, config, token))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
