//! Prometheus metrics: recorder installation and metric name constants.
//!
//! Metric names live here so emit sites and dashboards agree on spelling.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Total WebSocket connections accepted.
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Total WebSocket disconnections.
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Currently live WebSocket connections.
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connections refused because identity verification failed.
pub const WS_AUTH_FAILURES_TOTAL: &str = "ws_auth_failures_total";
/// Messages persisted by the relay.
pub const CHAT_MESSAGES_PERSISTED_TOTAL: &str = "chat_messages_persisted_total";
/// Push events enqueued to a live connection.
pub const CHAT_PUSH_DELIVERED_TOTAL: &str = "chat_push_delivered_total";
/// Push events dropped (full queue or dead connection), swallowed per target.
pub const CHAT_PUSH_DROPPED_TOTAL: &str = "chat_push_dropped_total";
/// RPC requests dispatched, labelled by method.
pub const RPC_REQUESTS_TOTAL: &str = "rpc_requests_total";
/// RPC errors, labelled by method and error type.
pub const RPC_ERRORS_TOTAL: &str = "rpc_errors_total";
/// RPC handler latency histogram, labelled by method.
pub const RPC_REQUEST_DURATION_SECONDS: &str = "rpc_request_duration_seconds";
/// WebSocket session lifetime histogram.
pub const WS_SESSION_DURATION_SECONDS: &str = "ws_session_duration_seconds";

/// Install the Prometheus recorder and return the render handle.
///
/// Call once at startup; the handle backs `GET /metrics`.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
