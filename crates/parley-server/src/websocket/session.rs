//! WebSocket session lifecycle — one verified client from upgrade through
//! disconnect.
//!
//! Transport teardown of any kind (close frame, socket error, heartbeat
//! timeout, server shutdown) funnels into the same cleanup path: the hub's
//! disconnect, which deregisters presence and purges group membership. No
//! explicit close message is required or expected.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use parley_core::{ConnectionId, Identity};

use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL,
    WS_SESSION_DURATION_SECONDS,
};
use crate::rpc::context::RpcContext;
use crate::rpc::registry::MethodRegistry;
use crate::rpc::types::{PushEvent, EVENT_CONNECTION_ESTABLISHED};
use crate::websocket::connection::ClientConnection;
use crate::websocket::handler::{handle_frame, HandleOutcome};

/// Run a WebSocket session for a verified client.
///
/// 1. Registers the connection with the hub (presence + support group)
/// 2. Sends a `connection.established` push with the connection id
/// 3. Forwards outbound frames and periodic Ping frames
/// 4. Dispatches inbound text frames as RPC requests
/// 5. Cleans up through the hub on any exit path
#[instrument(skip_all, fields(user_id = %identity.user_id, conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    identity: Identity,
    registry: Arc<MethodRegistry>,
    ctx: Arc<RpcContext>,
    config: ServerConfig,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(ConnectionId::new(), identity, send_tx));
    let _ = tracing::Span::current().record("conn_id", connection.id.as_str());

    let session_start = std::time::Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    ctx.hub.connect(connection.clone()).await;

    // Greet with the connection id; the client needs it for nothing but
    // logging, the identity echo is what its UI keys on.
    let greeting = PushEvent::new(
        EVENT_CONNECTION_ESTABLISHED,
        Some(serde_json::json!({
            "connectionId": connection.id,
            "userId": identity.user_id,
            "role": identity.role,
        })),
    );
    if let Ok(json) = serde_json::to_string(&greeting) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    // Outbound forwarder with periodic Ping frames.
    let ping_interval = Duration::from_secs(config.heartbeat_interval_secs);
    let pong_timeout = Duration::from_secs(config.heartbeat_timeout_secs);
    let outbound_conn = connection.clone();
    let outbound_shutdown = shutdown.clone();
    let outbound = tokio::spawn(async move {
        let mut ticks = tokio::time::interval(ping_interval);
        // Skip the immediate first tick.
        let _ = ticks.tick().await;

        loop {
            tokio::select! {
                frame = send_rx.recv() => {
                    match frame {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticks.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!(
                            conn_id = %outbound_conn.id,
                            "client unresponsive for {pong_timeout:?}, disconnecting"
                        );
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_shutdown.cancelled() => {
                    // Best-effort close frame on graceful shutdown.
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Inbound loop.
    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            () = shutdown.cancelled() => break,
        };
        let Some(Ok(msg)) = msg else { break };

        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => Some(s.to_string()),
                Err(_) => {
                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                    None
                }
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                None
            }
        };
        let Some(text) = text else { continue };
        // Any inbound frame counts as life.
        connection.mark_alive();

        let reply = match handle_frame(&text, &registry, &connection, &ctx).await {
            HandleOutcome::Response { json, .. } | HandleOutcome::ProtocolError { json } => json,
        };
        if !connection.send(Arc::new(reply)) {
            warn!("failed to enqueue response (channel full or closed)");
        }
    }

    // Cleanup — the single Close transition for this connection.
    info!("client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_SESSION_DURATION_SECONDS).record(session_start.elapsed().as_secs_f64());
    outbound.abort();
    ctx.hub.disconnect(&connection).await;
}
