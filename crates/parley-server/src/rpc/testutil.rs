//! Shared fixtures for RPC and hub tests.

use std::sync::Arc;

use tokio::sync::mpsc;

use parley_core::{ConnectionId, Identity, Role, UserId};
use parley_settings::ParleySettings;
use parley_store::{new_in_memory, run_migrations, ConnectionConfig, MessageStore};

use crate::hub::ChatHub;
use crate::rpc::context::RpcContext;
use crate::websocket::connection::ClientConnection;

/// Support identity used across test fixtures.
pub const SUPPORT_USER: i64 = 1;

/// Build a context around a fresh in-memory hub.
pub fn make_ctx() -> RpcContext {
    // Single-connection pool: each in-memory connection is its own
    // database, so the migrated connection must be the one reused.
    let pool = new_in_memory(&ConnectionConfig {
        pool_size: 1,
        ..Default::default()
    })
    .expect("in-memory pool");
    {
        let conn = pool.get().expect("pooled connection");
        let _ = run_migrations(&conn).expect("migrations");
    }
    let limit = ParleySettings::default().chat.history_limit;
    let hub = ChatHub::new(
        Arc::new(MessageStore::new(pool)),
        UserId::new(SUPPORT_USER),
        limit,
    );
    RpcContext::new(Arc::new(hub))
}

/// Build a caller connection with a drainable receiver.
pub fn make_caller(
    user: i64,
    support: bool,
) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
    let role = if support { Role::Support } else { Role::Customer };
    let (tx, rx) = mpsc::channel(64);
    let conn = Arc::new(ClientConnection::new(
        ConnectionId::new(),
        Identity::new(UserId::new(user), role),
        tx,
    ));
    (conn, rx)
}

/// Build a caller and register it with the context's hub.
pub async fn connect_caller(
    ctx: &RpcContext,
    user: i64,
    support: bool,
) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
    let (conn, rx) = make_caller(user, support);
    ctx.hub.connect(conn.clone()).await;
    (conn, rx)
}
