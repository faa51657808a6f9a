//! Shared context handed to every RPC handler.

use std::sync::Arc;
use std::time::Instant;

use crate::hub::ChatHub;

/// Shared state available to RPC handlers.
///
/// Per-call state (the calling connection and its identity) is passed
/// separately by the dispatcher; this is the process-wide part.
#[derive(Clone)]
pub struct RpcContext {
    /// The relay hub (registry, groups, store access).
    pub hub: Arc<ChatHub>,
    /// When the server started.
    pub server_start_time: Instant,
}

impl RpcContext {
    /// Create a context for the given hub.
    #[must_use]
    pub fn new(hub: Arc<ChatHub>) -> Self {
        Self {
            hub,
            server_start_time: Instant::now(),
        }
    }
}
