//! Connection registry — the per-user presence map.
//!
//! Tracks which live connections belong to which user, supporting multiple
//! simultaneous connections per user (multi-tab, multi-device). All
//! concurrent-mutation discipline for presence lives here: connection
//! lifecycle events from independent transports race freely against reads
//! from the relay.
//!
//! Invariants maintained:
//! - a user id is present iff it has at least one live connection
//!   (removal of the last connection removes the key — readers never see
//!   an empty set)
//! - a connection id appears under exactly one user

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use parley_core::{ConnectionId, UserId};

use crate::websocket::connection::ClientConnection;

/// Presence map: user id → that user's live connections.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, HashMap<ConnectionId, Arc<ClientConnection>>>>,
    /// Atomic total so count queries skip the read lock.
    active_count: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Register a live connection under its owning user.
    ///
    /// Idempotent per connection id: re-adding the same id replaces the
    /// entry without disturbing the count.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let user_id = connection.identity.user_id;
        let mut map = self.connections.write().await;
        let user_conns = map.entry(user_id).or_default();
        if user_conns
            .insert(connection.id.clone(), connection)
            .is_none()
        {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
        debug!(%user_id, connections = user_conns.len(), "connection registered");
    }

    /// Deregister a connection.
    ///
    /// Removing the user's last connection removes the user from the
    /// presence map entirely. A no-op (returning `false`) when the
    /// connection is already gone — duplicate and late disconnect events
    /// are expected.
    pub async fn remove(&self, user_id: UserId, connection_id: &ConnectionId) -> bool {
        let mut map = self.connections.write().await;
        let Some(user_conns) = map.get_mut(&user_id) else {
            return false;
        };
        let removed = user_conns.remove(connection_id).is_some();
        if removed {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
            if user_conns.is_empty() {
                let _ = map.remove(&user_id);
                debug!(%user_id, "user went offline");
            }
        }
        removed
    }

    /// All live connections of a user. Empty when offline — offline is a
    /// valid, expected state, not an error.
    pub async fn connections_of(&self, user_id: UserId) -> Vec<Arc<ClientConnection>> {
        let map = self.connections.read().await;
        map.get(&user_id)
            .map(|conns| conns.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of all currently present users, sorted for determinism.
    pub async fn online_user_ids(&self) -> Vec<UserId> {
        let map = self.connections.read().await;
        let mut ids: Vec<UserId> = map.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether a user has at least one live connection.
    pub async fn is_online(&self, user_id: UserId) -> bool {
        self.connections.read().await.contains_key(&user_id)
    }

    /// Total live connections across all users.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Number of users with at least one live connection.
    pub async fn online_user_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
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
    use parley_core::{Identity, Role};
    use tokio::sync::mpsc;

    fn make_conn(user: i64, id: &str) -> Arc<ClientConnection> {
        let (tx, rx) = mpsc::channel(32);
        // Receiver leaks in tests that never read; keep channel open.
        std::mem::forget(rx);
        Arc::new(ClientConnection::new(
            ConnectionId::from(id),
            Identity::new(UserId::new(user), Role::Customer),
            tx,
        ))
    }

    #[tokio::test]
    async fn add_then_lookup() {
        let reg = ConnectionRegistry::new();
        reg.add(make_conn(7, "c1")).await;
        let conns = reg.connections_of(UserId::new(7)).await;
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].id.as_str(), "c1");
    }

    #[tokio::test]
    async fn offline_user_yields_empty_set() {
        let reg = ConnectionRegistry::new();
        assert!(reg.connections_of(UserId::new(99)).await.is_empty());
        assert!(!reg.is_online(UserId::new(99)).await);
    }

    #[tokio::test]
    async fn multiple_connections_per_user() {
        let reg = ConnectionRegistry::new();
        reg.add(make_conn(7, "c1")).await;
        reg.add(make_conn(7, "c2")).await;
        assert_eq!(reg.connections_of(UserId::new(7)).await.len(), 2);
        assert_eq!(reg.connection_count(), 2);
        assert_eq!(reg.online_user_count().await, 1);
    }

    #[tokio::test]
    async fn add_is_idempotent_per_connection_id() {
        let reg = ConnectionRegistry::new();
        reg.add(make_conn(7, "c1")).await;
        reg.add(make_conn(7, "c1")).await;
        assert_eq!(reg.connection_count(), 1);
        assert_eq!(reg.connections_of(UserId::new(7)).await.len(), 1);
    }

    #[tokio::test]
    async fn removing_last_connection_removes_user() {
        let reg = ConnectionRegistry::new();
        reg.add(make_conn(7, "c1")).await;
        assert!(reg.is_online(UserId::new(7)).await);

        assert!(reg.remove(UserId::new(7), &ConnectionId::from("c1")).await);
        assert!(!reg.is_online(UserId::new(7)).await);
        assert!(reg.online_user_ids().await.is_empty());
        assert_eq!(reg.connection_count(), 0);
    }

    #[tokio::test]
    async fn removing_one_of_two_keeps_user_online() {
        let reg = ConnectionRegistry::new();
        reg.add(make_conn(7, "c1")).await;
        reg.add(make_conn(7, "c2")).await;

        assert!(reg.remove(UserId::new(7), &ConnectionId::from("c1")).await);
        assert!(reg.is_online(UserId::new(7)).await);
        assert_eq!(reg.connections_of(UserId::new(7)).await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_remove_is_noop() {
        let reg = ConnectionRegistry::new();
        reg.add(make_conn(7, "c1")).await;
        assert!(reg.remove(UserId::new(7), &ConnectionId::from("c1")).await);
        // Late/duplicate disconnect events must not fail or underflow.
        assert!(!reg.remove(UserId::new(7), &ConnectionId::from("c1")).await);
        assert!(!reg.remove(UserId::new(8), &ConnectionId::from("cX")).await);
        assert_eq!(reg.connection_count(), 0);
    }

    #[tokio::test]
    async fn online_user_ids_sorted_snapshot() {
        let reg = ConnectionRegistry::new();
        reg.add(make_conn(9, "c9")).await;
        reg.add(make_conn(3, "c3")).await;
        reg.add(make_conn(5, "c5")).await;

        let ids = reg.online_user_ids().await;
        assert_eq!(ids, vec![UserId::new(3), UserId::new(5), UserId::new(9)]);
    }

    #[tokio::test]
    async fn presence_add_remove_sequences() {
        // connections_of(u) is empty iff every add has a matching remove.
        let reg = ConnectionRegistry::new();
        let user = UserId::new(4);

        reg.add(make_conn(4, "a")).await;
        reg.add(make_conn(4, "b")).await;
        reg.add(make_conn(4, "c")).await;
        assert!(reg.remove(user, &ConnectionId::from("b")).await);
        assert!(reg.remove(user, &ConnectionId::from("a")).await);
        assert!(!reg.connections_of(user).await.is_empty());

        assert!(reg.remove(user, &ConnectionId::from("c")).await);
        assert!(reg.connections_of(user).await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_adds_and_removes_are_consistent() {
        let reg = Arc::new(ConnectionRegistry::new());

        let mut handles = Vec::new();
        for user in 0..8i64 {
            for c in 0..4 {
                let reg = reg.clone();
                handles.push(tokio::spawn(async move {
                    let id = format!("u{user}_c{c}");
                    reg.add(make_conn(user, &id)).await;
                    if c % 2 == 0 {
                        let _ = reg.remove(UserId::new(user), &ConnectionId::from(id.as_str())).await;
                    }
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 8 users × 2 surviving connections each.
        assert_eq!(reg.connection_count(), 16);
        assert_eq!(reg.online_user_count().await, 8);
        for user in 0..8i64 {
            assert_eq!(reg.connections_of(UserId::new(user)).await.len(), 2);
        }
    }
}
