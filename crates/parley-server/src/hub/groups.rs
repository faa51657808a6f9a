//! Group membership — named broadcast sets of live connections.
//!
//! Groups are a coarse addressing layer over the registry: the well-known
//! support group receives every customer send, and arbitrary named groups
//! back the per-resource comment streams. Membership is always a subset of
//! live connections; the hub purges a connection from every group on the
//! disconnect event it observes, even though the registry and this store
//! are logically separate.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use parley_core::{ConnectionId, GroupName};

use crate::websocket::connection::ClientConnection;

/// Named sets of live connections.
pub struct GroupMembership {
    groups: RwLock<HashMap<GroupName, HashMap<ConnectionId, Arc<ClientConnection>>>>,
}

impl GroupMembership {
    /// Create an empty membership store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to a group. Idempotent per connection id.
    pub async fn join(&self, group: GroupName, connection: Arc<ClientConnection>) {
        let mut groups = self.groups.write().await;
        let members = groups.entry(group.clone()).or_default();
        let _ = members.insert(connection.id.clone(), connection);
        debug!(group = %group, members = members.len(), "connection joined group");
    }

    /// Remove a connection from one group. No-op if absent. Empty groups
    /// are dropped from the map.
    pub async fn leave(&self, group: &GroupName, connection_id: &ConnectionId) -> bool {
        let mut groups = self.groups.write().await;
        let Some(members) = groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(connection_id).is_some();
        if members.is_empty() {
            let _ = groups.remove(group);
        }
        removed
    }

    /// Current members of a group. Empty for unknown groups.
    pub async fn members_of(&self, group: &GroupName) -> Vec<Arc<ClientConnection>> {
        let groups = self.groups.read().await;
        groups
            .get(group)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a connection from every group it had joined.
    ///
    /// Invoked on every disconnect so group membership never outlives the
    /// connection. Returns how many groups the connection was removed from.
    pub async fn purge_connection(&self, connection_id: &ConnectionId) -> usize {
        let mut groups = self.groups.write().await;
        let mut purged = 0;
        groups.retain(|_, members| {
            if members.remove(connection_id).is_some() {
                purged += 1;
            }
            !members.is_empty()
        });
        purged
    }

    /// Number of non-empty groups.
    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}

impl Default for GroupMembership {
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
    use parley_core::{Identity, Role, UserId};
    use tokio::sync::mpsc;

    fn make_conn(id: &str) -> Arc<ClientConnection> {
        let (tx, rx) = mpsc::channel(32);
        std::mem::forget(rx);
        Arc::new(ClientConnection::new(
            ConnectionId::from(id),
            Identity::new(UserId::new(1), Role::Support),
            tx,
        ))
    }

    #[tokio::test]
    async fn join_and_members_of() {
        let groups = GroupMembership::new();
        groups.join(GroupName::support(), make_conn("s1")).await;
        groups.join(GroupName::support(), make_conn("s2")).await;

        let members = groups.members_of(&GroupName::support()).await;
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn unknown_group_is_empty() {
        let groups = GroupMembership::new();
        assert!(groups.members_of(&GroupName::from("product-17")).await.is_empty());
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let groups = GroupMembership::new();
        groups.join(GroupName::support(), make_conn("s1")).await;
        groups.join(GroupName::support(), make_conn("s1")).await;
        assert_eq!(groups.members_of(&GroupName::support()).await.len(), 1);
    }

    #[tokio::test]
    async fn leave_removes_member() {
        let groups = GroupMembership::new();
        groups.join(GroupName::support(), make_conn("s1")).await;
        assert!(groups.leave(&GroupName::support(), &ConnectionId::from("s1")).await);
        assert!(groups.members_of(&GroupName::support()).await.is_empty());
    }

    #[tokio::test]
    async fn leave_absent_is_noop() {
        let groups = GroupMembership::new();
        assert!(!groups.leave(&GroupName::support(), &ConnectionId::from("sX")).await);
        groups.join(GroupName::support(), make_conn("s1")).await;
        assert!(!groups.leave(&GroupName::support(), &ConnectionId::from("sX")).await);
    }

    #[tokio::test]
    async fn empty_groups_are_dropped() {
        let groups = GroupMembership::new();
        groups.join(GroupName::from("product-17"), make_conn("c1")).await;
        assert_eq!(groups.group_count().await, 1);
        let _ = groups.leave(&GroupName::from("product-17"), &ConnectionId::from("c1")).await;
        assert_eq!(groups.group_count().await, 0);
    }

    #[tokio::test]
    async fn purge_removes_from_all_groups() {
        let groups = GroupMembership::new();
        groups.join(GroupName::support(), make_conn("s1")).await;
        groups.join(GroupName::from("product-17"), make_conn("s1")).await;
        groups.join(GroupName::from("product-17"), make_conn("s2")).await;

        let purged = groups.purge_connection(&ConnectionId::from("s1")).await;
        assert_eq!(purged, 2);
        assert!(groups.members_of(&GroupName::support()).await.is_empty());
        assert_eq!(groups.members_of(&GroupName::from("product-17")).await.len(), 1);
        // The now-empty support group is gone entirely.
        assert_eq!(groups.group_count().await, 1);
    }

    #[tokio::test]
    async fn purge_unknown_connection_is_noop() {
        let groups = GroupMembership::new();
        groups.join(GroupName::support(), make_conn("s1")).await;
        assert_eq!(groups.purge_connection(&ConnectionId::from("ghost")).await, 0);
        assert_eq!(groups.members_of(&GroupName::support()).await.len(), 1);
    }
}
