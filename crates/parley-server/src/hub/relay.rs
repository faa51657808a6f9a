//! The message relay — validate, persist, fan out.
//!
//! The relay owns the protocol semantics: sender identity always comes
//! from the calling connection, recipients resolve through the registry
//! (direct) or the support group (role-addressed), and a message is only
//! pushed after it has been durably appended. Fan-out is best-effort: a
//! push to a dying connection is dropped per-target and recovered by the
//! client through history on reconnect.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use parley_core::{
    Attachment, GroupName, HubError, Identity, Message, NewMessage, UserId,
};
use parley_store::MessageStore;

use crate::hub::groups::GroupMembership;
use crate::hub::registry::ConnectionRegistry;
use crate::metrics::{
    CHAT_MESSAGES_PERSISTED_TOTAL, CHAT_PUSH_DELIVERED_TOTAL, CHAT_PUSH_DROPPED_TOTAL,
};
use crate::rpc::types::PushEvent;
use crate::websocket::connection::ClientConnection;

/// The relay hub: presence registry + group membership + message store.
pub struct ChatHub {
    registry: ConnectionRegistry,
    groups: GroupMembership,
    store: Arc<MessageStore>,
    support_user_id: UserId,
    history_limit: usize,
}

impl ChatHub {
    /// Create a hub around a message store.
    ///
    /// `support_user_id` is the deployment's single well-known support
    /// identity; every customer conversation funnels through it.
    #[must_use]
    pub fn new(store: Arc<MessageStore>, support_user_id: UserId, history_limit: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            groups: GroupMembership::new(),
            store,
            support_user_id,
            history_limit,
        }
    }

    /// The presence registry (read access for health/tests).
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// The configured support identity.
    #[must_use]
    pub fn support_user_id(&self) -> UserId {
        self.support_user_id
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Open a connection: register presence and, for support identities,
    /// join the well-known support group.
    pub async fn connect(&self, connection: Arc<ClientConnection>) {
        self.registry.add(connection.clone()).await;
        if connection.identity.is_support() {
            self.groups
                .join(GroupName::support(), connection.clone())
                .await;
        }
        info!(
            conn_id = %connection.id,
            user_id = %connection.identity.user_id,
            role = %connection.identity.role,
            "connection open"
        );
    }

    /// Close a connection: deregister presence and purge every group
    /// membership. Safe to call more than once per connection.
    pub async fn disconnect(&self, connection: &ClientConnection) {
        let removed = self
            .registry
            .remove(connection.identity.user_id, &connection.id)
            .await;
        let purged = self.groups.purge_connection(&connection.id).await;
        debug!(
            conn_id = %connection.id,
            user_id = %connection.identity.user_id,
            removed,
            purged_groups = purged,
            "connection closed"
        );
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sends
    // ─────────────────────────────────────────────────────────────────────

    /// Customer → support send.
    ///
    /// The recipient is fixed to the well-known support identity. On
    /// success the persisted message is pushed to every support-group
    /// connection and echoed to the sender's other live connections.
    pub async fn send_from_customer(
        &self,
        sender: &Arc<ClientConnection>,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Message, HubError> {
        let draft = NewMessage {
            sender_id: sender.identity.user_id,
            recipient_id: self.support_user_id,
            content,
            attachment,
        };
        if draft.is_empty() {
            return Err(HubError::EmptyMessage);
        }

        let message = self.store.append(&draft).map_err(HubError::store)?;
        counter!(CHAT_MESSAGES_PERSISTED_TOTAL).increment(1);

        let mut targets = self.groups.members_of(&GroupName::support()).await;
        targets.extend(self.registry.connections_of(sender.identity.user_id).await);
        self.fan_out(&message, targets, Some(&sender.id));

        Ok(message)
    }

    /// Support → customer directed send.
    ///
    /// Only the well-known support identity may call this. On success the
    /// persisted message is pushed to every live connection of the
    /// recipient and echoed to the sender's other live connections.
    pub async fn send_from_support(
        &self,
        sender: &Arc<ClientConnection>,
        recipient: UserId,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> Result<Message, HubError> {
        if sender.identity.user_id != self.support_user_id {
            return Err(HubError::Forbidden(
                "only the support identity may send directed messages".into(),
            ));
        }
        if recipient.is_zero() {
            return Err(HubError::MissingRecipient);
        }
        let draft = NewMessage {
            sender_id: sender.identity.user_id,
            recipient_id: recipient,
            content,
            attachment,
        };
        if draft.is_empty() {
            return Err(HubError::EmptyMessage);
        }

        let message = self.store.append(&draft).map_err(HubError::store)?;
        counter!(CHAT_MESSAGES_PERSISTED_TOTAL).increment(1);

        let mut targets = self.registry.connections_of(recipient).await;
        targets.extend(self.registry.connections_of(sender.identity.user_id).await);
        self.fan_out(&message, targets, Some(&sender.id));

        Ok(message)
    }

    /// Push one persisted message to a set of connections.
    ///
    /// Serialized once and shared; the originating connection is skipped
    /// (its client already has the message from the RPC response), as is
    /// any duplicate target. Per-target failures are logged and counted,
    /// never propagated — a dead connection's disconnect event is already
    /// removing it from the registry.
    fn fan_out(
        &self,
        message: &Message,
        targets: Vec<Arc<ClientConnection>>,
        origin: Option<&parley_core::ConnectionId>,
    ) {
        let event = PushEvent::message_received(message);
        let frame = match serde_json::to_string(&event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(message_id = message.id, error = %e, "failed to serialize push event");
                return;
            }
        };

        let mut seen = HashSet::new();
        let mut delivered = 0u64;
        for conn in targets {
            if Some(&conn.id) == origin || !seen.insert(conn.id.clone()) {
                continue;
            }
            if conn.send(Arc::clone(&frame)) {
                delivered += 1;
            } else {
                counter!(CHAT_PUSH_DROPPED_TOTAL).increment(1);
                warn!(
                    conn_id = %conn.id,
                    message_id = message.id,
                    "dropped push to unresponsive connection"
                );
            }
        }
        counter!(CHAT_PUSH_DELIVERED_TOTAL).increment(delivered);
        debug!(message_id = message.id, delivered, "fan-out complete");
    }

    // ─────────────────────────────────────────────────────────────────────
    // History & read state
    // ─────────────────────────────────────────────────────────────────────

    /// Resolve which conversation counterpart a caller may address.
    ///
    /// Non-privileged callers are always pinned to the support identity,
    /// whatever they asked for; privileged callers must name one.
    fn resolve_counterpart(
        &self,
        caller: Identity,
        counterpart: Option<UserId>,
    ) -> Result<UserId, HubError> {
        if caller.user_id == self.support_user_id {
            match counterpart {
                Some(id) if !id.is_zero() => Ok(id),
                _ => Err(HubError::MissingParameter("counterpartUserId".into())),
            }
        } else {
            Ok(self.support_user_id)
        }
    }

    /// Conversation history for a caller, ascending by send time,
    /// capped at the most recent `history_limit` messages.
    pub async fn history_for(
        &self,
        caller: Identity,
        counterpart: Option<UserId>,
    ) -> Result<Vec<Message>, HubError> {
        let counterpart = self.resolve_counterpart(caller, counterpart)?;
        self.store
            .conversation(caller.user_id, counterpart, self.history_limit)
            .map_err(HubError::store)
    }

    /// Mark the caller's inbound side of a conversation as read.
    /// Returns how many messages changed.
    pub async fn mark_read(
        &self,
        caller: Identity,
        counterpart: Option<UserId>,
    ) -> Result<usize, HubError> {
        let counterpart = self.resolve_counterpart(caller, counterpart)?;
        self.store
            .mark_conversation_read(caller.user_id, counterpart)
            .map_err(HubError::store)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Groups & presence
    // ─────────────────────────────────────────────────────────────────────

    /// Join an arbitrary named group (the per-resource comment streams).
    ///
    /// The well-known support group is server-managed and may not be
    /// joined explicitly.
    pub async fn join_group(
        &self,
        connection: Arc<ClientConnection>,
        group: GroupName,
    ) -> Result<(), HubError> {
        if group == GroupName::support() {
            return Err(HubError::Forbidden(
                "the support group is server-managed".into(),
            ));
        }
        self.groups.join(group, connection).await;
        Ok(())
    }

    /// Leave a previously joined group.
    pub async fn leave_group(
        &self,
        connection: &ClientConnection,
        group: &GroupName,
    ) -> Result<bool, HubError> {
        if *group == GroupName::support() {
            return Err(HubError::Forbidden(
                "the support group is server-managed".into(),
            ));
        }
        Ok(self.groups.leave(group, &connection.id).await)
    }

    /// Presence snapshot, restricted to support callers.
    pub async fn online_user_ids(&self, caller: Identity) -> Result<Vec<UserId>, HubError> {
        if caller.user_id != self.support_user_id {
            return Err(HubError::Forbidden(
                "presence is visible to support only".into(),
            ));
        }
        Ok(self.registry.online_user_ids().await)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
