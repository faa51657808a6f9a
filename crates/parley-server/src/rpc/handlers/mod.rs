//! RPC method handlers.
//!
//! One module per surface: chat sends and read state, history, presence,
//! groups. [`register_all`] wires the full method table.

pub mod chat;
pub mod group;
pub mod history;
pub mod presence;

use crate::rpc::registry::MethodRegistry;

/// Register every built-in method.
pub fn register_all(registry: &mut MethodRegistry) {
    registry.register("chat.send", chat::SendHandler);
    registry.register("chat.sendTo", chat::SendToHandler);
    registry.register("chat.markRead", chat::MarkReadHandler);
    registry.register("chat.history", history::HistoryHandler);
    registry.register("presence.online", presence::OnlineHandler);
    registry.register("group.join", group::JoinHandler);
    registry.register("group.leave", group::LeaveHandler);
}
