//! The hub: presence registry, group membership, and the message relay.

pub mod groups;
pub mod registry;
pub mod relay;

pub use groups::GroupMembership;
pub use registry::ConnectionRegistry;
pub use relay::ChatHub;
