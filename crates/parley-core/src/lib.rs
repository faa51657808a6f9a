//! # parley-core
//!
//! Foundation types for the Parley realtime support-messaging hub.
//!
//! - Branded ID newtypes (connections, groups)
//! - Authenticated identity and roles
//! - The durable message model and attachment references
//! - The hub error taxonomy

#![deny(unsafe_code)]

pub mod errors;
pub mod identity;
pub mod ids;
pub mod message;

pub use errors::HubError;
pub use identity::{Identity, Role, UserId};
pub use ids::{ConnectionId, GroupName};
pub use message::{Attachment, AttachmentKind, Message, NewMessage};
