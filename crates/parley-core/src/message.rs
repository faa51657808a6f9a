//! The durable message model.
//!
//! A message is created by the relay on an inbound send, persisted with a
//! store-assigned id and UTC timestamp, and never mutated afterwards except
//! for the read flag. The invariant "at least one of content or attachment
//! is present" is checked here before the row ever reaches the store (the
//! store enforces it again with a SQL CHECK).
//!
//! All wire shapes are a single strict camelCase schema — the legacy
//! system's casing drift is not carried forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Category tag for an uploaded attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// Raster or vector image.
    Image,
    /// Video clip.
    Video,
    /// Anything else (documents, archives, ...).
    File,
}

impl AttachmentKind {
    /// Stable string tag used in the store and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
        }
    }

    /// Parse a stored tag. Unknown tags map to [`AttachmentKind::File`]
    /// rather than failing a whole history read.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "image" => Self::Image,
            "video" => Self::Video,
            _ => Self::File,
        }
    }
}

/// Opaque reference to a file uploaded through the external upload
/// collaborator. The hub never touches the bytes, only this triple
/// (plus the size the uploader reported).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Where the uploaded file lives.
    pub url: String,
    /// Display name shown to users.
    pub name: String,
    /// Category tag.
    pub kind: AttachmentKind,
    /// Size in bytes as reported at upload time.
    pub size_bytes: u64,
}

/// A persisted chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned identifier, monotonically unique. Stable across
    /// live push and history fetch — clients dedup on it.
    pub id: i64,
    /// Authenticated sender.
    pub sender_id: UserId,
    /// Recipient (the support identity for customer sends).
    pub recipient_id: UserId,
    /// Text body. `None` when the message is attachment-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Attached file reference, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// Server-assigned send time (UTC on the wire; rendering in local
    /// time is the client's concern).
    pub sent_at: DateTime<Utc>,
    /// Whether the recipient has read the message.
    pub read: bool,
}

/// A message as submitted by a sender, before the store assigns an id
/// and timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMessage {
    /// Authenticated sender.
    pub sender_id: UserId,
    /// Resolved recipient.
    pub recipient_id: UserId,
    /// Text body.
    pub content: Option<String>,
    /// Attached file reference.
    pub attachment: Option<Attachment>,
}

impl NewMessage {
    /// Whether the message carries any payload at all.
    ///
    /// Whitespace-only content counts as empty; an attachment alone is
    /// enough.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let has_text = self
            .content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        !has_text && self.attachment.is_none()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
