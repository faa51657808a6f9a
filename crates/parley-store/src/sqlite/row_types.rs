//! Raw row types mirroring table columns.
//!
//! Rows are the repository layer's currency; conversion into the domain
//! [`Message`] (including timestamp parsing) happens at the store boundary
//! so repositories stay a thin mapping over SQL.

use chrono::{DateTime, Utc};
use parley_core::{Attachment, AttachmentKind, Message, UserId};

use crate::errors::{Result, StoreError};

/// One row of the `messages` table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRow {
    /// AUTOINCREMENT primary key.
    pub id: i64,
    /// Sender user id.
    pub sender_id: i64,
    /// Recipient user id.
    pub recipient_id: i64,
    /// Text body, if any.
    pub content: Option<String>,
    /// Attachment URL, if any.
    pub file_url: Option<String>,
    /// Attachment display name.
    pub file_name: Option<String>,
    /// Attachment kind tag (`image` | `video` | `file`).
    pub file_kind: Option<String>,
    /// Attachment size in bytes.
    pub file_size: Option<i64>,
    /// RFC 3339 UTC timestamp as stored.
    pub sent_at: String,
    /// Read flag.
    pub is_read: bool,
}

impl MessageRow {
    /// Convert into the domain message type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the stored timestamp does not
    /// parse as RFC 3339 — that would mean the row was written by
    /// something other than this store.
    pub fn into_message(self) -> Result<Message> {
        let sent_at: DateTime<Utc> = self
            .sent_at
            .parse()
            .map_err(|e| StoreError::Internal(format!("unparseable sent_at '{}': {e}", self.sent_at)))?;

        let attachment = match (self.file_url, self.file_name, self.file_kind) {
            (Some(url), Some(name), Some(kind)) => Some(Attachment {
                url,
                name,
                kind: AttachmentKind::from_tag(&kind),
                size_bytes: u64::try_from(self.file_size.unwrap_or(0)).unwrap_or(0),
            }),
            _ => None,
        };

        Ok(Message {
            id: self.id,
            sender_id: UserId::new(self.sender_id),
            recipient_id: UserId::new(self.recipient_id),
            content: self.content,
            attachment,
            sent_at,
            read: self.is_read,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
