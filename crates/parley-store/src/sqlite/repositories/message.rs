//! Message repository — append, conversation scan, read flag.
//!
//! The id and timestamp are assigned here, at persistence time: callers
//! hand in a [`NewMessage`] and get back the full row. That keeps the
//! "server-assigned, monotonically unique id" guarantee in one place.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use parley_core::NewMessage;

use crate::errors::Result;
use crate::sqlite::row_types::MessageRow;

/// Message repository — stateless, every method takes `&Connection`.
pub struct MessageRepo;

impl MessageRepo {
    /// Append a message, assigning its id and UTC timestamp.
    pub fn append(conn: &Connection, msg: &NewMessage) -> Result<MessageRow> {
        let sent_at = Utc::now().to_rfc3339();
        let (file_url, file_name, file_kind, file_size) = match &msg.attachment {
            Some(att) => {
                let size = i64::try_from(att.size_bytes).unwrap_or(i64::MAX);
                (
                    Some(att.url.as_str()),
                    Some(att.name.as_str()),
                    Some(att.kind.as_str()),
                    Some(size),
                )
            }
            None => (None, None, None, None),
        };

        let _ = conn.execute(
            "INSERT INTO messages (sender_id, recipient_id, content, file_url, file_name,
             file_kind, file_size, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                msg.sender_id.get(),
                msg.recipient_id.get(),
                msg.content,
                file_url,
                file_name,
                file_kind,
                file_size,
                sent_at,
            ],
        )?;

        Ok(MessageRow {
            id: conn.last_insert_rowid(),
            sender_id: msg.sender_id.get(),
            recipient_id: msg.recipient_id.get(),
            content: msg.content.clone(),
            file_url: file_url.map(String::from),
            file_name: file_name.map(String::from),
            file_kind: file_kind.map(String::from),
            file_size,
            sent_at,
            is_read: false,
        })
    }

    /// Fetch the most recent `limit` messages between two participants
    /// (in either direction), returned ascending by id.
    ///
    /// Id order and sent-time order coincide because both are assigned in
    /// the same insert.
    pub fn conversation(
        conn: &Connection,
        participant_a: i64,
        participant_b: i64,
        limit: usize,
    ) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, recipient_id, content, file_url, file_name,
                    file_kind, file_size, sent_at, is_read
             FROM messages
             WHERE (sender_id = ?1 AND recipient_id = ?2)
                OR (sender_id = ?2 AND recipient_id = ?1)
             ORDER BY id DESC
             LIMIT ?3",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = stmt
            .query_map(params![participant_a, participant_b, limit], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.reverse();
        Ok(rows)
    }

    /// Get a message by id.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
        let row = conn
            .query_row(
                "SELECT id, sender_id, recipient_id, content, file_url, file_name,
                        file_kind, file_size, sent_at, is_read
                 FROM messages WHERE id = ?1",
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Mark every unread message sent by `counterpart` to `reader` as
    /// read. Returns the number of rows updated.
    pub fn mark_conversation_read(
        conn: &Connection,
        reader: i64,
        counterpart: i64,
    ) -> Result<usize> {
        let changed = conn.execute(
            "UPDATE messages SET is_read = 1
             WHERE recipient_id = ?1 AND sender_id = ?2 AND is_read = 0",
            params![reader, counterpart],
        )?;
        Ok(changed)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
        Ok(MessageRow {
            id: row.get("id")?,
            sender_id: row.get("sender_id")?,
            recipient_id: row.get("recipient_id")?,
            content: row.get("content")?,
            file_url: row.get("file_url")?,
            file_name: row.get("file_name")?,
            file_kind: row.get("file_kind")?,
            file_size: row.get("file_size")?,
            sent_at: row.get("sent_at")?,
            is_read: row.get("is_read")?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::sqlite::migrations::run_migrations;
    use parley_core::{Attachment, AttachmentKind, UserId};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn text_message(from: i64, to: i64, content: &str) -> NewMessage {
        NewMessage {
            sender_id: UserId::new(from),
            recipient_id: UserId::new(to),
            content: Some(content.into()),
            attachment: None,
        }
    }

    #[test]
    fn append_assigns_id_and_timestamp() {
        let conn = setup();
        let row = MessageRepo::append(&conn, &text_message(42, 1, "hi")).unwrap();
        assert!(row.id >= 1);
        assert!(!row.sent_at.is_empty());
        assert!(!row.is_read);
        assert_eq!(row.content.as_deref(), Some("hi"));
    }

    #[test]
    fn append_ids_are_monotonic() {
        let conn = setup();
        let a = MessageRepo::append(&conn, &text_message(42, 1, "one")).unwrap();
        let b = MessageRepo::append(&conn, &text_message(1, 42, "two")).unwrap();
        let c = MessageRepo::append(&conn, &text_message(42, 1, "three")).unwrap();
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn append_with_attachment() {
        let conn = setup();
        let msg = NewMessage {
            sender_id: UserId::new(7),
            recipient_id: UserId::new(1),
            content: None,
            attachment: Some(Attachment {
                url: "https://cdn.example.com/u/receipt.png".into(),
                name: "receipt.png".into(),
                kind: AttachmentKind::Image,
                size_bytes: 2048,
            }),
        };
        let row = MessageRepo::append(&conn, &msg).unwrap();
        assert_eq!(row.file_url.as_deref(), Some("https://cdn.example.com/u/receipt.png"));
        assert_eq!(row.file_kind.as_deref(), Some("image"));
        assert_eq!(row.file_size, Some(2048));
        assert!(row.content.is_none());
    }

    #[test]
    fn conversation_is_bidirectional_and_ascending() {
        let conn = setup();
        MessageRepo::append(&conn, &text_message(5, 1, "order status?")).unwrap();
        MessageRepo::append(&conn, &text_message(1, 5, "shipped")).unwrap();
        MessageRepo::append(&conn, &text_message(5, 1, "thanks")).unwrap();
        // Unrelated conversation must not leak in.
        MessageRepo::append(&conn, &text_message(9, 1, "other customer")).unwrap();

        let rows = MessageRepo::conversation(&conn, 5, 1, 100).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(rows[0].content.as_deref(), Some("order status?"));
        assert_eq!(rows[1].content.as_deref(), Some("shipped"));
        assert_eq!(rows[2].content.as_deref(), Some("thanks"));
    }

    #[test]
    fn conversation_order_of_participants_is_irrelevant() {
        let conn = setup();
        MessageRepo::append(&conn, &text_message(5, 1, "a")).unwrap();
        MessageRepo::append(&conn, &text_message(1, 5, "b")).unwrap();

        let forward = MessageRepo::conversation(&conn, 5, 1, 100).unwrap();
        let reverse = MessageRepo::conversation(&conn, 1, 5, 100).unwrap();
        assert_eq!(forward, reverse);
    }

    #[test]
    fn conversation_caps_at_most_recent() {
        let conn = setup();
        for i in 0..10 {
            MessageRepo::append(&conn, &text_message(5, 1, &format!("m{i}"))).unwrap();
        }
        let rows = MessageRepo::conversation(&conn, 5, 1, 3).unwrap();
        assert_eq!(rows.len(), 3);
        // The window holds the latest three, still ascending.
        assert_eq!(rows[0].content.as_deref(), Some("m7"));
        assert_eq!(rows[2].content.as_deref(), Some("m9"));
    }

    #[test]
    fn conversation_empty_when_no_messages() {
        let conn = setup();
        let rows = MessageRepo::conversation(&conn, 5, 1, 100).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn get_by_id_roundtrip() {
        let conn = setup();
        let row = MessageRepo::append(&conn, &text_message(42, 1, "hi")).unwrap();
        let found = MessageRepo::get_by_id(&conn, row.id).unwrap().unwrap();
        assert_eq!(found, row);
    }

    #[test]
    fn get_by_id_not_found() {
        let conn = setup();
        assert!(MessageRepo::get_by_id(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn mark_conversation_read_is_directional() {
        let conn = setup();
        MessageRepo::append(&conn, &text_message(5, 1, "from customer")).unwrap();
        let outbound = MessageRepo::append(&conn, &text_message(1, 5, "from support")).unwrap();

        // Support (user 1) reads its conversation with customer 5.
        let changed = MessageRepo::mark_conversation_read(&conn, 1, 5).unwrap();
        assert_eq!(changed, 1);

        // The customer-bound message stays unread.
        let still_unread = MessageRepo::get_by_id(&conn, outbound.id).unwrap().unwrap();
        assert!(!still_unread.is_read);
    }

    #[test]
    fn mark_conversation_read_is_idempotent() {
        let conn = setup();
        MessageRepo::append(&conn, &text_message(5, 1, "hello")).unwrap();
        assert_eq!(MessageRepo::mark_conversation_read(&conn, 1, 5).unwrap(), 1);
        assert_eq!(MessageRepo::mark_conversation_read(&conn, 1, 5).unwrap(), 0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // For any interleaving of sends among a handful of users, a
            // conversation scan returns exactly the two-party traffic,
            // ascending by id.
            #[test]
            fn conversation_scan_filters_and_orders(
                ops in proptest::collection::vec((1..5i64, 1..5i64, "[a-z]{1,8}"), 1..40)
            ) {
                let conn = setup();
                for (from, to, content) in &ops {
                    let _ = MessageRepo::append(&conn, &text_message(*from, *to, content)).unwrap();
                }

                let rows = MessageRepo::conversation(&conn, 1, 2, 100).unwrap();

                prop_assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
                let expected = ops
                    .iter()
                    .filter(|(f, t, _)| (*f == 1 && *t == 2) || (*f == 2 && *t == 1))
                    .count();
                prop_assert_eq!(rows.len(), expected);
                prop_assert!(rows.iter().all(|r| (r.sender_id == 1 && r.recipient_id == 2)
                    || (r.sender_id == 2 && r.recipient_id == 1)));
            }
        }
    }
}
