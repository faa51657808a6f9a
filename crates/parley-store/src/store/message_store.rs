//! High-level [`MessageStore`] API.
//!
//! Wraps the connection pool and the repository layer behind the narrow
//! save/query surface the relay and the history service consume:
//! `append`, `conversation`, `mark_conversation_read`. Domain conversion
//! (row → [`Message`]) happens here so callers never see raw rows.

use parley_core::{Message, NewMessage, UserId};

use crate::errors::Result;
use crate::sqlite::connection::{ConnectionPool, PooledConnection};
use crate::sqlite::repositories::message::MessageRepo;
use crate::sqlite::row_types::MessageRow;

/// High-level message store wrapping a connection pool.
pub struct MessageStore {
    pool: ConnectionPool,
}

impl MessageStore {
    /// Create a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Append a message. The store assigns the id and UTC timestamp;
    /// the returned [`Message`] is exactly what history will later
    /// return for this row.
    pub fn append(&self, msg: &NewMessage) -> Result<Message> {
        let conn = self.conn()?;
        MessageRepo::append(&conn, msg)?.into_message()
    }

    /// Fetch the conversation between two participants: the most recent
    /// `limit` messages in either direction, ascending by id.
    pub fn conversation(
        &self,
        participant_a: UserId,
        participant_b: UserId,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        MessageRepo::conversation(&conn, participant_a.get(), participant_b.get(), limit)?
            .into_iter()
            .map(MessageRow::into_message)
            .collect()
    }

    /// Mark every unread message from `counterpart` to `reader` as read.
    /// Returns how many rows changed.
    pub fn mark_conversation_read(&self, reader: UserId, counterpart: UserId) -> Result<usize> {
        let conn = self.conn()?;
        MessageRepo::mark_conversation_read(&conn, reader.get(), counterpart.get())
    }

    /// Get a single message by id.
    pub fn get(&self, id: i64) -> Result<Option<Message>> {
        let conn = self.conn()?;
        MessageRepo::get_by_id(&conn, id)?
            .map(MessageRow::into_message)
            .transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
