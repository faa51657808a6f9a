//! Error types for the message store.
//!
//! [`StoreError`] is the primary error type returned by all store
//! operations. The surface is small enough for exhaustive matching at the
//! call boundary in the relay, where any variant aborts the send.

use thiserror::Error;

/// Errors that can occur during message store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// Requested message was not found.
    #[error("message not found: {0}")]
    MessageNotFound(i64),

    /// Internal error (e.g. an unparseable stored timestamp).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
