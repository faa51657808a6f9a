//! # parley-store
//!
//! `SQLite` message persistence for the Parley hub.
//!
//! - Connection pooling with WAL mode and enforced pragmas
//! - Embedded, idempotent schema migrations
//! - A stateless repository layer (`&Connection` in, rows out)
//! - The high-level [`MessageStore`] used by the relay and the
//!   history service
//!
//! The store is append-mostly: messages are inserted once, queried by
//! conversation pair, and only ever mutated through the read flag.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use sqlite::connection::{
    new_file, new_in_memory, ConnectionConfig, ConnectionPool, PooledConnection,
};
pub use sqlite::migrations::run_migrations;
pub use store::message_store::MessageStore;
