//! High-level store API over the repository layer.

pub mod message_store;
