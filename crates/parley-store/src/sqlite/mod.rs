//! `SQLite` backend: pooling, migrations, row types, and repositories.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;
