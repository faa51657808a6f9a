//! # parley-server
//!
//! Axum HTTP + `WebSocket` server for the Parley support-messaging hub.
//!
//! - Connection registry (per-user presence) and group membership
//! - The relay hub: validate → persist → fan out
//! - RPC dispatch over WebSocket text frames
//! - Heartbeat ping/pong, health endpoint, Prometheus metrics
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod rpc;
pub mod server;
pub mod shutdown;
pub mod websocket;
