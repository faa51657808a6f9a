//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use parley_core::{ConnectionId, Identity};

/// One live client connection.
///
/// The identity is fixed at upgrade time by the external verifier and is
/// the only source of sender/authorization information for everything this
/// connection does — payloads never carry identity.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Verified identity (immutable for the connection's lifetime).
    pub identity: Identity,
    /// Send channel to the connection's WebSocket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last ping.
    pub is_alive: AtomicBool,
    /// When the last Pong (or any activity) was received.
    last_pong: Mutex<Instant>,
    /// Count of messages dropped due to a full or closed channel.
    pub dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: ConnectionId, identity: Identity, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            identity,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Enqueue a serialized frame for the client.
    ///
    /// Returns `false` if the channel is full or closed, and increments
    /// the dropped counter. Never blocks — the relay relies on this to
    /// fan out without holding locks across I/O.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or inbound frame received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last sign of life.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for the heartbeat loop.
    ///
    /// Returns `true` if the client showed life since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{Role, UserId};

    fn make_connection() -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new(
            ConnectionId::from("conn_1"),
            Identity::new(UserId::new(42), Role::Customer),
            tx,
        );
        (conn, rx)
    }

    #[test]
    fn create_connection() {
        let (conn, _rx) = make_connection();
        assert_eq!(conn.id.as_str(), "conn_1");
        assert_eq!(conn.identity.user_id, UserId::new(42));
        assert!(conn.is_alive.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn send_frame_success() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send(Arc::new("hello".into())));
        let frame = rx.recv().await.unwrap();
        assert_eq!(&*frame, "hello");
    }

    #[tokio::test]
    async fn send_to_closed_channel_returns_false() {
        let (conn, rx) = make_connection();
        drop(rx);
        assert!(!conn.send(Arc::new("hello".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_to_full_channel_returns_false() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new(
            ConnectionId::from("conn_2"),
            Identity::new(UserId::new(7), Role::Support),
            tx,
        );
        assert!(conn.send(Arc::new("first".into())));
        assert!(!conn.send(Arc::new("second".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn mark_alive_and_check() {
        let (conn, _rx) = make_connection();
        // Initially alive.
        assert!(conn.check_alive());
        // The check consumed the flag.
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn last_pong_resets_on_mark_alive() {
        let (conn, _rx) = make_connection();
        std::thread::sleep(Duration::from_millis(10));
        let before = conn.last_pong_elapsed();
        conn.mark_alive();
        assert!(conn.last_pong_elapsed() < before);
    }

    #[test]
    fn identity_is_immutable_and_copied() {
        let (conn, _rx) = make_connection();
        let identity = conn.identity;
        assert_eq!(identity, conn.identity);
        assert!(!conn.identity.is_support());
    }

    #[tokio::test]
    async fn frames_are_delivered_in_order() {
        let (conn, mut rx) = make_connection();
        for i in 0..5 {
            assert!(conn.send(Arc::new(format!("frame_{i}"))));
        }
        for i in 0..5 {
            let frame = rx.recv().await.unwrap();
            assert_eq!(&*frame, &format!("frame_{i}"));
        }
    }

    #[test]
    fn age_increases() {
        let (conn, _rx) = make_connection();
        let age1 = conn.age();
        std::thread::sleep(Duration::from_millis(5));
        assert!(conn.age() > age1);
    }
}
