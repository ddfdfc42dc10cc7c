//! Per-client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::counter;
use mixsync_core::ClientId;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::metrics::WS_SEND_DROPS_TOTAL;

/// A connected WebSocket client.
///
/// Outbound frames go through a bounded queue drained by the socket writer;
/// a full queue drops the frame rather than blocking the sender.
pub struct ClientConnection {
    /// Identity used for unicast updates.
    pub id: ClientId,
    tx: mpsc::Sender<Arc<String>>,
    /// When the upgrade completed.
    pub connected_at: Instant,
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped: AtomicU64,
    sync: CancellationToken,
}

impl ClientConnection {
    /// Wrap the sending half of the client's outbound queue.
    ///
    /// `sync` cancels any full-sync walk running for this client.
    pub fn new(id: ClientId, tx: mpsc::Sender<Arc<String>>, sync: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped: AtomicU64::new(0),
            sync,
        }
    }

    /// Queue a text frame.
    ///
    /// Returns `false` and counts a drop when the queue is full or closed.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            counter!(WS_SEND_DROPS_TOTAL).increment(1);
            false
        }
    }

    /// Frames dropped so far.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Record activity from the client.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Read and clear the alive flag.
    ///
    /// Returns `true` if the client was heard from since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the client was last heard from.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Token for this client's full-sync walk.
    pub fn sync_token(&self) -> &CancellationToken {
        &self.sync
    }

    /// Stop any in-flight full sync for this client.
    pub fn cancel_sync(&self) {
        self.sync.cancel();
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(capacity: usize) -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = ClientConnection::new(ClientId::from_raw("c1"), tx, CancellationToken::new());
        (conn, rx)
    }

    #[tokio::test]
    async fn send_delivers_in_order() {
        let (conn, mut rx) = make_connection(8);
        assert!(conn.send(Arc::new("a".into())));
        assert!(conn.send(Arc::new("b".into())));
        assert_eq!(rx.recv().await.unwrap().as_str(), "a");
        assert_eq!(rx.recv().await.unwrap().as_str(), "b");
        assert_eq!(conn.drop_count(), 0);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.send(Arc::new("first".into())));
        assert!(!conn.send(Arc::new("second".into())));
        assert!(!conn.send(Arc::new("third".into())));
        assert_eq!(conn.drop_count(), 2);
    }

    #[test]
    fn closed_queue_drops() {
        let (conn, rx) = make_connection(4);
        drop(rx);
        assert!(!conn.send(Arc::new("x".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn alive_flag_is_consumed_by_check() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
        assert!(conn.last_pong_elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn cancel_sync_trips_token() {
        let (conn, _rx) = make_connection(1);
        let token = conn.sync_token().clone();
        assert!(!token.is_cancelled());
        conn.cancel_sync();
        assert!(token.is_cancelled());
    }
}
