//! Downstream session table.
//!
//! One [`DownstreamSession`] exists per connected SSE subscriber; it holds
//! only what's needed to deliver a reply out of band on that subscriber's
//! stream. There is no ring buffer or broadcast replay here — a lost
//! connection means a lost reply, by design (no persistent journaling or
//! replay is in scope).

use std::collections::HashMap;
use std::sync::Arc;

use axum::response::sse::Event;
use rand::RngCore;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};

/// One connected SSE subscriber.
struct DownstreamSession {
    sink: mpsc::UnboundedSender<Event>,
}

/// Process-local table of open downstream sessions, keyed by session id.
pub struct SessionTable {
    sessions: RwLock<HashMap<String, DownstreamSession>>,
}

impl SessionTable {
    #[must_use]
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }

    /// Registers a new session under a fresh 32-hex-character id and
    /// returns it along with the receiving half of its event channel.
    pub async fn open(&self) -> (String, mpsc::UnboundedReceiver<Event>) {
        loop {
            let id = generate_session_id();
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&id) {
                continue;
            }
            let (tx, rx) = mpsc::unbounded_channel();
            sessions.insert(id.clone(), DownstreamSession { sink: tx });
            return (id, rx);
        }
    }

    /// Removes a session, e.g. on client disconnect.
    pub async fn close(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Writes a `message` event carrying `payload` to the named session's
    /// SSE stream. Returns `false` if the session is unknown — an unknown
    /// `session_id` causes the request to be silently dropped.
    pub async fn send(&self, id: &str, payload: &Value) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(session) => session.sink.send(Event::default().data(payload.to_string())).is_ok(),
            None => false,
        }
    }

    /// Current number of open sessions, reported by `server_status`.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 16 random bytes, hex-encoded — 32 hex characters on the wire.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(32), |mut acc, byte| {
        use std::fmt::Write as _;
        let _ = write!(acc, "{byte:02x}");
        acc
    })
}

/// Drops the session from the table when its SSE stream is dropped, however
/// that happened (client disconnect, server shutdown aborting the stream).
pub struct SessionGuard {
    table: Arc<SessionTable>,
    id: String,
}

impl SessionGuard {
    #[must_use]
    pub fn new(table: Arc<SessionTable>, id: String) -> Self {
        Self { table, id }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let table = self.table.clone();
        let id = std::mem::take(&mut self.id);
        tokio::spawn(async move { table.close(&id).await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_assigns_unique_thirty_two_char_ids() {
        let table = SessionTable::new();
        let (a, _rx_a) = table.open().await;
        let (b, _rx_b) = table.open().await;
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_ne!(a, b);
        assert_eq!(table.count().await, 2);
    }

    #[tokio::test]
    async fn close_removes_from_table() {
        let table = SessionTable::new();
        let (id, _rx) = table.open().await;
        assert_eq!(table.count().await, 1);
        table.close(&id).await;
        assert_eq!(table.count().await, 0);
    }

    #[tokio::test]
    async fn send_to_unknown_session_returns_false() {
        let table = SessionTable::new();
        let delivered = table.send("deadbeefdeadbeefdeadbeefdeadbeef", &serde_json::json!({})).await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn send_to_known_session_delivers_event() {
        let table = SessionTable::new();
        let (id, mut rx) = table.open().await;
        let delivered = table.send(&id, &serde_json::json!({"id": 1})).await;
        assert!(delivered);
        assert!(rx.recv().await.is_some());
    }
}
