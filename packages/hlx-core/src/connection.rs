//! The byte-oriented connection abstraction the core consumes.
//!
//! Spec §1 keeps platform socket/serial I/O "deliberately out of scope":
//! the core only sees a connection as an opaque write-sink with
//! send/close events. Production TCP/serial transports, and the in-memory
//! transport used by tests, both implement [`Connection`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::HlxResult;

/// Opaque identity for one peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single peer connection: something handlers can write frames to and
/// close, with no knowledge of what's on the other end.
#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Writes raw bytes (a fully-rendered `(BODY)` frame) to the peer.
    async fn send(&self, bytes: &[u8]) -> HlxResult<()>;

    /// Closes the connection. Idempotent.
    async fn close(&self) -> HlxResult<()>;
}

#[cfg(test)]
pub mod test_support {
    //! An in-memory [`Connection`] used by dispatcher/exchange-manager
    //! tests in this crate (not exported outside `#[cfg(test)]`).

    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use super::*;

    /// Records every frame sent to it and can be fed inbound frames
    /// through `inbound_tx` from the test's point of view.
    pub struct MemoryConnection {
        id: ConnectionId,
        pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl MemoryConnection {
        pub fn new() -> Self {
            Self {
                id: ConnectionId::new(),
                sent: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(false)),
            }
        }

        pub fn sent_bodies(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .map(|f| String::from_utf8(f[1..f.len() - 1].to_vec()).unwrap())
                .collect()
        }

        pub fn is_closed(&self) -> bool {
            *self.closed.lock()
        }
    }

    impl Default for MemoryConnection {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Connection for MemoryConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        async fn send(&self, bytes: &[u8]) -> HlxResult<()> {
            self.sent.lock().push(bytes.to_vec());
            Ok(())
        }

        async fn close(&self) -> HlxResult<()> {
            *self.closed.lock() = true;
            Ok(())
        }
    }

    /// A duplex pair for exchange-manager tests: a channel standing in
    /// for "bytes the peer sent us", paired with a `MemoryConnection`
    /// recording "bytes we sent the peer".
    pub fn duplex() -> (
        Arc<MemoryConnection>,
        mpsc::UnboundedSender<Vec<u8>>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        let conn = Arc::new(MemoryConnection::new());
        let (tx, rx) = mpsc::unbounded_channel();
        (conn, tx, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MemoryConnection;
    use super::*;

    #[tokio::test]
    async fn memory_connection_records_sent_frames() {
        let conn = MemoryConnection::new();
        conn.send(b"(QX)").await.unwrap();
        assert_eq!(conn.sent_bodies(), vec!["QX"]);
    }

    #[tokio::test]
    async fn memory_connection_tracks_close() {
        let conn = MemoryConnection::new();
        assert!(!conn.is_closed());
        conn.close().await.unwrap();
        assert!(conn.is_closed());
    }

    #[test]
    fn connection_ids_are_distinct() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }
}
