//! Server-side dispatch: matches an inbound frame to a registered
//! handler and writes the response on the originating connection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::connection::Connection;
use crate::protocol::catalog::{self, Verb};
use crate::protocol::framing::render_frame;

/// One bound handler: given the originating connection and the matched
/// verb's positional captures, does whatever the sub-controller needs
/// and writes its own response frame(s) to `connection`.
///
/// Spec §4.3: "Each handler MUST either write exactly one response
/// payload followed by `SendResponse` or call `SendErrorResponse`." The
/// save-to-backup handler is the sole exception, permitted to emit two
/// payloads (§4.5.7's two-phase save protocol).
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, connection: Arc<dyn Connection>, captures: Vec<String>);
}

/// Maps `Verb → Handler` and dispatches inbound frame bodies.
///
/// `register`/`unregister` are idempotent by identity: registering the
/// same verb twice replaces the prior handler; unregistering a verb with
/// no handler is a no-op.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<Verb, Arc<dyn Handler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, verb: Verb, handler: Arc<dyn Handler>) {
        self.handlers.write().insert(verb, handler);
    }

    pub fn unregister(&self, verb: Verb) {
        self.handlers.write().remove(&verb);
    }

    /// Recognizes `body` against the catalog and invokes the bound
    /// handler; on no hit (unrecognized verb, or a verb with no handler
    /// registered) writes `(ERROR)` directly (: "on no hit,
    /// emit `(ERROR)`").
    pub async fn on_frame(&self, connection: Arc<dyn Connection>, body: &str) {
        let handler = match catalog::recognize(body) {
            Some(m) => self.handlers.read().get(&m.verb).cloned().map(|h| (h, m.captures)),
            None => None,
        };

        match handler {
            Some((handler, captures)) => handler.handle(connection, captures).await,
            None => {
                log::debug!("dispatcher: no handler for frame body '{body}'");
                let _ = connection.send(&render_frame("ERROR")).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;

    struct EchoHandler;

    #[async_trait]
    impl Handler for EchoHandler {
        async fn handle(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
            let _ = connection
                .send(&render_frame(&format!("QZ{}", captures[0])))
                .await;
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(Verb::QueryZone, Arc::new(EchoHandler));

        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QZ3").await;

        assert_eq!(conn.sent_bodies(), vec!["QZ3"]);
    }

    #[tokio::test]
    async fn unrecognized_frame_emits_error() {
        let dispatcher = Dispatcher::new();
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "NOTAVERB").await;
        assert_eq!(conn.sent_bodies(), vec!["ERROR"]);
    }

    #[tokio::test]
    async fn recognized_verb_with_no_handler_emits_error() {
        let dispatcher = Dispatcher::new();
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QZ3").await;
        assert_eq!(conn.sent_bodies(), vec!["ERROR"]);
    }

    #[tokio::test]
    async fn unregister_reverts_to_error() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(Verb::QueryZone, Arc::new(EchoHandler));
        dispatcher.unregister(Verb::QueryZone);

        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QZ3").await;
        assert_eq!(conn.sent_bodies(), vec!["ERROR"]);
    }
}
