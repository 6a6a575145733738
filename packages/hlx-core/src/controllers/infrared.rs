//! `InfraredController` — a single boolean.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::controllers::context::{require_arity, DirtyFlag};
use crate::dispatch::{Dispatcher, FnHandler};
use crate::error::{HlxError, HlxResult};
use crate::events::{StateChange, StateChangeKind, StateChangeSink};
use crate::model::Infrared;
use crate::protocol::catalog::{render_infrared_set, Verb};
use crate::protocol::framing::render_frame;

pub struct InfraredController {
    state: Mutex<Infrared>,
    dirty: Arc<DirtyFlag>,
    sink: Arc<dyn StateChangeSink>,
}

impl InfraredController {
    pub fn new(dirty: Arc<DirtyFlag>, sink: Arc<dyn StateChangeSink>) -> Self {
        Self {
            state: Mutex::new(Infrared::default()),
            dirty,
            sink,
        }
    }

    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) {
        let a = self.clone();
        dispatcher.register(
            Verb::InfraredSet,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let a = a.clone();
                        async move { a.handle_set(connection, captures).await }
                    })),
        );
        let b = self.clone();
        dispatcher.register(
            Verb::InfraredQuery,
            Arc::new(FnHandler::new(move |connection, _captures| {
                        let b = b.clone();
                        async move { b.write_current_snapshot(&connection).await }
                    })),
        );
    }

    async fn handle_set(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let disabled = captures[0] == "1";
        let outcome = self.state.lock().set_disabled(disabled);
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::Infrared,
                    None,
                    disabled.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_infrared_set(disabled)))
            .await;
    }

    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let disabled = self.state.lock().is_disabled();
        let _ = connection
            .send(&render_frame(&render_infrared_set(disabled)))
            .await;
    }

    pub fn reset_to_defaults(&self) {
        *self.state.lock() = Infrared::default();
    }

    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let value = doc
            .get("Infrared")
            .ok_or_else(|| HlxError::MissingConfiguration("Infrared".to_string()))?;
        let state: Infrared = serde_json::from_value(value.clone())?;
        *self.state.lock() = state;
        Ok(())
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        doc["Infrared"] =
        serde_json::to_value(*self.state.lock()).expect("infrared backup always serializes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;

    #[tokio::test]
    async fn set_then_query_reflects_state() {
        let ctrl = Arc::new(InfraredController::new(
                Arc::new(DirtyFlag::new()),
                Arc::new(NoopStateChangeSink),
            ));
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "IR1").await;
        assert_eq!(conn.sent_bodies(), vec!["IR1"]);
        assert!(ctrl.dirty.is_dirty());

        let conn2 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn2.clone(), "QIR").await;
        assert_eq!(conn2.sent_bodies(), vec!["IR1"]);
    }
}
