//! `FrontPanelController` — brightness and lock state.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::controllers::context::{parse_ranged, require_arity, DirtyFlag};
use crate::dispatch::{Dispatcher, FnHandler};
use crate::error::{HlxError, HlxResult};
use crate::events::{StateChange, StateChangeKind, StateChangeSink};
use crate::model::front_panel::BRIGHTNESS_MAX;
use crate::model::FrontPanel;
use crate::protocol::catalog::{render_front_panel_brightness, render_front_panel_lock, Verb};
use crate::protocol::framing::render_frame;

pub struct FrontPanelController {
    state: Mutex<FrontPanel>,
    dirty: Arc<DirtyFlag>,
    sink: Arc<dyn StateChangeSink>,
}

impl FrontPanelController {
    pub fn new(dirty: Arc<DirtyFlag>, sink: Arc<dyn StateChangeSink>) -> Self {
        Self {
            state: Mutex::new(FrontPanel::default()),
            dirty,
            sink,
        }
    }

    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) {
        let a = self.clone();
        dispatcher.register(
            Verb::FrontPanelBrightness,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let a = a.clone();
                        async move { a.handle_brightness(connection, captures).await }
                    })),
        );
        let b = self.clone();
        dispatcher.register(
            Verb::FrontPanelLock,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let b = b.clone();
                        async move { b.handle_lock(connection, captures).await }
                    })),
        );
        let c = self.clone();
        dispatcher.register(
            Verb::FrontPanelQuery,
            Arc::new(FnHandler::new(move |connection, _captures| {
                        let c = c.clone();
                        async move { c.write_current_snapshot(&connection).await }
                    })),
        );
    }

    async fn handle_brightness(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let level = match parse_ranged(&captures[0], 0u8, BRIGHTNESS_MAX, "brightness") {
            Ok(v) => v,
            Err(_) => {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
        };
        let outcome = match self.state.lock().set_brightness(level) {
            Ok(outcome) => outcome,
            Err(_) => {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::FrontPanelBrightness,
                    None,
                    level.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_front_panel_brightness(level)))
            .await;
    }

    async fn handle_lock(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let locked = captures[0] == "1";
        let outcome = self.state.lock().set_locked(locked);
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::FrontPanelLocked,
                    None,
                    locked.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_front_panel_lock(locked)))
            .await;
    }

    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let (brightness, locked) = {
            let state = self.state.lock();
            (state.brightness(), state.is_locked())
        };
        let _ = connection
            .send(&render_frame(&render_front_panel_brightness(brightness)))
            .await;
        let _ = connection
            .send(&render_frame(&render_front_panel_lock(locked)))
            .await;
    }

    pub fn reset_to_defaults(&self) {
        *self.state.lock() = FrontPanel::default();
    }

    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let value = doc
            .get("Front Panel")
            .ok_or_else(|| HlxError::MissingConfiguration("Front Panel".to_string()))?;
        let state: FrontPanel = serde_json::from_value(value.clone())?;
        *self.state.lock() = state;
        Ok(())
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        doc["Front Panel"] =
        serde_json::to_value(*self.state.lock()).expect("front panel backup always serializes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;

    fn controller() -> Arc<FrontPanelController> {
        Arc::new(FrontPanelController::new(
                Arc::new(DirtyFlag::new()),
                Arc::new(NoopStateChangeSink),
            ))
    }

    #[tokio::test]
    async fn set_brightness_rejects_out_of_range() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "FB9").await;
        assert_eq!(conn.sent_bodies(), vec!["ERROR"]);
    }

    #[tokio::test]
    async fn query_emits_both_attributes() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QF").await;
        assert_eq!(conn.sent_bodies(), vec!["FB2", "FL0"]);
    }
}
