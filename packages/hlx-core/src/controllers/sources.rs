//! `SourcesController` — owns the source table.
//!
//! `SetName` is the only mutation; it arrives through the shared `NameSet`
//! verb (kind `O`), demultiplexed to [`SourcesController::set_name`] rather
//! than registered here directly. `QueryCurrent` fan-out calls
//! [`SourcesController::write_current_snapshot`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::controllers::context::{load_container, save_container, DirtyFlag};
use crate::error::HlxResult;
use crate::events::{StateChange, StateChangeKind, StateChangeSink};
use crate::model::collection::check_name_unique;
use crate::model::{IdentifierCollection, Identifier, Source, SOURCE_MAX};
use crate::protocol::catalog::render_name_set;
use crate::protocol::framing::render_frame;

pub struct SourcesController {
    sources: Mutex<IdentifierCollection<Source>>,
    dirty: Arc<DirtyFlag>,
    sink: Arc<dyn StateChangeSink>,
}

impl SourcesController {
    pub fn new(dirty: Arc<DirtyFlag>, sink: Arc<dyn StateChangeSink>) -> Self {
        Self {
            sources: Mutex::new(IdentifierCollection::new(SOURCE_MAX, "source", Source::new)),
            dirty,
            sink,
        }
    }

    /// `SetName(id, name)`: unconditional — the response is emitted whether
    /// or not the name actually changed.
    pub async fn set_name(&self, connection: Arc<dyn Connection>, id: Identifier, name: &str) {
        let outcome = {
            let mut sources = self.sources.lock();
            if sources.get(id).is_err() || check_name_unique(&sources, id, name, |s| s.name().as_str()).is_err() {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
            match sources.get_mut(id).unwrap().name_mut().set(name) {
                Ok(outcome) => outcome,
                Err(_) => {
                    let _ = connection.send(&render_frame("ERROR")).await;
                    return;
                }
            }
        };

        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::SourceName,
                    Some(id),
                    name,
                ));
        }
        let _ = connection
            .send(&render_frame(&render_name_set('O', id, name)))
            .await;
    }

    /// Writes one `SetName`-style frame per source, ascending identifier
    /// order.
    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let frames: Vec<String> = {
            let sources = self.sources.lock();
            sources
                .iter()
                .map(|(id, s)| render_name_set('O', id, s.name().as_str()))
                .collect()
        };
        for body in frames {
            let _ = connection.send(&render_frame(&body)).await;
        }
    }

    pub fn reset_to_defaults(&self) {
        self.sources.lock().reset(Source::new);
    }

    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let entries: Vec<Source> = load_container(doc, "Sources")?;
        self.sources.lock().load_backup(entries)
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        let sources = self.sources.lock();
        save_container(doc, "Sources", sources.to_backup());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;

    fn controller() -> SourcesController {
        SourcesController::new(Arc::new(DirtyFlag::new()), Arc::new(NoopStateChangeSink))
    }

    #[tokio::test]
    async fn set_name_emits_response_and_marks_dirty() {
        let ctrl = controller();
        let conn = Arc::new(MemoryConnection::new());
        ctrl.set_name(conn.clone(), 3, "Turntable").await;
        assert_eq!(conn.sent_bodies(), vec!["NO3,\"Turntable\""]);
        assert!(ctrl.dirty.is_dirty());
    }

    #[tokio::test]
    async fn set_name_same_value_still_emits_response_but_not_dirty() {
        let ctrl = controller();
        let conn = Arc::new(MemoryConnection::new());
        ctrl.set_name(conn.clone(), 1, "Turntable").await;
        ctrl.dirty.take();
        ctrl.set_name(conn.clone(), 1, "Turntable").await;
        assert_eq!(conn.sent_bodies().len(), 2);
        assert!(!ctrl.dirty.is_dirty());
    }

    #[tokio::test]
    async fn set_name_rejects_duplicate() {
        let ctrl = controller();
        let conn = Arc::new(MemoryConnection::new());
        ctrl.set_name(conn.clone(), 1, "Source Name 2").await;
        assert_eq!(conn.sent_bodies(), vec!["ERROR"]);
    }

    #[tokio::test]
    async fn query_current_emits_one_frame_per_source_in_order() {
        let ctrl = controller();
        let conn = Arc::new(MemoryConnection::new());
        ctrl.write_current_snapshot(&(conn.clone() as Arc<dyn Connection>)).await;
        assert_eq!(conn.sent_bodies().len(), SOURCE_MAX as usize);
        assert_eq!(conn.sent_bodies()[0], "NO1,\"Source Name 1\"");
    }
}
