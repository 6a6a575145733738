//! `FavoritesController` — owns the favorite table, same shape as
//! `SourcesController` plus a per-id `Query`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::controllers::context::{load_container, parse_identifier, require_arity, save_container, DirtyFlag};
use crate::dispatch::{Dispatcher, FnHandler};
use crate::error::HlxResult;
use crate::events::{StateChange, StateChangeKind, StateChangeSink};
use crate::model::collection::check_name_unique;
use crate::model::{Favorite, IdentifierCollection, Identifier, FAVORITE_MAX};
use crate::protocol::catalog::{render_name_set, render_query_favorite, Verb};
use crate::protocol::framing::render_frame;

pub struct FavoritesController {
    favorites: Mutex<IdentifierCollection<Favorite>>,
    dirty: Arc<DirtyFlag>,
    sink: Arc<dyn StateChangeSink>,
}

impl FavoritesController {
    pub fn new(dirty: Arc<DirtyFlag>, sink: Arc<dyn StateChangeSink>) -> Self {
        Self {
            favorites: Mutex::new(IdentifierCollection::new(FAVORITE_MAX, "favorite", Favorite::new)),
            dirty,
            sink,
        }
    }

    /// Registers this controller's own verbs (`QueryFavorite`). `SetName`
    /// is demultiplexed from the shared `NameSet` verb instead.
    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) {
        let this = self.clone();
        dispatcher.register(
            Verb::QueryFavorite,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let this = this.clone();
                        async move { this.handle_query(connection, captures).await }
                    })),
        );
    }

    async fn handle_query(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let id = match parse_identifier(&captures[0], FAVORITE_MAX, "favorite") {
            Ok(id) => id,
            Err(_) => {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
        };
        self.write_query_response(&connection, id).await;
    }

    async fn write_query_response(&self, connection: &Arc<dyn Connection>, id: Identifier) {
        let name = {
            let favorites = self.favorites.lock();
            match favorites.get(id) {
                Ok(f) => f.name().as_str().to_string(),
                Err(_) => {
                    let _ = connection.send(&render_frame("ERROR")).await;
                    return;
                }
            }
        };
        let _ = connection
            .send(&render_frame(&render_name_set('F', id, &name)))
            .await;
        let _ = connection
            .send(&render_frame(&render_query_favorite(id)))
            .await;
    }

    /// `SetName(id, name)`, unconditional.
    pub async fn set_name(&self, connection: Arc<dyn Connection>, id: Identifier, name: &str) {
        let outcome = {
            let mut favorites = self.favorites.lock();
            if favorites.get(id).is_err()
            || check_name_unique(&favorites, id, name, |f| f.name().as_str()).is_err()
            {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
            match favorites.get_mut(id).unwrap().name_mut().set(name) {
                Ok(outcome) => outcome,
                Err(_) => {
                    let _ = connection.send(&render_frame("ERROR")).await;
                    return;
                }
            }
        };

        if outcome.is_changed() {
            self.dirty.mark();
            self.sink
                .on_state_change(StateChange::new(StateChangeKind::FavoriteName, Some(id), name));
        }
        let _ = connection
            .send(&render_frame(&render_name_set('F', id, name)))
            .await;
    }

    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let frames: Vec<String> = {
            let favorites = self.favorites.lock();
            favorites
                .iter()
                .map(|(id, f)| render_name_set('F', id, f.name().as_str()))
                .collect()
        };
        for body in frames {
            let _ = connection.send(&render_frame(&body)).await;
        }
    }

    pub fn reset_to_defaults(&self) {
        self.favorites.lock().reset(Favorite::new);
    }

    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let entries: Vec<Favorite> = load_container(doc, "Favorites")?;
        self.favorites.lock().load_backup(entries)
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        let favorites = self.favorites.lock();
        save_container(doc, "Favorites", favorites.to_backup());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;

    fn controller() -> Arc<FavoritesController> {
        Arc::new(FavoritesController::new(
                Arc::new(DirtyFlag::new()),
                Arc::new(NoopStateChangeSink),
            ))
    }

    #[tokio::test]
    async fn query_emits_name_then_echoes_request() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QF2").await;
        assert_eq!(
            conn.sent_bodies(),
            vec!["NF2,\"Favorite Name 2\"".to_string(), "QF2".to_string()]
        );
    }

    #[tokio::test]
    async fn query_out_of_range_emits_error() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QF99").await;
        assert_eq!(conn.sent_bodies(), vec!["ERROR"]);
    }

    #[tokio::test]
    async fn set_name_marks_dirty_on_change() {
        let ctrl = controller();
        let conn = Arc::new(MemoryConnection::new());
        ctrl.set_name(conn.clone(), 1, "Morning Jazz").await;
        assert!(ctrl.dirty.is_dirty());
        assert_eq!(conn.sent_bodies(), vec!["NF1,\"Morning Jazz\""]);
    }
}
