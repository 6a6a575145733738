//! Demultiplexes the shared `NameSet` wire verb to the right sub-controller,
//! keyed by the kind character each request carries.
//!
//! No sub-controller registers `Verb::NameSet` itself — five of them expose
//! a `set_name` method instead, and this is the one place that reads the
//! kind character and routes.

use std::sync::Arc;

use crate::connection::Connection;
use crate::controllers::context::{parse_identifier, require_arity};
use crate::controllers::{
    EqualizerPresetsController, FavoritesController, GroupsController, SourcesController,
    ZonesController,
};
use crate::dispatch::{Dispatcher, FnHandler};
use crate::model::{EQUALIZER_PRESET_MAX, FAVORITE_MAX, GROUP_MAX, SOURCE_MAX, ZONE_MAX};
use crate::protocol::catalog::Verb;
use crate::protocol::framing::render_frame;

pub struct NameDispatch {
    sources: Arc<SourcesController>,
    zones: Arc<ZonesController>,
    groups: Arc<GroupsController>,
    presets: Arc<EqualizerPresetsController>,
    favorites: Arc<FavoritesController>,
}

impl NameDispatch {
    pub fn new(
        sources: Arc<SourcesController>,
        zones: Arc<ZonesController>,
        groups: Arc<GroupsController>,
        presets: Arc<EqualizerPresetsController>,
        favorites: Arc<FavoritesController>,
    ) -> Self {
        Self {
            sources,
            zones,
            groups,
            presets,
            favorites,
        }
    }

    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) {
        let a = self.clone();
        dispatcher.register(
            Verb::NameSet,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let a = a.clone();
                        async move { a.handle(connection, captures).await }
                    })),
        );
    }

    async fn handle(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 3).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let kind = captures[0].chars().next().unwrap_or('\0');
        let name = &captures[2];

        let (max, what): (u8, &'static str) = match kind {
            'O' => (SOURCE_MAX, "source"),
            'Z' => (ZONE_MAX, "zone"),
            'G' => (GROUP_MAX, "group"),
            'E' => (EQUALIZER_PRESET_MAX, "preset"),
            'F' => (FAVORITE_MAX, "favorite"),
            _ => {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
        };
        let id = match parse_identifier(&captures[1], max, what) {
            Ok(id) => id,
            Err(_) => {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
        };

        match kind {
            'O' => self.sources.set_name(connection, id, name).await,
            'Z' => self.zones.set_name(connection, id, name).await,
            'G' => self.groups.set_name(connection, id, name).await,
            'E' => self.presets.set_name(connection, id, name).await,
            'F' => self.favorites.set_name(connection, id, name).await,
            _ => unreachable!(),
        }
    }
}
