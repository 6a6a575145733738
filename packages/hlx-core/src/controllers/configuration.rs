//! `ConfigurationController` — the backup document lifecycle: load-or-reset
//! at startup, the two-phase `SaveToBackup` bookend, and the 30-second
//! autosave timer.
//!
//! Every other sub-controller exposes `load_from_backup`/`save_to_backup`
//! against a shared `serde_json::Value` document; this controller owns the
//! document's lifecycle but never its shape — each sub-controller reads and
//! writes only its own top-level key. `Verb::QueryCurrent` is the one
//! wire verb this controller registers on every sub-controller's behalf,
//! fanning out to each one's `write_current_snapshot`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::connection::Connection;
use crate::controllers::context::{require_arity, DirtyFlag};
use crate::controllers::{
    EqualizerPresetsController, FavoritesController, FrontPanelController, GroupsController,
    InfraredController, NetworkController, SourcesController, ZonesController,
};
use crate::dispatch::{Dispatcher, FnHandler};
use crate::error::{HlxError, HlxResult};
use crate::protocol::catalog::{render_load, render_query_current, render_reset, render_save, Verb};
use crate::protocol::framing::render_frame;

/// How the backup document is actually read and written. Production code
/// talks to the filesystem; tests use an in-memory stand-in.
#[async_trait]
pub trait BackupStorage: Send + Sync {
    async fn load(&self) -> HlxResult<serde_json::Value>;
    async fn save(&self, document: &serde_json::Value) -> HlxResult<()>;
}

/// Whole-file-replacement JSON storage: the new document is written to a
/// sibling temp path and renamed over the target, which is atomic on the
/// same filesystem.
pub struct FileBackupStorage {
    path: PathBuf,
}

impl FileBackupStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BackupStorage for FileBackupStorage {
    async fn load(&self) -> HlxResult<serde_json::Value> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    HlxError::MissingConfiguration(self.path.display().to_string())
                } else {
                    HlxError::from(err)
                }
            })?;
        serde_json::from_slice(&bytes).map_err(HlxError::from)
    }

    async fn save(&self, document: &serde_json::Value) -> HlxResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

pub struct ConfigurationController {
    storage: Arc<dyn BackupStorage>,
    dirty: Arc<DirtyFlag>,
    sources: Arc<SourcesController>,
    favorites: Arc<FavoritesController>,
    presets: Arc<EqualizerPresetsController>,
    front_panel: Arc<FrontPanelController>,
    infrared: Arc<InfraredController>,
    network: Arc<NetworkController>,
    zones: Arc<ZonesController>,
    groups: Arc<GroupsController>,
}

impl ConfigurationController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<dyn BackupStorage>,
        dirty: Arc<DirtyFlag>,
        sources: Arc<SourcesController>,
        favorites: Arc<FavoritesController>,
        presets: Arc<EqualizerPresetsController>,
        front_panel: Arc<FrontPanelController>,
        infrared: Arc<InfraredController>,
        network: Arc<NetworkController>,
        zones: Arc<ZonesController>,
        groups: Arc<GroupsController>,
    ) -> Self {
        Self {
            storage,
            dirty,
            sources,
            favorites,
            presets,
            front_panel,
            infrared,
            network,
            zones,
            groups,
        }
    }

    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) {
        macro_rules! on {
            ($verb:expr, $method:ident) => {{
                    let a = self.clone();
                    dispatcher.register(
                        $verb,
                        Arc::new(FnHandler::new(move |connection, captures| {
                                    let a = a.clone();
                                    async move { a.$method(connection, captures).await }
                                })),
                    );
                }};
        }
        on!(Verb::Load, handle_load);
        on!(Verb::QueryCurrent, handle_query_current);
        on!(Verb::Reset, handle_reset);
        on!(Verb::Save, handle_save);
    }

    /// Load-or-bootstrap at startup: read the backup document
    /// and fan it out to every sub-controller; if storage is empty (first
    /// run) or the document is structurally invalid, reset everything to
    /// defaults and write a fresh document out. Only a failure of that
    /// fallback save propagates —: "only catastrophic I/O
    /// initialization errors during startup abort the process".
    pub async fn bootstrap(&self) -> HlxResult<()> {
        if self.perform_load().await.is_ok() {
            return Ok(());
        }
        self.perform_reset();
        self.perform_save().await
    }

    async fn perform_load(&self) -> HlxResult<()> {
        let doc = self.storage.load().await?;
        self.sources.load_from_backup(&doc)?;
        self.favorites.load_from_backup(&doc)?;
        self.presets.load_from_backup(&doc)?;
        self.front_panel.load_from_backup(&doc)?;
        self.infrared.load_from_backup(&doc)?;
        self.network.load_from_backup(&doc)?;
        self.zones.load_from_backup(&doc)?;
        self.groups.load_from_backup(&doc)?;
        Ok(())
    }

    fn perform_reset(&self) {
        self.sources.reset_to_defaults();
        self.favorites.reset_to_defaults();
        self.presets.reset_to_defaults();
        self.front_panel.reset_to_defaults();
        self.infrared.reset_to_defaults();
        self.network.reset_to_defaults();
        self.zones.reset_to_defaults();
        self.groups.reset_to_defaults();
    }

    async fn perform_save(&self) -> HlxResult<()> {
        let mut doc = serde_json::json!({});
        self.sources.save_to_backup(&mut doc);
        self.favorites.save_to_backup(&mut doc);
        self.presets.save_to_backup(&mut doc);
        self.front_panel.save_to_backup(&mut doc);
        self.infrared.save_to_backup(&mut doc);
        self.network.save_to_backup(&mut doc);
        self.zones.save_to_backup(&mut doc);
        self.groups.save_to_backup(&mut doc);
        self.storage.save(&doc).await?;
        self.dirty.take();
        Ok(())
    }

    /// `LX`: load only, no reset fallback — a structurally bad document on
    /// an explicit client-triggered load is reported as `(ERROR)`, not
    /// silently repaired.
    async fn handle_load(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 0).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        match self.perform_load().await {
            Ok(()) => {
                let _ = connection.send(&render_frame(&render_load())).await;
            }
            Err(_) => {
                let _ = connection.send(&render_frame("ERROR")).await;
            }
        }
    }

    async fn handle_reset(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 0).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        self.perform_reset();
        self.dirty.mark();
        let _ = connection.send(&render_frame(&render_reset())).await;
    }

    /// Two-phase bookend: the "will save"
    /// notification is sent before serialization starts; the "did save"
    /// response (or `(ERROR)` on storage failure) follows once the write
    /// completes. Both frames render identically (`SX`) — only their
    /// position in the stream distinguishes them.
    async fn handle_save(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 0).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let _ = connection.send(&render_frame(&render_save())).await;
        match self.perform_save().await {
            Ok(()) => {
                let _ = connection.send(&render_frame(&render_save())).await;
            }
            Err(_) => {
                let _ = connection.send(&render_frame("ERROR")).await;
            }
        }
    }

    async fn handle_query_current(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 0).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        self.sources.write_current_snapshot(&connection).await;
        self.favorites.write_current_snapshot(&connection).await;
        self.presets.write_current_snapshot(&connection).await;
        self.front_panel.write_current_snapshot(&connection).await;
        self.infrared.write_current_snapshot(&connection).await;
        self.network.write_current_snapshot(&connection).await;
        self.zones.write_current_snapshot(&connection).await;
        self.groups.write_current_snapshot(&connection).await;
        let _ = connection
            .send(&render_frame(&render_query_current()))
            .await;
    }

    /// The sole periodic task: every 30
    /// seconds, save if and only if something changed since the last save.
    /// Never returns; the caller spawns this once at startup.
    pub async fn run_autosave_timer(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        interval.tick().await; // first tick fires immediately; skip it.
        loop {
            interval.tick().await;
            if self.dirty.is_dirty() {
                let _ = self.perform_save().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;
    use parking_lot::Mutex;

    struct MemoryStorage {
        document: Mutex<Option<serde_json::Value>>,
    }

    impl MemoryStorage {
        fn empty() -> Arc<Self> {
            Arc::new(Self {
                    document: Mutex::new(None),
                })
        }
    }

    #[async_trait]
    impl BackupStorage for MemoryStorage {
        async fn load(&self) -> HlxResult<serde_json::Value> {
            self.document
                .lock()
                .clone()
                .ok_or_else(|| HlxError::MissingConfiguration("memory".to_string()))
        }

        async fn save(&self, document: &serde_json::Value) -> HlxResult<()> {
            *self.document.lock() = Some(document.clone());
            Ok(())
        }
    }

    fn controllers() -> (Arc<ZonesController>, Arc<GroupsController>, Arc<ConfigurationController>, Arc<dyn BackupStorage>) {
        let dirty = Arc::new(DirtyFlag::new());
        let sink: Arc<dyn crate::events::StateChangeSink> = Arc::new(NoopStateChangeSink);
        let sources = Arc::new(SourcesController::new(dirty.clone(), sink.clone()));
        let favorites = Arc::new(FavoritesController::new(dirty.clone(), sink.clone()));
        let presets = Arc::new(EqualizerPresetsController::new(dirty.clone(), sink.clone()));
        let front_panel = Arc::new(FrontPanelController::new(dirty.clone(), sink.clone()));
        let infrared = Arc::new(InfraredController::new(dirty.clone(), sink.clone()));
        let network = Arc::new(NetworkController::new());
        let zones = Arc::new(ZonesController::new(dirty.clone(), sink.clone()));
        let groups = Arc::new(GroupsController::new(zones.clone(), dirty.clone(), sink.clone()));
        let storage = MemoryStorage::empty();
        let config = Arc::new(ConfigurationController::new(
                storage.clone(),
                dirty,
                sources,
                favorites,
                presets,
                front_panel,
                infrared,
                network,
                zones.clone(),
                groups.clone(),
            ));
        (zones, groups, config, storage)
    }

    #[tokio::test]
    async fn bootstrap_with_no_backup_resets_and_saves() {
        let (_zones, _groups, config, storage) = controllers();
        config.bootstrap().await.unwrap();
        assert!(storage.load().await.is_ok());
        assert!(!config.dirty.is_dirty());
    }

    #[tokio::test]
    async fn query_current_emits_a_frame_set_ending_in_qx() {
        let (_zones, _groups, config, _storage) = controllers();
        let dispatcher = Dispatcher::new();
        config.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QX").await;
        let sent = conn.sent_bodies();
        assert!(sent.len() > 1);
        assert_eq!(sent.last().unwrap(), "QX");
    }

    #[tokio::test]
    async fn save_emits_will_save_then_did_save_bookend() {
        let (_zones, _groups, config, storage) = controllers();
        let dispatcher = Dispatcher::new();
        config.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "SX").await;
        assert_eq!(conn.sent_bodies(), vec!["SX", "SX"]);
        assert!(storage.load().await.is_ok());
    }

    #[tokio::test]
    async fn save_load_round_trip_preserves_zone_mutation() {
        let (zones, _groups, config, _storage) = controllers();
        let dispatcher = Dispatcher::new();
        zones.register(&dispatcher);
        config.register(&dispatcher);

        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "VU-40,1")
            .await;
        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "SX")
            .await;

        zones.reset_to_defaults();
        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "LX")
            .await;

        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QZ1").await;
        assert!(conn.sent_bodies().contains(&"VU-40,1".to_string()));
    }

    #[tokio::test]
    async fn reset_marks_dirty_and_echoes() {
        let (zones, _groups, config, _storage) = controllers();
        let dispatcher = Dispatcher::new();
        zones.register(&dispatcher);
        config.register(&dispatcher);

        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "VU-40,1")
            .await;
        config.dirty.take();

        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "RX").await;
        assert_eq!(conn.sent_bodies(), vec!["RX"]);
        assert!(config.dirty.is_dirty());

        let query = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(query.clone(), "QZ1").await;
        assert!(query.sent_bodies().contains(&"VU-80,1".to_string()));
    }
}
