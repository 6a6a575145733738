//! Application bootstrap and dependency wiring — the composition root.
//!
//! One function builds every sub-controller, wires the dispatcher, and
//! returns a single struct the binary entry points drive.
//! `BootstrappedServices::start` is async because it performs the
//! load-or-reset backup sequence before the server can safely accept
//! connections.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::controllers::configuration::{BackupStorage, FileBackupStorage};
use crate::controllers::context::DirtyFlag;
use crate::controllers::{
    ConfigurationController, EqualizerPresetsController, FavoritesController, FrontPanelController,
    GroupsController, InfraredController, NetworkController, SourcesController, ZonesController,
};
use crate::dispatch::Dispatcher;
use crate::error::HlxResult;
use crate::events::StateChangeSink;
use crate::runtime::TokioSpawner;

use super::name_dispatch::NameDispatch;

/// Container for every wired service a binary entry point needs.
#[derive(Clone)]
pub struct BootstrappedServices {
    pub dispatcher: Arc<Dispatcher>,
    pub configuration: Arc<ConfigurationController>,
    pub sources: Arc<SourcesController>,
    pub favorites: Arc<FavoritesController>,
    pub presets: Arc<EqualizerPresetsController>,
    pub front_panel: Arc<FrontPanelController>,
    pub infrared: Arc<InfraredController>,
    pub network: Arc<NetworkController>,
    pub zones: Arc<ZonesController>,
    pub groups: Arc<GroupsController>,
    pub dirty: Arc<DirtyFlag>,
    pub spawner: TokioSpawner,
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Performs the load-or-reset-and-save startup sequence
    /// and spawns the autosave timer. Must run once, before accepting any
    /// connections.
    pub async fn start(&self) -> HlxResult<()> {
        self.configuration.bootstrap().await?;
        let configuration = self.configuration.clone();
        let cancel_token = self.cancel_token.clone();
        self.spawner.spawn(async move {
                tokio::select! {
                    _ = configuration.run_autosave_timer() => {}
                    _ = cancel_token.cancelled() => {
                        log::info!("[Bootstrap] autosave timer stopped");
                    }
                }
            });
        Ok(())
    }
}

/// Wires every sub-controller together and registers their handlers on a
/// fresh [`Dispatcher`] (wiring order: Sources, Favorites, Presets,
/// FrontPanel, Infrared, Network, Zones, Groups, NameDispatch, then
/// Configuration last so `QueryCurrent` can fan out to all of them).
///
/// `sink` receives every domain state change; the server passes
/// [`crate::events::NoopStateChangeSink`] (state changes are delivered as
/// response/notification frames instead), the client passes a
/// [`crate::events::BroadcastStateChangeBridge`].
pub fn bootstrap_services(
    backup_path: &Path,
    sink: Arc<dyn StateChangeSink>,
    spawner: TokioSpawner,
) -> BootstrappedServices {
    let dirty = Arc::new(DirtyFlag::new());
    let dispatcher = Arc::new(Dispatcher::new());

    let sources = Arc::new(SourcesController::new(dirty.clone(), sink.clone()));
    let favorites = Arc::new(FavoritesController::new(dirty.clone(), sink.clone()));
    let presets = Arc::new(EqualizerPresetsController::new(dirty.clone(), sink.clone()));
    let front_panel = Arc::new(FrontPanelController::new(dirty.clone(), sink.clone()));
    let infrared = Arc::new(InfraredController::new(dirty.clone(), sink.clone()));
    let network = Arc::new(NetworkController::new());
    let zones = Arc::new(ZonesController::new(dirty.clone(), sink.clone()));
    let groups = Arc::new(GroupsController::new(zones.clone(), dirty.clone(), sink.clone()));

    front_panel.register(&dispatcher);
    infrared.register(&dispatcher);
    network.register(&dispatcher);
    zones.register(&dispatcher);
    groups.register(&dispatcher);
    presets.register(&dispatcher);
    favorites.register(&dispatcher);

    let name_dispatch = Arc::new(NameDispatch::new(
            sources.clone(),
            zones.clone(),
            groups.clone(),
            presets.clone(),
            favorites.clone(),
        ));
    name_dispatch.register(&dispatcher);

    let storage: Arc<dyn BackupStorage> = Arc::new(FileBackupStorage::new(backup_path));
    let configuration = Arc::new(ConfigurationController::new(
            storage,
            dirty.clone(),
            sources.clone(),
            favorites.clone(),
            presets.clone(),
            front_panel.clone(),
            infrared.clone(),
            network.clone(),
            zones.clone(),
            groups.clone(),
        ));
    configuration.register(&dispatcher);

    BootstrappedServices {
        dispatcher,
        configuration,
        sources,
        favorites,
        presets,
        front_panel,
        infrared,
        network,
        zones,
        groups,
        dirty,
        spawner,
        cancel_token: CancellationToken::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;

    #[tokio::test]
    async fn bootstrap_wires_every_controller_and_loads_or_resets() {
        let dir = tempfile::tempdir().unwrap();
        let backup_path = dir.path().join("backup.json");
        let services = bootstrap_services(
            &backup_path,
            Arc::new(NoopStateChangeSink),
            TokioSpawner::current(),
        );
        services.start().await.unwrap();
        assert!(backup_path.exists());

        let conn = Arc::new(MemoryConnection::new());
        services.dispatcher.on_frame(conn.clone(), "QZ1").await;
        assert!(!conn.sent_bodies().is_empty());
    }
}
