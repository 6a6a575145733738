//! `GroupsController` and the Group/Zone Orchestrator.
//!
//! Groups are stateless with respect to audio attributes: `Mute`,
//! `ToggleMute`, `SetVolume`, `Increase/DecreaseVolume`, `SetSource` fan out
//! to every member zone via [`crate::controllers::zones::ZonesController`]'s
//! internal mutation API and never emit a per-zone frame on the wire. The
//! group's own response reflects the request — rendered from the same
//! parsed arguments the zone fan-out used, which is textually identical to
//! the inbound body for every token in this family.
//!
//! `AddZone`/`RemoveZone`/`ClearZones` mutate `zone_set` directly and emit a
//! membership response; they never touch a zone.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::controllers::context::{
    load_container, parse_identifier, parse_ranged, require_arity, save_container, DirtyFlag,
};
use crate::controllers::zones::ZonesController;
use crate::dispatch::{Dispatcher, FnHandler};
use crate::error::HlxResult;
use crate::events::{StateChange, StateChangeKind, StateChangeSink};
use crate::model::collection::check_name_unique;
use crate::model::volume::{VOLUME_MAX, VOLUME_MIN};
use crate::model::{Group, IdentifierCollection, Identifier, GROUP_MAX, SOURCE_MAX, ZONE_MAX};
use crate::protocol::catalog::{
    render_group_add, render_group_clear, render_group_mute, render_group_remove,
    render_group_source, render_group_toggle_mute, render_group_volume_inc_dec,
    render_group_volume_set, render_name_set, render_query_group, Verb,
};
use crate::protocol::framing::render_frame;

pub struct GroupsController {
    groups: Mutex<IdentifierCollection<Group>>,
    zones: Arc<ZonesController>,
    dirty: Arc<DirtyFlag>,
    sink: Arc<dyn StateChangeSink>,
}

impl GroupsController {
    pub fn new(
        zones: Arc<ZonesController>,
        dirty: Arc<DirtyFlag>,
        sink: Arc<dyn StateChangeSink>,
    ) -> Self {
        Self {
            groups: Mutex::new(IdentifierCollection::new(GROUP_MAX, "group", Group::new)),
            zones,
            dirty,
            sink,
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
        on!(Verb::GroupAdd, handle_add_zone);
        on!(Verb::GroupRemove, handle_remove_zone);
        on!(Verb::GroupClear, handle_clear);
        on!(Verb::QueryGroup, handle_query);
        on!(Verb::GroupMute, handle_mute);
        on!(Verb::GroupToggleMute, handle_toggle_mute);
        on!(Verb::GroupVolumeSet, handle_volume_set);
        on!(Verb::GroupVolumeIncDec, handle_volume_inc_dec);
        on!(Verb::GroupSource, handle_source);
    }

    async fn send_error(connection: &Arc<dyn Connection>) {
        let _ = connection.send(&render_frame("ERROR")).await;
    }

    async fn handle_add_zone(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let (Ok(gid), Ok(zid)) = (
            parse_identifier(&captures[0], GROUP_MAX, "group"),
            parse_identifier(&captures[1], ZONE_MAX, "zone"),
        ) else {
            return Self::send_error(&connection).await;
        };

        let changed = {
            let mut groups = self.groups.lock();
            match groups.get_mut(gid) {
                Ok(g) => g.add_zone(zid),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if changed {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::GroupMembership,
                    Some(gid),
                    zid.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_group_add(gid, zid)))
            .await;
    }

    async fn handle_remove_zone(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let (Ok(gid), Ok(zid)) = (
            parse_identifier(&captures[0], GROUP_MAX, "group"),
            parse_identifier(&captures[1], ZONE_MAX, "zone"),
        ) else {
            return Self::send_error(&connection).await;
        };

        let changed = {
            let mut groups = self.groups.lock();
            match groups.get_mut(gid) {
                Ok(g) => g.remove_zone(zid),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if changed {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::GroupMembership,
                    Some(gid),
                    zid.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_group_remove(gid, zid)))
            .await;
    }

    /// `GZC` clears zone membership across every group (the wire protocol lists
    /// `ClearZones` with no identifier, unlike `AddZone(id, zone)`).
    async fn handle_clear(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 0).is_err() {
            return Self::send_error(&connection).await;
        }
        let changed_ids: Vec<Identifier> = {
            let mut groups = self.groups.lock();
            let ids: Vec<Identifier> = (1..=groups.max()).collect();
            ids.into_iter()
                .filter(|&id| groups.get_mut(id).unwrap().clear_zones())
                .collect()
        };
        if !changed_ids.is_empty() {
            self.dirty.mark();
            for id in changed_ids {
                self.sink.on_state_change(StateChange::new(
                        StateChangeKind::GroupMembership,
                        Some(id),
                        "cleared",
                    ));
            }
        }
        let _ = connection
            .send(&render_frame(&render_group_clear()))
            .await;
    }

    async fn handle_query(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let id = match parse_identifier(&captures[0], GROUP_MAX, "group") {
            Ok(id) => id,
            Err(_) => return Self::send_error(&connection).await,
        };
        self.write_query_response(&connection, id).await;
    }

    /// Name, then one membership frame per member zone (reusing the
    /// `AddZone` token shape, the canonical membership notification), then
    /// the echoed `(QG<id>)` end frame. Group queries report name and
    /// membership only; per-zone audio state is queried via zones.
    async fn write_query_response(&self, connection: &Arc<dyn Connection>, id: Identifier) {
        let (name, members) = {
            let groups = self.groups.lock();
            match groups.get(id) {
                Ok(g) => (
                    g.name().as_str().to_string(),
                    g.zone_set().iter().copied().collect::<Vec<_>>(),
                ),
                Err(_) => return Self::send_error(connection).await,
            }
        };
        let _ = connection
            .send(&render_frame(&render_name_set('G', id, &name)))
            .await;
        for zid in members {
            let _ = connection
                .send(&render_frame(&render_group_add(id, zid)))
                .await;
        }
        let _ = connection
            .send(&render_frame(&render_query_group(id)))
            .await;
    }

    /// Shared `NameSet` kind 'G'.
    pub async fn set_name(&self, connection: Arc<dyn Connection>, id: Identifier, name: &str) {
        let outcome = {
            let mut groups = self.groups.lock();
            if groups.get(id).is_err()
            || check_name_unique(&groups, id, name, |g| g.name().as_str()).is_err()
            {
                return Self::send_error(&connection).await;
            }
            match groups.get_mut(id).unwrap().name_mut().set(name) {
                Ok(outcome) => outcome,
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink
                .on_state_change(StateChange::new(StateChangeKind::GroupName, Some(id), name));
        }
        let _ = connection
            .send(&render_frame(&render_name_set('G', id, name)))
            .await;
    }

    // --- Audio fan-out. Each handler snapshots current membership, applies
    // the equivalent internal mutation to every member zone (ignoring a
    // per-zone `VolumeIsFixed` failure — the group response is unconditional
    // regardless, ), then reflects the request back as the
    // group response. No per-zone frame is ever sent.

    fn members_of(&self, gid: Identifier) -> Option<Vec<Identifier>> {
        self.groups
            .lock()
            .get(gid)
            .ok()
            .map(|g| g.zone_set().iter().copied().collect())
    }

    async fn handle_mute(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let mute = captures[0] == "M";
        let gid = match parse_identifier(&captures[1], GROUP_MAX, "group") {
            Ok(id) => id,
            Err(_) => return Self::send_error(&connection).await,
        };
        let Some(members) = self.members_of(gid) else {
            return Self::send_error(&connection).await;
        };
        for zid in members {
            let _ = self.zones.internal_set_mute(zid, mute);
        }
        let _ = connection
            .send(&render_frame(&render_group_mute(gid, mute)))
            .await;
    }

    async fn handle_toggle_mute(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let gid = match parse_identifier(&captures[0], GROUP_MAX, "group") {
            Ok(id) => id,
            Err(_) => return Self::send_error(&connection).await,
        };
        let Some(members) = self.members_of(gid) else {
            return Self::send_error(&connection).await;
        };
        for zid in members {
            let _ = self.zones.internal_toggle_mute(zid);
        }
        let _ = connection
            .send(&render_frame(&render_group_toggle_mute(gid)))
            .await;
    }

    async fn handle_volume_set(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let (level, gid) = (
            parse_ranged(&captures[0], VOLUME_MIN, VOLUME_MAX, "volume level"),
            parse_identifier(&captures[1], GROUP_MAX, "group"),
        );
        let (Ok(level), Ok(gid)) = (level, gid) else {
            return Self::send_error(&connection).await;
        };
        let Some(members) = self.members_of(gid) else {
            return Self::send_error(&connection).await;
        };
        for zid in members {
            let _ = self.zones.internal_set_volume(zid, level);
        }
        let _ = connection
            .send(&render_frame(&render_group_volume_set(gid, level)))
            .await;
    }

    async fn handle_volume_inc_dec(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let increase = captures[0] == "U";
        let gid = match parse_identifier(&captures[1], GROUP_MAX, "group") {
            Ok(id) => id,
            Err(_) => return Self::send_error(&connection).await,
        };
        let Some(members) = self.members_of(gid) else {
            return Self::send_error(&connection).await;
        };
        for zid in members {
            let _ = self.zones.internal_adjust_volume(zid, increase);
        }
        let _ = connection
            .send(&render_frame(&render_group_volume_inc_dec(gid, increase)))
            .await;
    }

    async fn handle_source(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let (gid, src) = (
            parse_identifier(&captures[0], GROUP_MAX, "group"),
            parse_identifier(&captures[1], SOURCE_MAX, "source"),
        );
        let (Ok(gid), Ok(src)) = (gid, src) else {
            return Self::send_error(&connection).await;
        };
        let Some(members) = self.members_of(gid) else {
            return Self::send_error(&connection).await;
        };
        for zid in members {
            let _ = self.zones.internal_set_source(zid, src);
        }
        let _ = connection
            .send(&render_frame(&render_group_source(gid, src)))
            .await;
    }

    /// `QueryCurrent` fan-out: one name+membership dump per group.
    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let ids: Vec<Identifier> = (1..=self.groups.lock().max()).collect();
        for id in ids {
            self.write_query_response(connection, id).await;
        }
    }

    pub fn reset_to_defaults(&self) {
        self.groups.lock().reset(Group::new);
    }

    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let entries: Vec<Group> = load_container(doc, "Groups")?;
        self.groups.lock().load_backup(entries)
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        let groups = self.groups.lock();
        save_container(doc, "Groups", groups.to_backup());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;

    fn controller() -> (Arc<ZonesController>, Arc<GroupsController>) {
        let dirty = Arc::new(DirtyFlag::new());
        let sink: Arc<dyn StateChangeSink> = Arc::new(NoopStateChangeSink);
        let zones = Arc::new(ZonesController::new(dirty.clone(), sink.clone()));
        let groups = Arc::new(GroupsController::new(zones.clone(), dirty, sink));
        (zones, groups)
    }

    #[tokio::test]
    async fn add_then_remove_zone_toggles_membership() {
        let (_zones, groups) = controller();
        let dispatcher = Dispatcher::new();
        groups.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "G1,+3").await;
        assert_eq!(conn.sent_bodies(), vec!["G1,+3"]);
        assert!(groups.dirty.is_dirty());

        let conn2 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn2.clone(), "G1,-3").await;
        assert_eq!(conn2.sent_bodies(), vec!["G1,-3"]);
    }

    #[tokio::test]
    async fn group_volume_set_fans_out_with_no_per_zone_frames() {
        let (zones, groups) = controller();
        let dispatcher = Dispatcher::new();
        zones.register(&dispatcher);
        groups.register(&dispatcher);

        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "G1,+3")
            .await;
        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "G1,+4")
            .await;

        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "GVU-30,1").await;
        assert_eq!(conn.sent_bodies(), vec!["GVU-30,1"]);

        let query = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(query.clone(), "QZ3").await;
        assert!(query.sent_bodies().contains(&"VU-30,3".to_string()));
        let query2 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(query2.clone(), "QZ4").await;
        assert!(query2.sent_bodies().contains(&"VU-30,4".to_string()));
    }

    #[tokio::test]
    async fn clear_zones_is_process_wide() {
        let (_zones, groups) = controller();
        let dispatcher = Dispatcher::new();
        groups.register(&dispatcher);
        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "G1,+3")
            .await;
        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "G2,+4")
            .await;

        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "GZC").await;
        assert_eq!(conn.sent_bodies(), vec!["GZC"]);

        let q1 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(q1.clone(), "QG1").await;
        assert_eq!(q1.sent_bodies(), vec!["NG1,\"Group Name 1\"", "QG1"]);
    }

    #[tokio::test]
    async fn query_group_lists_membership_then_echoes_request() {
        let (_zones, groups) = controller();
        let dispatcher = Dispatcher::new();
        groups.register(&dispatcher);
        dispatcher
            .on_frame(Arc::new(MemoryConnection::new()), "G2,+5")
            .await;

        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QG2").await;
        assert_eq!(
            conn.sent_bodies(),
            vec!["NG2,\"Group Name 2\"", "G2,+5", "QG2"]
        );
    }
}
