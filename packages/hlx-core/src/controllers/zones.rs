//! `ZonesController` — owns the zone table, the busiest sub-controller
//! in the catalog.
//!
//! Two cross-cutting algorithms live here rather than in each handler:
//! the sound-mode conditional prelude ([`ZonesController::apply_mode_specific`])
//! and the volume-unmute conditional prelude
//! ([`ZonesController::apply_volume_unmute`]). Both mutate the zone and the
//! primary attribute within the same critical section so the prelude and
//! primary outcome are observed atomically, then render frames once the
//! lock is released.
//!
//! `internal_*` methods perform the same mutations without touching the
//! wire; the Group/Zone Orchestrator calls these so group mutations never
//! emit per-zone frames.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::controllers::context::{parse_identifier, parse_ranged, require_arity, DirtyFlag};
use crate::dispatch::{Dispatcher, FnHandler};
use crate::events::{StateChange, StateChangeKind, StateChangeSink};
use crate::model::collection::check_name_unique;
use crate::model::balance::BALANCE_MAX;
use crate::model::crossover::{CROSSOVER_MAX, CROSSOVER_MIN};
use crate::model::equalizer::{BAND_MAX, BAND_MIN};
use crate::model::tone::{TONE_MAX, TONE_MIN};
use crate::model::volume::{VOLUME_MAX, VOLUME_MIN};
use crate::model::{
    Channel, IdentifierCollection, Identifier, SoundMode, Zone, EQUALIZER_PRESET_MAX, SOURCE_MAX,
    ZONE_MAX,
};
use crate::error::HlxResult;
use crate::protocol::catalog::{
    render_balance, render_balance_adjust, render_bass_inc_dec, render_highpass, render_lowpass,
    render_mute, render_name_set, render_preset_eq_select, render_query_zone, render_sound_mode,
    render_source, render_source_all, render_tone, render_toggle_mute, render_treble_inc_dec,
    render_volume_all, render_volume_fixed, render_volume_inc_dec, render_volume_set,
    render_zone_eq_band, render_zone_eq_band_inc_dec, Verb,
};
use crate::protocol::framing::render_frame;

pub struct ZonesController {
    zones: Mutex<IdentifierCollection<Zone>>,
    dirty: Arc<DirtyFlag>,
    sink: Arc<dyn StateChangeSink>,
}

fn channel_tag(channel: Channel) -> char {
    match channel {
        Channel::Left => 'L',
        Channel::Right => 'R',
    }
}

fn channel_from_tag(tag: &str) -> Channel {
    if tag == "L" {
        Channel::Left
    } else {
        Channel::Right
    }
}

/// A flattened read of every zone attribute, captured under the lock so
/// the response frames can be sent after it's released.
struct ZoneSnapshot {
    name: String,
    balance: (Channel, i8),
    source_id: Identifier,
    level: i8,
    mute: bool,
    fixed: bool,
    mode: SoundMode,
    bass: i8,
    treble: i8,
    bands: Vec<(u8, i8)>,
    preset_id: Identifier,
    lowpass_hz: u16,
    highpass_hz: u16,
}

impl ZoneSnapshot {
    fn capture(zone: &Zone) -> Self {
        Self {
            name: zone.name().as_str().to_string(),
            balance: zone.balance().as_tagged(),
            source_id: zone.source_id(),
            level: zone.volume().level(),
            mute: zone.volume().is_muted(),
            fixed: zone.volume().is_fixed(),
            mode: zone.sound_mode(),
            bass: zone.tone().bass(),
            treble: zone.tone().treble(),
            bands: zone.bands().iter().collect(),
            preset_id: zone.equalizer_preset_id(),
            lowpass_hz: zone.lowpass_crossover().hz(),
            highpass_hz: zone.highpass_crossover().hz(),
        }
    }
}

impl ZonesController {
    pub fn new(dirty: Arc<DirtyFlag>, sink: Arc<dyn StateChangeSink>) -> Self {
        Self {
            zones: Mutex::new(IdentifierCollection::new(ZONE_MAX, "zone", Zone::new)),
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
        on!(Verb::QueryZone, handle_query);
        on!(Verb::QueryZoneMute, handle_query_mute);
        on!(Verb::QueryZoneSource, handle_query_source);
        on!(Verb::QueryZoneVolume, handle_query_volume);
        on!(Verb::Source, handle_source);
        on!(Verb::SourceAll, handle_source_all);
        on!(Verb::VolumeSet, handle_volume_set);
        on!(Verb::VolumeAll, handle_volume_all);
        on!(Verb::VolumeIncDec, handle_volume_inc_dec);
        on!(Verb::Mute, handle_mute);
        on!(Verb::ToggleMute, handle_toggle_mute);
        on!(Verb::VolumeFixed, handle_volume_fixed);
        on!(Verb::Balance, handle_balance);
        on!(Verb::BalanceAdjust, handle_balance_adjust);
        on!(Verb::Tone, handle_tone);
        on!(Verb::BassIncDec, handle_bass_inc_dec);
        on!(Verb::TrebleIncDec, handle_treble_inc_dec);
        on!(Verb::ZoneEqBand, handle_eq_band);
        on!(Verb::ZoneEqBandIncDec, handle_eq_band_inc_dec);
        on!(Verb::PresetEqSelect, handle_preset_select);
        on!(Verb::Lowpass, handle_lowpass);
        on!(Verb::Highpass, handle_highpass);
        on!(Verb::SoundMode, handle_sound_mode);
    }

    async fn send_error(connection: &Arc<dyn Connection>) {
        let _ = connection.send(&render_frame("ERROR")).await;
    }

    /// Sound-mode conditional prelude: transitions
    /// `sound_mode` to `required`, then runs `mutate` on the same zone in
    /// one critical section. Emits the sound-mode frame first, only if the
    /// mode actually changed. Returns `None` (already signalled `ERROR`)
    /// when the zone doesn't exist or `mutate` fails.
    async fn apply_mode_specific<T>(
        &self,
        connection: &Arc<dyn Connection>,
        zone_id: Identifier,
        required: SoundMode,
        mutate: impl FnOnce(&mut Zone) -> HlxResult<(crate::model::MutationOutcome, T)>,
    ) -> Option<(crate::model::MutationOutcome, T)> {
        let outcome = {
            let mut zones = self.zones.lock();
            let zone = match zones.get_mut(zone_id) {
                Ok(z) => z,
                Err(_) => return None,
            };
            let mode_outcome = zone.set_sound_mode(required);
            mutate(zone).map(|(outcome, value)| (mode_outcome, outcome, value))
        };
        let (mode_outcome, outcome, value) = match outcome {
            Ok(v) => v,
            Err(_) => {
                Self::send_error(connection).await;
                return None;
            }
        };
        if mode_outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneSoundMode,
                    Some(zone_id),
                    required.to_wire().to_string(),
                ));
            let _ = connection
                .send(&render_frame(&render_sound_mode(zone_id, required.to_wire())))
                .await;
        }
        Some((outcome, value))
    }

    /// Volume-unmute conditional prelude: attempts `mutate`
    /// first so a `VolumeIsFixed` failure leaves mute untouched, then
    /// conditionally unmutes. Emits the mute frame first, only if the zone
    /// was actually muted.
    async fn apply_volume_unmute<T>(
        &self,
        connection: &Arc<dyn Connection>,
        zone_id: Identifier,
        mutate: impl FnOnce(&mut Zone) -> HlxResult<(crate::model::MutationOutcome, T)>,
    ) -> Option<(crate::model::MutationOutcome, T)> {
        let outcome = {
            let mut zones = self.zones.lock();
            let zone = match zones.get_mut(zone_id) {
                Ok(z) => z,
                Err(_) => return None,
            };
            mutate(zone).map(|(outcome, value)| {
                    let unmute_outcome = zone.volume_mut().set_mute(false);
                    (unmute_outcome, outcome, value)
                })
        };
        let (unmute_outcome, outcome, value) = match outcome {
            Ok(v) => v,
            Err(_) => {
                Self::send_error(connection).await;
                return None;
            }
        };
        if unmute_outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneMute,
                    Some(zone_id),
                    "false",
                ));
            let _ = connection
                .send(&render_frame(&render_mute(zone_id, false)))
                .await;
        }
        Some((outcome, value))
    }

    async fn handle_source(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = parse_identifier(&captures[0], ZONE_MAX, "zone");
        let source_id = parse_identifier(&captures[1], SOURCE_MAX, "source");
        let (Ok(zone_id), Ok(source_id)) = (zone_id, source_id) else {
            return Self::send_error(&connection).await;
        };

        let outcome = {
            let mut zones = self.zones.lock();
            match zones.get_mut(zone_id) {
                Ok(z) => z.set_source(source_id),
                Err(e) => Err(e),
            }
        };
        let outcome = match outcome {
            Ok(o) => o,
            Err(_) => return Self::send_error(&connection).await,
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneSource,
                    Some(zone_id),
                    source_id.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_source(zone_id, source_id)))
            .await;
    }

    /// `SetSourceAll`: stop on the first per-zone failure and
    /// emit `(ERROR)`; otherwise a single aggregate frame.
    async fn handle_source_all(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let source_id = match parse_identifier(&captures[0], SOURCE_MAX, "source") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };

        let mut failed = false;
        let mut changed = Vec::new();
        {
            let mut zones = self.zones.lock();
            for id in 1..=zones.max() {
                let zone = zones.get_mut(id).expect("id in range");
                match zone.set_source(source_id) {
                    Ok(outcome) => {
                        if outcome.is_changed() {
                            changed.push(id);
                        }
                    }
                    Err(_) => {
                        failed = true;
                        break;
                    }
                }
            }
        }
        if failed {
            return Self::send_error(&connection).await;
        }
        if !changed.is_empty() {
            self.dirty.mark();
            for id in changed {
                self.sink.on_state_change(StateChange::new(
                        StateChangeKind::ZoneSource,
                        Some(id),
                        source_id.to_string(),
                    ));
            }
        }
        let _ = connection
            .send(&render_frame(&render_source_all(source_id)))
            .await;
    }

    async fn handle_volume_set(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let level = parse_ranged(&captures[0], VOLUME_MIN, VOLUME_MAX, "volume level");
        let zone_id = parse_identifier(&captures[1], ZONE_MAX, "zone");
        let (Ok(level), Ok(zone_id)) = (level, zone_id) else {
            return Self::send_error(&connection).await;
        };

        let result = self
            .apply_volume_unmute(&connection, zone_id, |zone| {
                zone.volume_mut().set_level(level).map(|o| (o, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneVolume,
                    Some(zone_id),
                    level.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_volume_set(zone_id, level)))
            .await;
    }

    async fn handle_volume_inc_dec(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let increase = captures[0] == "U";
        let zone_id = match parse_identifier(&captures[1], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };

        let result = self
            .apply_volume_unmute(&connection, zone_id, |zone| {
                let outcome = if increase {
                    zone.volume_mut().increase()?
                } else {
                    zone.volume_mut().decrease()?
                };
                Ok((outcome, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneVolume,
                    Some(zone_id),
                    "adjusted".to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_volume_inc_dec(zone_id, increase)))
            .await;
    }

    /// `SetVolumeAll`: the unmute prelude happens to model
    /// state without its own wire frame here, so the operation keeps its
    /// single-aggregate-frame guarantee (see `SPEC_FULL.md` §2).
    async fn handle_volume_all(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let level = match parse_ranged(&captures[0], VOLUME_MIN, VOLUME_MAX, "volume level") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };

        let mut failed = false;
        let mut changed = Vec::new();
        {
            let mut zones = self.zones.lock();
            for id in 1..=zones.max() {
                let zone = zones.get_mut(id).expect("id in range");
                match zone.volume_mut().set_level(level) {
                    Ok(outcome) => {
                        if outcome.is_changed() {
                            changed.push((id, StateChangeKind::ZoneVolume, level.to_string()));
                        }
                    }
                    Err(_) => {
                        failed = true;
                        break;
                    }
                }
                if zone.volume_mut().set_mute(false).is_changed() {
                    changed.push((id, StateChangeKind::ZoneMute, "false".to_string()));
                }
            }
        }
        if failed {
            return Self::send_error(&connection).await;
        }
        if !changed.is_empty() {
            self.dirty.mark();
            for (id, kind, value) in changed {
                self.sink
                    .on_state_change(StateChange::new(kind, Some(id), value));
            }
        }
        let _ = connection
            .send(&render_frame(&render_volume_all(level)))
            .await;
    }

    async fn handle_mute(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let mute = captures[0] == "M";
        let zone_id = match parse_identifier(&captures[1], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let outcome = {
            let mut zones = self.zones.lock();
            match zones.get_mut(zone_id) {
                Ok(z) => z.volume_mut().set_mute(mute),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneMute,
                    Some(zone_id),
                    mute.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_mute(zone_id, mute)))
            .await;
    }

    async fn handle_toggle_mute(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let new_value = {
            let mut zones = self.zones.lock();
            match zones.get_mut(zone_id) {
                Ok(z) => {
                    z.volume_mut().toggle_mute();
                    z.volume().is_muted()
                }
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        self.dirty.mark();
        self.sink.on_state_change(StateChange::new(
                StateChangeKind::ZoneMute,
                Some(zone_id),
                new_value.to_string(),
            ));
        let _ = connection
            .send(&render_frame(&render_toggle_mute(zone_id)))
            .await;
    }

    async fn handle_volume_fixed(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let fixed = captures[1] == "1";
        let outcome = {
            let mut zones = self.zones.lock();
            match zones.get_mut(zone_id) {
                Ok(z) => z.volume_mut().set_fixed(fixed),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneVolumeFixed,
                    Some(zone_id),
                    fixed.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_volume_fixed(zone_id, fixed)))
            .await;
    }

    async fn handle_balance(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 3).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = parse_identifier(&captures[0], ZONE_MAX, "zone");
        let channel = channel_from_tag(&captures[1]);
        let magnitude = parse_ranged(&captures[2], 0i8, BALANCE_MAX, "balance magnitude");
        let (Ok(zone_id), Ok(magnitude)) = (zone_id, magnitude) else {
            return Self::send_error(&connection).await;
        };

        let result = {
            let mut zones = self.zones.lock();
            match zones.get_mut(zone_id) {
                Ok(z) => z
                    .balance_mut()
                    .set_tagged(channel, magnitude)
                    .map(|outcome| (outcome, z.balance().as_tagged())),
                Err(e) => Err(e),
            }
        };
        let (outcome, tagged) = match result {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneBalance,
                    Some(zone_id),
                    tagged.1.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_balance(
                    zone_id,
                    channel_tag(tagged.0),
                    tagged.1,
                )))
            .await;
    }

    async fn handle_balance_adjust(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let channel = channel_from_tag(&captures[1]);
        let (outcome, tagged) = {
            let mut zones = self.zones.lock();
            match zones.get_mut(zone_id) {
                Ok(z) => {
                    let outcome = z.balance_mut().adjust(channel);
                    (outcome, z.balance().as_tagged())
                }
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneBalance,
                    Some(zone_id),
                    tagged.1.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_balance_adjust(
                    zone_id,
                    channel_tag(channel),
                )))
            .await;
    }

    async fn handle_tone(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 3).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = parse_identifier(&captures[0], ZONE_MAX, "zone");
        let bass = parse_ranged(&captures[1], TONE_MIN, TONE_MAX, "bass");
        let treble = parse_ranged(&captures[2], TONE_MIN, TONE_MAX, "treble");
        let (Ok(zone_id), Ok(bass), Ok(treble)) = (zone_id, bass, treble) else {
            return Self::send_error(&connection).await;
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::Tone, |zone| {
                zone.tone_mut().set_both(bass, treble).map(|o| (o, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneTone,
                    Some(zone_id),
                    format!("{bass},{treble}"),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_tone(zone_id, bass, treble)))
            .await;
    }

    async fn handle_bass_inc_dec(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let increase = captures[0] == "U";
        let zone_id = match parse_identifier(&captures[1], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::Tone, |zone| {
                let outcome = if increase {
                    zone.tone_mut().increase_bass()
                } else {
                    zone.tone_mut().decrease_bass()
                };
                Ok((outcome, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneTone,
                    Some(zone_id),
                    "adjusted".to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_bass_inc_dec(zone_id, increase)))
            .await;
    }

    async fn handle_treble_inc_dec(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let increase = captures[0] == "U";
        let zone_id = match parse_identifier(&captures[1], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::Tone, |zone| {
                let outcome = if increase {
                    zone.tone_mut().increase_treble()
                } else {
                    zone.tone_mut().decrease_treble()
                };
                Ok((outcome, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneTone,
                    Some(zone_id),
                    "adjusted".to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_treble_inc_dec(zone_id, increase)))
            .await;
    }

    async fn handle_eq_band(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 3).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = parse_identifier(&captures[0], ZONE_MAX, "zone");
        let band = captures[1].parse::<u8>();
        let level = parse_ranged(&captures[2], BAND_MIN, BAND_MAX, "equalizer band level");
        let (Ok(zone_id), Ok(band), Ok(level)) = (zone_id, band, level) else {
            return Self::send_error(&connection).await;
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::ZoneEqualizer, |zone| {
                zone.bands_mut().set(band, level).map(|o| (o, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneEqualizerBand,
                    Some(zone_id),
                    level.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_zone_eq_band(zone_id, band, level)))
            .await;
    }

    async fn handle_eq_band_inc_dec(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 3).is_err() {
            return Self::send_error(&connection).await;
        }
        let increase = captures[0] == "U";
        let zone_id = parse_identifier(&captures[1], ZONE_MAX, "zone");
        let band = captures[2].parse::<u8>();
        let (Ok(zone_id), Ok(band)) = (zone_id, band) else {
            return Self::send_error(&connection).await;
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::ZoneEqualizer, |zone| {
                let outcome = if increase {
                    zone.bands_mut().increase(band)?
                } else {
                    zone.bands_mut().decrease(band)?
                };
                Ok((outcome, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneEqualizerBand,
                    Some(zone_id),
                    "adjusted".to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_zone_eq_band_inc_dec(
                    zone_id, band, increase,
                )))
            .await;
    }

    /// `SetEqualizerPreset(zone, preset)`: only range-checks `preset`
    /// against the preset table's maximum; it does not cross into the
    /// `EqualizerPresetsController` to validate the id resolves to a
    /// particular preset's bands (see `SPEC_FULL.md` §2 on the
    /// `bands`-vs-preset decision). The zone's own `bands` stays untouched
    /// and independent of the preset selection.
    async fn handle_preset_select(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = parse_identifier(&captures[0], ZONE_MAX, "zone");
        let preset_id = parse_identifier(&captures[1], EQUALIZER_PRESET_MAX, "preset");
        let (Ok(zone_id), Ok(preset_id)) = (zone_id, preset_id) else {
            return Self::send_error(&connection).await;
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::PresetEqualizer, |zone| {
                Ok((zone.set_equalizer_preset_id(preset_id), ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneEqualizerBand,
                    Some(zone_id),
                    preset_id.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_preset_eq_select(zone_id, preset_id)))
            .await;
    }

    async fn handle_lowpass(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = parse_identifier(&captures[0], ZONE_MAX, "zone");
        let hz = parse_ranged(&captures[1], CROSSOVER_MIN, CROSSOVER_MAX, "crossover frequency");
        let (Ok(zone_id), Ok(hz)) = (zone_id, hz) else {
            return Self::send_error(&connection).await;
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::Lowpass, |zone| {
                zone.lowpass_crossover_mut().set(hz).map(|o| (o, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneLowpassCrossover,
                    Some(zone_id),
                    hz.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_lowpass(zone_id, hz)))
            .await;
    }

    async fn handle_highpass(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = parse_identifier(&captures[0], ZONE_MAX, "zone");
        let hz = parse_ranged(&captures[1], CROSSOVER_MIN, CROSSOVER_MAX, "crossover frequency");
        let (Ok(zone_id), Ok(hz)) = (zone_id, hz) else {
            return Self::send_error(&connection).await;
        };

        let result = self
            .apply_mode_specific(&connection, zone_id, SoundMode::Highpass, |zone| {
                zone.highpass_crossover_mut().set(hz).map(|o| (o, ()))
            })
            .await;
        let Some((outcome, ())) = result else {
            return;
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneHighpassCrossover,
                    Some(zone_id),
                    hz.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_highpass(zone_id, hz)))
            .await;
    }

    /// `SetSoundMode(zone, mode)`: the explicit, unconditional mode set —
    /// distinct from the conditional prelude that the mode-specific
    /// mutations run themselves.
    async fn handle_sound_mode(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 2).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let mode = match captures[1].parse::<u8>().ok().and_then(|c| SoundMode::from_wire(c).ok()) {
            Some(m) => m,
            None => return Self::send_error(&connection).await,
        };
        let outcome = {
            let mut zones = self.zones.lock();
            match zones.get_mut(zone_id) {
                Ok(z) => z.set_sound_mode(mode),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneSoundMode,
                    Some(zone_id),
                    mode.to_wire().to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_sound_mode(zone_id, mode.to_wire())))
            .await;
    }

    async fn handle_query(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        self.write_query_response(&connection, zone_id).await;
    }

    /// Full snapshot (name, balance, source, volume, sound mode +
    /// mode-specific attribute(s)) as notification-shaped frames followed
    /// by the echoed `(QZ<id>)` end frame.
    async fn write_query_response(&self, connection: &Arc<dyn Connection>, id: Identifier) {
        let snapshot = {
            let zones = self.zones.lock();
            match zones.get(id) {
                Ok(zone) => ZoneSnapshot::capture(zone),
                Err(_) => return Self::send_error(connection).await,
            }
        };

        let _ = connection
            .send(&render_frame(&render_name_set('Z', id, &snapshot.name)))
            .await;
        let _ = connection
            .send(&render_frame(&render_balance(
                    id,
                    channel_tag(snapshot.balance.0),
                    snapshot.balance.1,
                )))
            .await;
        let _ = connection
            .send(&render_frame(&render_source(id, snapshot.source_id)))
            .await;
        let _ = connection
            .send(&render_frame(&render_volume_set(id, snapshot.level)))
            .await;
        let _ = connection
            .send(&render_frame(&render_mute(id, snapshot.mute)))
            .await;
        let _ = connection
            .send(&render_frame(&render_volume_fixed(id, snapshot.fixed)))
            .await;
        let _ = connection
            .send(&render_frame(&render_sound_mode(id, snapshot.mode.to_wire())))
            .await;
        match snapshot.mode {
            SoundMode::Tone => {
                let _ = connection
                    .send(&render_frame(&render_tone(id, snapshot.bass, snapshot.treble)))
                    .await;
            }
            SoundMode::ZoneEqualizer => {
                for (band, level) in snapshot.bands {
                    let _ = connection
                        .send(&render_frame(&render_zone_eq_band(id, band, level)))
                        .await;
                }
            }
            SoundMode::PresetEqualizer => {
                let _ = connection
                    .send(&render_frame(&render_preset_eq_select(id, snapshot.preset_id)))
                    .await;
            }
            SoundMode::Lowpass => {
                let _ = connection
                    .send(&render_frame(&render_lowpass(id, snapshot.lowpass_hz)))
                    .await;
            }
            SoundMode::Highpass => {
                let _ = connection
                    .send(&render_frame(&render_highpass(id, snapshot.highpass_hz)))
                    .await;
            }
            SoundMode::Disabled => {}
        }
        let _ = connection
            .send(&render_frame(&render_query_zone(id)))
            .await;
    }

    async fn handle_query_mute(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let mute = {
            let zones = self.zones.lock();
            match zones.get(zone_id) {
                Ok(z) => z.volume().is_muted(),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        let _ = connection
            .send(&render_frame(&render_mute(zone_id, mute)))
            .await;
    }

    async fn handle_query_source(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let source_id = {
            let zones = self.zones.lock();
            match zones.get(zone_id) {
                Ok(z) => z.source_id(),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        let _ = connection
            .send(&render_frame(&render_source(zone_id, source_id)))
            .await;
    }

    async fn handle_query_volume(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            return Self::send_error(&connection).await;
        }
        let zone_id = match parse_identifier(&captures[0], ZONE_MAX, "zone") {
            Ok(v) => v,
            Err(_) => return Self::send_error(&connection).await,
        };
        let level = {
            let zones = self.zones.lock();
            match zones.get(zone_id) {
                Ok(z) => z.volume().level(),
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        let _ = connection
            .send(&render_frame(&render_volume_set(zone_id, level)))
            .await;
    }

    /// `SetName(id, name)`: unconditional, shared `NameSet` kind `Z`.
    pub async fn set_name(&self, connection: Arc<dyn Connection>, id: Identifier, name: &str) {
        let outcome = {
            let mut zones = self.zones.lock();
            if zones.get(id).is_err()
            || check_name_unique(&zones, id, name, |z| z.name().as_str()).is_err()
            {
                return Self::send_error(&connection).await;
            }
            match zones.get_mut(id).unwrap().name_mut().set(name) {
                Ok(outcome) => outcome,
                Err(_) => return Self::send_error(&connection).await,
            }
        };
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink
                .on_state_change(StateChange::new(StateChangeKind::ZoneName, Some(id), name));
        }
        let _ = connection
            .send(&render_frame(&render_name_set('Z', id, name)))
            .await;
    }

    /// `QueryCurrent` fan-out: one full snapshot per zone, ascending order.
    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let ids: Vec<Identifier> = (1..=self.zones.lock().max()).collect();
        for id in ids {
            self.write_query_response(connection, id).await;
        }
    }

    pub fn reset_to_defaults(&self) {
        self.zones.lock().reset(Zone::new);
    }

    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let entries: Vec<Zone> = crate::controllers::context::load_container(doc, "Zones")?;
        self.zones.lock().load_backup(entries)
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        let zones = self.zones.lock();
        crate::controllers::context::save_container(doc, "Zones", zones.to_backup());
    }

    // --- Internal mutation API for the Group/Zone Orchestrator (spec
    // §4.5.5): identical model mutations, no wire frames.

    pub fn internal_set_mute(
        &self,
        zone_id: Identifier,
        mute: bool,
    ) -> HlxResult<crate::model::MutationOutcome> {
        let outcome = self.zones.lock().get_mut(zone_id)?.volume_mut().set_mute(mute);
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneMute,
                    Some(zone_id),
                    mute.to_string(),
                ));
        }
        Ok(outcome)
    }

    pub fn internal_toggle_mute(
        &self,
        zone_id: Identifier,
    ) -> HlxResult<crate::model::MutationOutcome> {
        let mut zones = self.zones.lock();
        let zone = zones.get_mut(zone_id)?;
        let outcome = zone.volume_mut().toggle_mute();
        let new_value = zone.volume().is_muted();
        drop(zones);
        self.dirty.mark();
        self.sink.on_state_change(StateChange::new(
                StateChangeKind::ZoneMute,
                Some(zone_id),
                new_value.to_string(),
            ));
        Ok(outcome)
    }

    pub fn internal_set_volume(
        &self,
        zone_id: Identifier,
        level: i8,
    ) -> HlxResult<crate::model::MutationOutcome> {
        let mut zones = self.zones.lock();
        let zone = zones.get_mut(zone_id)?;
        let outcome = zone.volume_mut().set_level(level)?;
        zone.volume_mut().set_mute(false);
        drop(zones);
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneVolume,
                    Some(zone_id),
                    level.to_string(),
                ));
        }
        Ok(outcome)
    }

    pub fn internal_adjust_volume(
        &self,
        zone_id: Identifier,
        increase: bool,
    ) -> HlxResult<crate::model::MutationOutcome> {
        let mut zones = self.zones.lock();
        let zone = zones.get_mut(zone_id)?;
        let outcome = if increase {
            zone.volume_mut().increase()?
        } else {
            zone.volume_mut().decrease()?
        };
        zone.volume_mut().set_mute(false);
        drop(zones);
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneVolume,
                    Some(zone_id),
                    "adjusted".to_string(),
                ));
        }
        Ok(outcome)
    }

    pub fn internal_set_source(
        &self,
        zone_id: Identifier,
        source_id: Identifier,
    ) -> HlxResult<crate::model::MutationOutcome> {
        let outcome = self.zones.lock().get_mut(zone_id)?.set_source(source_id)?;
        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::ZoneSource,
                    Some(zone_id),
                    source_id.to_string(),
                ));
        }
        Ok(outcome)
    }

    pub fn zone_count(&self) -> Identifier {
        self.zones.lock().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use crate::events::NoopStateChangeSink;

    fn controller() -> Arc<ZonesController> {
        Arc::new(ZonesController::new(
                Arc::new(DirtyFlag::new()),
                Arc::new(NoopStateChangeSink),
            ))
    }

    #[tokio::test]
    async fn source_set_then_query_mute_reflects_it() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "C3,5").await;
        assert_eq!(conn.sent_bodies(), vec!["C3,5"]);

        let conn2 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn2.clone(), "QC3").await;
        assert_eq!(conn2.sent_bodies(), vec!["C3,5"]);
    }

    #[tokio::test]
    async fn tone_set_emits_sound_mode_prelude_once() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "TO2,5,-3").await;
        assert_eq!(conn.sent_bodies(), vec!["SM2,3", "TO2,5,-3"]);

        let conn2 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn2.clone(), "TO2,5,-3").await;
        assert_eq!(conn2.sent_bodies(), vec!["TO2,5,-3"]);
    }

    #[tokio::test]
    async fn volume_set_emits_unmute_prelude_only_if_muted() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "MU1").await;
        assert_eq!(conn.sent_bodies(), vec!["MU1"]);

        let conn2 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn2.clone(), "VU-10,1").await;
        assert_eq!(conn2.sent_bodies(), vec!["UU1", "VU-10,1"]);

        let conn3 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn3.clone(), "VU-20,1").await;
        assert_eq!(conn3.sent_bodies(), vec!["VU-20,1"]);
    }

    #[tokio::test]
    async fn volume_fixed_rejects_volume_set() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "VF1,1").await;
        assert_eq!(conn.sent_bodies(), vec!["VF1,1"]);

        let conn2 = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn2.clone(), "VU-10,1").await;
        assert_eq!(conn2.sent_bodies(), vec!["ERROR"]);
    }

    #[tokio::test]
    async fn volume_all_emits_single_aggregate_frame() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "VAU-30").await;
        assert_eq!(conn.sent_bodies(), vec!["VAU-30"]);
    }

    #[tokio::test]
    async fn balance_zero_renders_right() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "BP5,R0").await;
        assert_eq!(conn.sent_bodies(), vec!["BP5,R0"]);
    }

    #[tokio::test]
    async fn query_zone_ends_with_echoed_request() {
        let ctrl = controller();
        let dispatcher = Dispatcher::new();
        ctrl.register(&dispatcher);
        let conn = Arc::new(MemoryConnection::new());
        dispatcher.on_frame(conn.clone(), "QZ1").await;
        let sent = conn.sent_bodies();
        assert_eq!(sent[0], "NZ1,\"Zone Name 1\"");
        assert_eq!(sent.last().unwrap(), "QZ1");
    }

    #[tokio::test]
    async fn internal_set_volume_emits_no_wire_frames() {
        let ctrl = controller();
        let outcome = ctrl.internal_set_volume(1, -10).unwrap();
        assert_eq!(outcome, crate::model::MutationOutcome::Changed);
        assert!(ctrl.dirty.is_dirty());
    }
}
