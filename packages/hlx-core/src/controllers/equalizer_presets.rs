//! `EqualizerPresetsController` — owns the preset table.
//!
//! `SetBand`/`IncreaseBand`/`DecreaseBand` use this implementation's own
//! `PB<preset>,<band>,<lvl>` / `PB(U|D)<preset>,<band>` token family rather
//! than reusing the zone `EB` tokens — see `SPEC_FULL.md` §2.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::connection::Connection;
use crate::controllers::context::{
    load_container, parse_identifier, parse_ranged, require_arity, save_container, DirtyFlag,
};
use crate::dispatch::{Dispatcher, FnHandler};
use crate::error::HlxResult;
use crate::events::{StateChange, StateChangeKind, StateChangeSink};
use crate::model::collection::check_name_unique;
use crate::model::equalizer::{BAND_MAX, BAND_MIN};
use crate::model::{EqualizerPreset, IdentifierCollection, Identifier, EQUALIZER_PRESET_MAX};
use crate::protocol::catalog::{
    render_name_set, render_preset_band, render_query_preset, Verb,
};
use crate::protocol::framing::render_frame;

pub struct EqualizerPresetsController {
    presets: Mutex<IdentifierCollection<EqualizerPreset>>,
    dirty: Arc<DirtyFlag>,
    sink: Arc<dyn StateChangeSink>,
}

impl EqualizerPresetsController {
    pub fn new(dirty: Arc<DirtyFlag>, sink: Arc<dyn StateChangeSink>) -> Self {
        Self {
            presets: Mutex::new(IdentifierCollection::new(
                    EQUALIZER_PRESET_MAX,
                    "equalizer preset",
                    EqualizerPreset::new,
                )),
            dirty,
            sink,
        }
    }

    pub fn register(self: &Arc<Self>, dispatcher: &Dispatcher) {
        let a = self.clone();
        dispatcher.register(
            Verb::PresetBand,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let a = a.clone();
                        async move { a.handle_set_band(connection, captures).await }
                    })),
        );
        let b = self.clone();
        dispatcher.register(
            Verb::PresetBandIncDec,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let b = b.clone();
                        async move { b.handle_band_inc_dec(connection, captures).await }
                    })),
        );
        let c = self.clone();
        dispatcher.register(
            Verb::QueryPreset,
            Arc::new(FnHandler::new(move |connection, captures| {
                        let c = c.clone();
                        async move { c.handle_query(connection, captures).await }
                    })),
        );
    }

    async fn handle_set_band(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 3).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let (preset, band, level) = (
            parse_identifier(&captures[0], EQUALIZER_PRESET_MAX, "preset"),
            captures[1].parse::<u8>(),
            parse_ranged(&captures[2], BAND_MIN, BAND_MAX, "band level"),
        );
        let (Ok(preset), Ok(band), Ok(level)) = (preset, band, level) else {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        };

        let outcome = {
            let mut presets = self.presets.lock();
            match presets.get_mut(preset) {
                Ok(p) => match p.bands_mut().set(band, level) {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let _ = connection.send(&render_frame("ERROR")).await;
                        return;
                    }
                },
                Err(_) => {
                    let _ = connection.send(&render_frame("ERROR")).await;
                    return;
                }
            }
        };

        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::PresetBand,
                    Some(preset),
                    level.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_preset_band(preset, band, level)))
            .await;
    }

    async fn handle_band_inc_dec(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 3).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let increase = captures[0] == "U";
        let preset = parse_identifier(&captures[1], EQUALIZER_PRESET_MAX, "preset");
        let band = captures[2].parse::<u8>();
        let (Ok(preset), Ok(band)) = (preset, band) else {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        };

        let (level, outcome) = {
            let mut presets = self.presets.lock();
            let entry = match presets.get_mut(preset) {
                Ok(p) => p,
                Err(_) => {
                    let _ = connection.send(&render_frame("ERROR")).await;
                    return;
                }
            };
            let result = if increase {
                entry.bands_mut().increase(band)
            } else {
                entry.bands_mut().decrease(band)
            };
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(_) => {
                    let _ = connection.send(&render_frame("ERROR")).await;
                    return;
                }
            };
            (entry.bands().get(band).unwrap_or(0), outcome)
        };

        if outcome.is_changed() {
            self.dirty.mark();
            self.sink.on_state_change(StateChange::new(
                    StateChangeKind::PresetBand,
                    Some(preset),
                    level.to_string(),
                ));
        }
        let _ = connection
            .send(&render_frame(&render_preset_band(preset, band, level)))
            .await;
    }

    async fn handle_query(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        if require_arity(&captures, 1).is_err() {
            let _ = connection.send(&render_frame("ERROR")).await;
            return;
        }
        let id = match parse_identifier(&captures[0], EQUALIZER_PRESET_MAX, "preset") {
            Ok(id) => id,
            Err(_) => {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
        };
        self.write_query_response(&connection, id).await;
    }

    /// Name, then one band response per band in identifier order, then the
    /// echoed `(QE<id>)` end frame.
    async fn write_query_response(&self, connection: &Arc<dyn Connection>, id: Identifier) {
        let (name, bands) = {
            let presets = self.presets.lock();
            match presets.get(id) {
                Ok(p) => (
                    p.name().as_str().to_string(),
                    p.bands().iter().collect::<Vec<_>>(),
                ),
                Err(_) => {
                    let _ = connection.send(&render_frame("ERROR")).await;
                    return;
                }
            }
        };
        let _ = connection
            .send(&render_frame(&render_name_set('E', id, &name)))
            .await;
        for (band, level) in bands {
            let _ = connection
                .send(&render_frame(&render_preset_band(id, band, level)))
                .await;
        }
        let _ = connection
            .send(&render_frame(&render_query_preset(id)))
            .await;
    }

    /// `SetName(id, name)`, unconditional.
    pub async fn set_name(&self, connection: Arc<dyn Connection>, id: Identifier, name: &str) {
        let outcome = {
            let mut presets = self.presets.lock();
            if presets.get(id).is_err()
            || check_name_unique(&presets, id, name, |p| p.name().as_str()).is_err()
            {
                let _ = connection.send(&render_frame("ERROR")).await;
                return;
            }
            match presets.get_mut(id).unwrap().name_mut().set(name) {
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
                .on_state_change(StateChange::new(StateChangeKind::PresetName, Some(id), name));
        }
        let _ = connection
            .send(&render_frame(&render_name_set('E', id, name)))
            .await;
    }

    /// `QueryCurrent` fan-out: iterates all presets.
    pub async fn write_current_snapshot(&self, connection: &Arc<dyn Connection>) {
        let ids: Vec<Identifier> = (1..=self.presets.lock().max()).collect();
        for id in ids {
            self.write_query_response(connection, id).await;
        }
    }

    pub fn reset_to_defaults(&self) {
        self.presets.lock().reset(EqualizerPreset::new);
    }

    pub fn load_from_backup(&self, doc: &serde_json::Value) -> HlxResult<()> {
        let entries: Vec<EqualizerPreset> = load_container(doc, "Equalizer Presets")?;
        self.presets.lock().load_backup(entries)
    }

    pub fn save_to_backup(&self, doc: &mut serde_json::Value) {
        let presets = self.presets.lock();
        save_container(doc, "Equalizer Presets", presets.to_backup());
    }
}
