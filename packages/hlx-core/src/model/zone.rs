//! `Zone` — one audio output channel, the busiest value object in the
//! model.

use crate::error::HlxResult;
use crate::model::balance::Balance;
use crate::model::crossover::Crossover;
use crate::model::equalizer::EqualizerBands;
use crate::model::identifier::{check_identifier, Identifier, MutationOutcome};
use crate::model::name::Name;
use crate::model::sound::SoundMode;
use crate::model::source::SOURCE_MAX;
use crate::model::tone::Tone;
use crate::model::volume::Volume;

/// Maximum number of zones.
pub const ZONE_MAX: Identifier = 24;

/// One audio output channel with its own volume, source, sound mode and
/// equalizer. All attributes are always present; only the ones relevant
/// to `sound_mode` are reported on a query.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Zone {
    id: Identifier,
    name: Name,
    balance: Balance,
    sound_mode: SoundMode,
    bands: EqualizerBands,
    equalizer_preset_id: Identifier,
    tone: Tone,
    lowpass_crossover: Crossover,
    highpass_crossover: Crossover,
    source_id: Identifier,
    volume: Volume,
}

impl Zone {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            name: Name::new(format!("Zone Name {id}")).expect("generated name fits"),
            balance: Balance::default(),
            sound_mode: SoundMode::default(),
            bands: EqualizerBands::default(),
            equalizer_preset_id: 1,
            tone: Tone::default(),
            lowpass_crossover: Crossover::default(),
            highpass_crossover: Crossover::default(),
            source_id: 1,
            volume: Volume::default(),
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn name_mut(&mut self) -> &mut Name {
        &mut self.name
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    pub fn balance_mut(&mut self) -> &mut Balance {
        &mut self.balance
    }

    pub fn sound_mode(&self) -> SoundMode {
        self.sound_mode
    }

    pub fn bands(&self) -> &EqualizerBands {
        &self.bands
    }

    pub fn bands_mut(&mut self) -> &mut EqualizerBands {
        &mut self.bands
    }

    pub fn equalizer_preset_id(&self) -> Identifier {
        self.equalizer_preset_id
    }

    pub fn tone(&self) -> &Tone {
        &self.tone
    }

    pub fn tone_mut(&mut self) -> &mut Tone {
        &mut self.tone
    }

    pub fn lowpass_crossover(&self) -> &Crossover {
        &self.lowpass_crossover
    }

    pub fn lowpass_crossover_mut(&mut self) -> &mut Crossover {
        &mut self.lowpass_crossover
    }

    pub fn highpass_crossover(&self) -> &Crossover {
        &self.highpass_crossover
    }

    pub fn highpass_crossover_mut(&mut self) -> &mut Crossover {
        &mut self.highpass_crossover
    }

    pub fn source_id(&self) -> Identifier {
        self.source_id
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn volume_mut(&mut self) -> &mut Volume {
        &mut self.volume
    }

    /// Sets the source, range-checked against `[1, SOURCE_MAX]`.
    pub fn set_source(&mut self, source_id: Identifier) -> HlxResult<MutationOutcome> {
        check_identifier(source_id, SOURCE_MAX, "source")?;
        if source_id == self.source_id {
            return Ok(MutationOutcome::NoChange);
        }
        self.source_id = source_id;
        Ok(MutationOutcome::Changed)
    }

    /// Sets the equalizer preset selection (no range check beyond the
    /// preset table's own maximum, enforced by the caller which has
    /// access to that collection).
    pub fn set_equalizer_preset_id(&mut self, preset_id: Identifier) -> MutationOutcome {
        if preset_id == self.equalizer_preset_id {
            return MutationOutcome::NoChange;
        }
        self.equalizer_preset_id = preset_id;
        MutationOutcome::Changed
    }

    /// Transitions `sound_mode` to `required`. Conditional: if already in
    /// `required`, reports `NoChange` so the caller (the sound-mode
    /// conditional prelude, §4.5.4) can suppress the notification frame.
    pub fn set_sound_mode(&mut self, required: SoundMode) -> MutationOutcome {
        if self.sound_mode == required {
            return MutationOutcome::NoChange;
        }
        self.sound_mode = required;
        MutationOutcome::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_and_mode() {
        let z = Zone::new(5);
        assert_eq!(z.name().as_str(), "Zone Name 5");
        assert_eq!(z.sound_mode(), SoundMode::Disabled);
    }

    #[test]
    fn set_source_rejects_out_of_range() {
        let mut z = Zone::new(1);
        assert!(z.set_source(0).is_err());
        assert!(z.set_source(SOURCE_MAX + 1).is_err());
        assert!(z.set_source(SOURCE_MAX).is_ok());
    }

    #[test]
    fn sound_mode_transition_is_conditional() {
        let mut z = Zone::new(1);
        assert_eq!(z.set_sound_mode(SoundMode::Tone), MutationOutcome::Changed);
        assert_eq!(z.set_sound_mode(SoundMode::Tone), MutationOutcome::NoChange);
    }

    #[test]
    fn query_idempotent_snapshot() {
        let z = Zone::new(1);
        let snap = |z: &Zone| {
            (
                z.name().as_str().to_string(),
                z.balance().value(),
                z.source_id(),
                z.volume().level(),
                z.volume().is_muted(),
                z.volume().is_fixed(),
                z.sound_mode(),
            )
        };
        assert_eq!(snap(&z), snap(&z));
    }
}
