//! `EqualizerPreset` — a named ten-band EQ curve independent of any zone.

use crate::model::equalizer::EqualizerBands;
use crate::model::identifier::Identifier;
use crate::model::name::Name;

/// Maximum number of equalizer presets.
pub const EQUALIZER_PRESET_MAX: Identifier = 10;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EqualizerPreset {
    id: Identifier,
    name: Name,
    bands: EqualizerBands,
}

impl EqualizerPreset {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            name: Name::new(format!("EQ Preset Name {id}")).expect("generated name fits"),
            bands: EqualizerBands::default(),
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

    pub fn bands(&self) -> &EqualizerBands {
        &self.bands
    }

    pub fn bands_mut(&mut self) -> &mut EqualizerBands {
        &mut self.bands
    }
}
