//! `EqualizerBand` — one level in a fixed ten-band table, shared by zones
//! and equalizer presets.

use crate::error::HlxResult;
use crate::model::identifier::{
    check_range, saturating_decrease, saturating_increase, MutationOutcome,
};

/// Number of bands in every equalizer table (zone or preset).
pub const BAND_COUNT: usize = 10;
/// Lower bound of a band's level.
pub const BAND_MIN: i8 = -10;
/// Upper bound of a band's level.
pub const BAND_MAX: i8 = 10;

/// A fixed ten-band equalizer table, flat (`0`) by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EqualizerBands([i8; BAND_COUNT]);

impl Default for EqualizerBands {
    fn default() -> Self {
        Self([0; BAND_COUNT])
    }
}

impl EqualizerBands {
    /// Reads band `band` (1-based, `1..=10`).
    pub fn get(&self, band: u8) -> HlxResult<i8> {
        let idx = Self::index(band)?;
        Ok(self.0[idx])
    }

    /// Sets band `band` to `level`, clamped to `[-10, 10]`.
    pub fn set(&mut self, band: u8, level: i8) -> HlxResult<MutationOutcome> {
        let idx = Self::index(band)?;
        check_range(level, BAND_MIN, BAND_MAX, "equalizer band level")?;
        if self.0[idx] == level {
            return Ok(MutationOutcome::NoChange);
        }
        self.0[idx] = level;
        Ok(MutationOutcome::Changed)
    }

    /// Increases band `band` by one, saturating at `BAND_MAX`.
    pub fn increase(&mut self, band: u8) -> HlxResult<MutationOutcome> {
        let idx = Self::index(band)?;
        let (level, outcome) = saturating_increase(self.0[idx], BAND_MAX);
        self.0[idx] = level;
        Ok(outcome)
    }

    /// Decreases band `band` by one, saturating at `BAND_MIN`.
    pub fn decrease(&mut self, band: u8) -> HlxResult<MutationOutcome> {
        let idx = Self::index(band)?;
        let (level, outcome) = saturating_decrease(self.0[idx], BAND_MIN);
        self.0[idx] = level;
        Ok(outcome)
    }

    /// Iterates bands in ascending identifier order as `(band_id, level)`.
    pub fn iter(&self) -> impl Iterator<Item = (u8, i8)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &level)| (i as u8 + 1, level))
    }

    fn index(band: u8) -> HlxResult<usize> {
        crate::model::identifier::check_identifier(band, BAND_COUNT as u8, "equalizer band")?;
        Ok((band - 1) as usize)
    }
}
