//! `SoundMode` — the tagged union selecting which equalizer/tone path a
//! zone's audio currently runs through.

use crate::error::{HlxError, HlxResult};

/// Which equalizer/tone path a zone currently uses.
///
/// Wire-coded as a single digit `0..=5`; the ordering here is load-bearing
/// for the wire encoding and must not be reshuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SoundMode {
    #[default]
    Disabled = 0,
    ZoneEqualizer = 1,
    PresetEqualizer = 2,
    Tone = 3,
    Lowpass = 4,
    Highpass = 5,
}

impl SoundMode {
    /// Decodes the wire digit `0..=5`.
    pub fn from_wire(code: u8) -> HlxResult<Self> {
        Ok(match code {
                0 => Self::Disabled,
                1 => Self::ZoneEqualizer,
                2 => Self::PresetEqualizer,
                3 => Self::Tone,
                4 => Self::Lowpass,
                5 => Self::Highpass,
                other => {
                    return Err(HlxError::OutOfRange(format!(
                                "sound mode {other} not in [0, 5]"
                            )))
                }
            })
    }

    /// Encodes as the wire digit.
    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_valid_code() {
        for code in 0..=5u8 {
            let mode = SoundMode::from_wire(code).unwrap();
            assert_eq!(mode.to_wire(), code);
        }
    }

    #[test]
    fn tone_renders_as_three() {
        assert_eq!(SoundMode::Tone.to_wire(), 3);
    }

    #[test]
    fn rejects_out_of_range_code() {
        assert!(SoundMode::from_wire(6).is_err());
    }
}
