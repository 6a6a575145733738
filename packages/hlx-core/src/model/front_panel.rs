//! `FrontPanel` — the device's physical front-panel state.

use crate::error::HlxResult;
use crate::model::identifier::{check_range, MutationOutcome};

/// Upper bound of [`FrontPanel::brightness`], inclusive.
pub const BRIGHTNESS_MAX: u8 = 3;
/// Default brightness.
pub const BRIGHTNESS_DEFAULT: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrontPanel {
    brightness: u8,
    locked: bool,
}

impl Default for FrontPanel {
    fn default() -> Self {
        Self {
            brightness: BRIGHTNESS_DEFAULT,
            locked: false,
        }
    }
}

impl FrontPanel {
    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_brightness(&mut self, level: u8) -> HlxResult<MutationOutcome> {
        check_range(level, 0, BRIGHTNESS_MAX, "front panel brightness")?;
        if level == self.brightness {
            return Ok(MutationOutcome::NoChange);
        }
        self.brightness = level;
        Ok(MutationOutcome::Changed)
    }

    pub fn set_locked(&mut self, locked: bool) -> MutationOutcome {
        if locked == self.locked {
            return MutationOutcome::NoChange;
        }
        self.locked = locked;
        MutationOutcome::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let fp = FrontPanel::default();
        assert_eq!(fp.brightness(), 2);
        assert!(!fp.is_locked());
    }

    #[test]
    fn brightness_accepts_endpoints_rejects_past_them() {
        let mut fp = FrontPanel::default();
        assert!(fp.set_brightness(0).is_ok());
        assert!(fp.set_brightness(BRIGHTNESS_MAX).is_ok());
        assert!(fp.set_brightness(BRIGHTNESS_MAX + 1).is_err());
    }
}
