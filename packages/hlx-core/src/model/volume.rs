//! `Volume` — level, mute, and lock state shared by every zone.

use crate::error::{HlxError, HlxResult};
use crate::model::identifier::{
    check_range, saturating_decrease, saturating_increase, MutationOutcome,
};

/// Lower bound of [`Volume::level`], inclusive.
pub const VOLUME_MIN: i8 = -80;
/// Upper bound of [`Volume::level`], inclusive.
pub const VOLUME_MAX: i8 = 0;

/// A zone's volume: level in `[-80, 0]`, mute flag, and fixed (locked) flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Volume {
    level: i8,
    mute: bool,
    fixed: bool,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            level: VOLUME_MIN,
            mute: false,
            fixed: false,
        }
    }
}

impl Volume {
    pub fn level(&self) -> i8 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Sets the level directly. Refused with `VolumeIsFixed` when locked
    ///.
    pub fn set_level(&mut self, level: i8) -> HlxResult<MutationOutcome> {
        if self.fixed {
            return Err(HlxError::VolumeIsFixed);
        }
        check_range(level, VOLUME_MIN, VOLUME_MAX, "volume level")?;
        if level == self.level {
            return Ok(MutationOutcome::NoChange);
        }
        self.level = level;
        Ok(MutationOutcome::Changed)
    }

    /// Increases by one, saturating at `VOLUME_MAX`. Subject to the same
    /// fixed-lock refusal as [`Volume::set_level`].
    pub fn increase(&mut self) -> HlxResult<MutationOutcome> {
        if self.fixed {
            return Err(HlxError::VolumeIsFixed);
        }
        let (level, outcome) = saturating_increase(self.level, VOLUME_MAX);
        self.level = level;
        Ok(outcome)
    }

    /// Decreases by one, saturating at `VOLUME_MIN`.
    pub fn decrease(&mut self) -> HlxResult<MutationOutcome> {
        if self.fixed {
            return Err(HlxError::VolumeIsFixed);
        }
        let (level, outcome) = saturating_decrease(self.level, VOLUME_MIN);
        self.level = level;
        Ok(outcome)
    }

    /// Sets mute. Unaffected by the fixed lock.
    pub fn set_mute(&mut self, mute: bool) -> MutationOutcome {
        if mute == self.mute {
            return MutationOutcome::NoChange;
        }
        self.mute = mute;
        MutationOutcome::Changed
    }

    pub fn toggle_mute(&mut self) -> MutationOutcome {
        self.mute = !self.mute;
        MutationOutcome::Changed
    }

    /// Sets the fixed (locked) flag. Unaffected by the lock itself.
    pub fn set_fixed(&mut self, fixed: bool) -> MutationOutcome {
        if fixed == self.fixed {
            return MutationOutcome::NoChange;
        }
        self.fixed = fixed;
        MutationOutcome::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_level_accepts_endpoints_rejects_past_them() {
        let mut v = Volume::default();
        assert!(v.set_level(VOLUME_MIN).is_ok());
        assert!(v.set_level(VOLUME_MAX).is_ok());
        assert!(v.set_level(VOLUME_MAX + 1).is_err());
        assert!(v.set_level(VOLUME_MIN - 1).is_err());
    }

    #[test]
    fn fixed_volume_refuses_set_level() {
        let mut v = Volume::default();
        v.set_fixed(true);
        assert_eq!(v.set_level(-10), Err(HlxError::VolumeIsFixed));
    }

    #[test]
    fn fixed_volume_still_allows_mute() {
        let mut v = Volume::default();
        v.set_fixed(true);
        assert_eq!(v.set_mute(true), MutationOutcome::Changed);
        assert!(v.is_muted());
    }

    #[test]
    fn increase_saturates_at_upper_bound() {
        let mut v = Volume::default();
        v.set_level(-1).unwrap();
        assert_eq!(v.increase().unwrap(), MutationOutcome::Changed);
        assert_eq!(v.level(), 0);
        assert_eq!(v.increase().unwrap(), MutationOutcome::NoChange);
        assert_eq!(v.level(), 0);
    }

    #[test]
    fn decrease_saturates_at_lower_bound() {
        let mut v = Volume::default();
        assert_eq!(v.level(), VOLUME_MIN);
        assert_eq!(v.decrease().unwrap(), MutationOutcome::NoChange);
        assert_eq!(v.level(), VOLUME_MIN);
    }
}
