//! `Tone` — bass and treble, each independently bounded `[-10, +10]`.

use crate::error::HlxResult;
use crate::model::identifier::{
    check_range, saturating_decrease, saturating_increase, MutationOutcome,
};

/// Lower bound of bass/treble.
pub const TONE_MIN: i8 = -10;
/// Upper bound of bass/treble.
pub const TONE_MAX: i8 = 10;

/// A zone's tone control: bass and treble levels, flat (`0`) by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Tone {
    bass: i8,
    treble: i8,
}

impl Tone {
    pub fn bass(&self) -> i8 {
        self.bass
    }

    pub fn treble(&self) -> i8 {
        self.treble
    }

    pub fn set_bass(&mut self, level: i8) -> HlxResult<MutationOutcome> {
        check_range(level, TONE_MIN, TONE_MAX, "bass")?;
        if level == self.bass {
            return Ok(MutationOutcome::NoChange);
        }
        self.bass = level;
        Ok(MutationOutcome::Changed)
    }

    pub fn set_treble(&mut self, level: i8) -> HlxResult<MutationOutcome> {
        check_range(level, TONE_MIN, TONE_MAX, "treble")?;
        if level == self.treble {
            return Ok(MutationOutcome::NoChange);
        }
        self.treble = level;
        Ok(MutationOutcome::Changed)
    }

    /// Sets both in one call; used by `SetTone(id, bass, treble)`.
    pub fn set_both(&mut self, bass: i8, treble: i8) -> HlxResult<MutationOutcome> {
        check_range(bass, TONE_MIN, TONE_MAX, "bass")?;
        check_range(treble, TONE_MIN, TONE_MAX, "treble")?;
        if bass == self.bass && treble == self.treble {
            return Ok(MutationOutcome::NoChange);
        }
        self.bass = bass;
        self.treble = treble;
        Ok(MutationOutcome::Changed)
    }

    pub fn increase_bass(&mut self) -> MutationOutcome {
        let (v, outcome) = saturating_increase(self.bass, TONE_MAX);
        self.bass = v;
        outcome
    }

    pub fn decrease_bass(&mut self) -> MutationOutcome {
        let (v, outcome) = saturating_decrease(self.bass, TONE_MIN);
        self.bass = v;
        outcome
    }

    pub fn increase_treble(&mut self) -> MutationOutcome {
        let (v, outcome) = saturating_increase(self.treble, TONE_MAX);
        self.treble = v;
        outcome
    }

    pub fn decrease_treble(&mut self) -> MutationOutcome {
        let (v, outcome) = saturating_decrease(self.treble, TONE_MIN);
        self.treble = v;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_both_accepts_endpoints() {
        let mut t = Tone::default();
        assert!(t.set_both(TONE_MIN, TONE_MAX).is_ok());
        assert_eq!(t.bass(), TONE_MIN);
        assert_eq!(t.treble(), TONE_MAX);
    }

    #[test]
    fn increase_bass_saturates() {
        let mut t = Tone::default();
        t.set_bass(TONE_MAX).unwrap();
        assert_eq!(t.increase_bass(), MutationOutcome::NoChange);
    }
}
