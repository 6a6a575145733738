//! `Crossover` — a lowpass or highpass cutoff frequency in Hz.

use crate::error::HlxResult;
use crate::model::identifier::{check_range, MutationOutcome};

/// Lower bound of a crossover frequency, inclusive.
pub const CROSSOVER_MIN: u16 = 1;
/// Upper bound of a crossover frequency, inclusive.
pub const CROSSOVER_MAX: u16 = 20_000;
/// Device default crossover frequency.
pub const CROSSOVER_DEFAULT: u16 = 100;

/// A single crossover cutoff frequency, in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Crossover(u16);

impl Default for Crossover {
    fn default() -> Self {
        Self(CROSSOVER_DEFAULT)
    }
}

impl Crossover {
    pub fn hz(&self) -> u16 {
        self.0
    }

    pub fn set(&mut self, hz: u16) -> HlxResult<MutationOutcome> {
        check_range(hz, CROSSOVER_MIN, CROSSOVER_MAX, "crossover frequency")?;
        if hz == self.0 {
            return Ok(MutationOutcome::NoChange);
        }
        self.0 = hz;
        Ok(MutationOutcome::Changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_100hz() {
        assert_eq!(Crossover::default().hz(), 100);
    }

    #[test]
    fn accepts_endpoints_rejects_zero_and_overflow() {
        let mut c = Crossover::default();
        assert!(c.set(CROSSOVER_MIN).is_ok());
        assert!(c.set(CROSSOVER_MAX).is_ok());
        assert!(c.set(0).is_err());
        assert!(c.set(CROSSOVER_MAX + 1).is_err());
    }
}
