//! `Balance` — signed left/right channel balance with a discontinuous,
//! tagged wire representation.

use crate::error::HlxResult;
use crate::model::identifier::{check_range, MutationOutcome};

/// Lower bound of [`Balance`] (fully left).
pub const BALANCE_MIN: i8 = -80;
/// Upper bound of [`Balance`] (fully right).
pub const BALANCE_MAX: i8 = 80;

/// Which channel a wire-form balance magnitude is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

/// A zone's stereo balance: negative is left-biased, positive is
/// right-biased, zero is center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Balance(i8);

impl Balance {
    pub fn value(&self) -> i8 {
        self.0
    }

    /// Sets the balance from a signed value in `[-80, 80]`.
    pub fn set(&mut self, value: i8) -> HlxResult<MutationOutcome> {
        check_range(value, BALANCE_MIN, BALANCE_MAX, "balance")?;
        if value == self.0 {
            return Ok(MutationOutcome::NoChange);
        }
        self.0 = value;
        Ok(MutationOutcome::Changed)
    }

    /// Sets the balance from a wire-form `(channel, magnitude)` pair.
    /// `magnitude` is in `[0, 80]`; `Left` negates it, `Right` keeps it
    /// positive.
    pub fn set_tagged(&mut self, channel: Channel, magnitude: i8) -> HlxResult<MutationOutcome> {
        check_range(magnitude, 0, BALANCE_MAX, "balance magnitude")?;
        let signed = match channel {
            Channel::Left => -magnitude,
            Channel::Right => magnitude,
        };
        self.set(signed)
    }

    /// Moves one unit toward `channel`, per
    /// §9's resolved-ambiguity rule: a single step always changes the
    /// stored value by 1 unless already at the saturation endpoint, with
    /// no special case at the zero crossing.
    pub fn adjust(&mut self, channel: Channel) -> MutationOutcome {
        let (next, outcome) = match channel {
            Channel::Left => {
                if self.0 <= BALANCE_MIN {
                    (self.0, MutationOutcome::NoChange)
                } else {
                    (self.0 - 1, MutationOutcome::Changed)
                }
            }
            Channel::Right => {
                if self.0 >= BALANCE_MAX {
                    (self.0, MutationOutcome::NoChange)
                } else {
                    (self.0 + 1, MutationOutcome::Changed)
                }
            }
        };
        self.0 = next;
        outcome
    }

    /// Renders `self` as a `(channel, magnitude)` wire pair. Zero renders
    /// as `Right, 0` (: `render(zone=5, balance=0) → "BP5,R0"`).
    pub fn as_tagged(&self) -> (Channel, i8) {
        if self.0 < 0 {
            (Channel::Left, -self.0)
        } else {
            (Channel::Right, self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_left_normalizes_to_negative() {
        let mut b = Balance::default();
        b.set_tagged(Channel::Left, 40).unwrap();
        assert_eq!(b.value(), -40);
    }

    #[test]
    fn tagged_right_stays_positive() {
        let mut b = Balance::default();
        b.set_tagged(Channel::Right, 0).unwrap();
        assert_eq!(b.value(), 0);
        assert_eq!(b.as_tagged(), (Channel::Right, 0));
    }

    #[test]
    fn zero_renders_as_right() {
        let b = Balance::default();
        assert_eq!(b.as_tagged(), (Channel::Right, 0));
    }

    #[test]
    fn adjust_moves_one_step_and_saturates() {
        let mut b = Balance::default();
        b.set(BALANCE_MAX).unwrap();
        assert_eq!(b.adjust(Channel::Right), MutationOutcome::NoChange);
        assert_eq!(b.adjust(Channel::Left), MutationOutcome::Changed);
        assert_eq!(b.value(), BALANCE_MAX - 1);
    }

    #[test]
    fn range_rejects_past_endpoints() {
        let mut b = Balance::default();
        assert!(b.set(BALANCE_MAX + 1).is_err());
        assert!(b.set(BALANCE_MIN - 1).is_err());
    }
}
