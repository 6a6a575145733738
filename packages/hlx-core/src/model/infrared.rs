//! `Infrared` — whether the device's IR receiver is disabled.

use crate::model::identifier::MutationOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Infrared {
    disabled: bool,
}

impl Infrared {
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) -> MutationOutcome {
        if disabled == self.disabled {
            return MutationOutcome::NoChange;
        }
        self.disabled = disabled;
        MutationOutcome::Changed
    }
}
