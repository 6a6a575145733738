//! `Name` — a validated, bounded-length UTF-8 label shared by every
//! named collection (sources, zones, groups, presets, favorites).

use crate::error::{HlxError, HlxResult};
use crate::model::identifier::MutationOutcome;

/// Maximum length, in bytes, of a `Name`.
pub const NAME_MAX_LEN: usize = 16;

/// A validated name: 1 to 16 UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(String);

impl Name {
    /// Builds a `Name`, rejecting empty or over-long values.
    pub fn new(value: impl Into<String>) -> HlxResult<Self> {
        let value = value.into();
        let len = value.len();
        if len == 0 || len > NAME_MAX_LEN {
            return Err(HlxError::OutOfRange(format!(
                        "name length {len} not in [1, {NAME_MAX_LEN}]"
                    )));
        }
        Ok(Self(value))
    }

    /// Borrows the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sets `self` to `candidate`, in place.
    ///
    /// Returns `ValueAlreadySet` (as `MutationOutcome::NoChange`) when the
    /// candidate is byte-identical to the current value — treats
    /// this as success but skips the dirty flag.
    pub fn set(&mut self, candidate: impl Into<String>) -> HlxResult<MutationOutcome> {
        let candidate = candidate.into();
        let len = candidate.len();
        if len == 0 || len > NAME_MAX_LEN {
            return Err(HlxError::OutOfRange(format!(
                        "name length {len} not in [1, {NAME_MAX_LEN}]"
                    )));
        }
        if candidate == self.0 {
            return Ok(MutationOutcome::NoChange);
        }
        self.0 = candidate;
        Ok(MutationOutcome::Changed)
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Name::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_lengths() {
        assert!(Name::new("a").is_ok());
        assert!(Name::new("a".repeat(16)).is_ok());
    }

    #[test]
    fn rejects_empty_and_over_length() {
        assert!(Name::new("").is_err());
        assert!(Name::new("a".repeat(17)).is_err());
    }

    #[test]
    fn set_reports_no_change_for_identical_value() {
        let mut name = Name::new("Zone Name 1").unwrap();
        assert_eq!(
            name.set("Zone Name 1").unwrap(),
            MutationOutcome::NoChange
        );
        assert_eq!(name.set("Living Room").unwrap(), MutationOutcome::Changed);
        assert_eq!(name.as_str(), "Living Room");
    }
}
