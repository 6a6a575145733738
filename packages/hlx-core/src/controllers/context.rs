//! Shared plumbing every sub-controller handler uses: the dirty flag and
//! capture parsing with range checks.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{HlxError, HlxResult};
use crate::model::identifier::{check_identifier, check_range};
use crate::model::Identifier;

/// The single boolean the Configuration controller autosaves against:
/// every successful mutating handler marks it, and the autosave timer
/// clears it on each successful write.
#[derive(Default)]
pub struct DirtyFlag(AtomicBool);

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Reads and clears in one step, for the autosave timer.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Parses one positional capture as an identifier in `[1, max]`.
pub fn parse_identifier(capture: &str, max: Identifier, what: &'static str) -> HlxResult<Identifier> {
    let raw: Identifier = capture
        .parse()
        .map_err(|_| HlxError::BadCommand(format!("{what}: '{capture}' is not a valid identifier")))?;
    check_identifier(raw, max, what)
}

/// Parses one positional capture as a ranged numeric value.
pub fn parse_ranged<T>(capture: &str, min: T, max: T, what: &'static str) -> HlxResult<T>
where
    T: FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let raw: T = capture
        .parse()
        .map_err(|_| HlxError::BadCommand(format!("{what}: '{capture}' is not a valid number")))?;
    check_range(raw, min, max, what)
}

/// Verifies a handler received exactly the expected number of positional
/// captures.
pub fn require_arity(captures: &[String], expected: usize) -> HlxResult<()> {
    if captures.len() != expected {
        return Err(HlxError::BadCommand(format!(
                    "expected {expected} captures, got {}",
                    captures.len()
                )));
    }
    Ok(())
}

/// Writes one sub-controller's container under `key` in the backup
/// document. Every sub-controller's
/// top-level key holds a positional array, one entry per identifier in
/// ascending order — the in-memory shape is authoritative, the on-disk
/// encoding is not.
pub fn save_container<T: Serialize>(doc: &mut Value, key: &str, items: Vec<&T>) {
    doc[key] = serde_json::to_value(items).expect("backup container always serializes");
}

/// Reads one sub-controller's container back out of the backup document.
/// Absent or structurally wrong entries are `MissingConfiguration` /
/// `InvalidConfiguration`, both of which the Configuration controller
/// treats as "discard and reset to defaults".
pub fn load_container<T: DeserializeOwned>(doc: &Value, key: &str) -> HlxResult<Vec<T>> {
    let value = doc
        .get(key)
        .ok_or_else(|| HlxError::MissingConfiguration(key.to_string()))?;
    serde_json::from_value(value.clone()).map_err(HlxError::from)
}
