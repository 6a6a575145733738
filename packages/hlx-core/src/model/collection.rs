//! Generic dense, 1-based collection shared by every sub-controller.
//!
//! Spec §3's invariant that "every identifier in `[min, max]` maps to
//! exactly one model instance" is implemented here once: a plain `Vec<T>`
//! sized at construction, never grown or shrunk afterward, indexed by
//! `identifier - 1`.

use crate::error::{HlxError, HlxResult};
use crate::model::identifier::{check_identifier, Identifier};

/// A dense collection of `max` entities, addressed by 1-based identifier.
#[derive(Debug, Clone)]
pub struct IdentifierCollection<T> {
    entries: Vec<T>,
    what: &'static str,
}

impl<T> IdentifierCollection<T> {
    /// Builds a collection of `max` entries, one per identifier, using
    /// `make` to produce the default value for each identifier in order.
    pub fn new(max: Identifier, what: &'static str, mut make: impl FnMut(Identifier) -> T) -> Self {
        let entries = (1..=max).map(&mut make).collect();
        Self { entries, what }
    }

    /// The highest valid identifier in this collection.
    pub fn max(&self) -> Identifier {
        self.entries.len() as Identifier
    }

    /// Returns a reference to the entity at `id`, or `OutOfRange`.
    pub fn get(&self, id: Identifier) -> HlxResult<&T> {
        check_identifier(id, self.max(), self.what)?;
        Ok(&self.entries[(id - 1) as usize])
    }

    /// Returns a mutable reference to the entity at `id`, or `OutOfRange`.
    pub fn get_mut(&mut self, id: Identifier) -> HlxResult<&mut T> {
        check_identifier(id, self.max(), self.what)?;
        Ok(&mut self.entries[(id - 1) as usize])
    }

    /// Iterates every entity in ascending identifier order, paired with its id.
    pub fn iter(&self) -> impl Iterator<Item = (Identifier, &T)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as Identifier + 1, e))
    }

    /// Resets every entry to a fresh default, using the same generator
    /// shape as [`IdentifierCollection::new`]. Used by `ResetToDefaults`.
    pub fn reset(&mut self, mut make: impl FnMut(Identifier) -> T) {
        for (i, slot) in self.entries.iter_mut().enumerate() {
            *slot = make(i as Identifier + 1);
        }
    }

    /// Snapshots every entry, in ascending identifier order, for the backup
    /// document.
    pub fn to_backup(&self) -> Vec<&T> {
        self.entries.iter().collect()
    }

    /// Restores every entry from a backup document snapshot, in the same
    /// order produced by [`IdentifierCollection::to_backup`].
    ///
    /// A length mismatch is `InvalidConfiguration` — the document was
    /// produced by a different maximum than this collection's (spec
    /// §4.5.7: structural defects trigger reset-to-defaults at load time).
    pub fn load_backup(&mut self, entries: Vec<T>) -> HlxResult<()> {
        if entries.len() != self.entries.len() {
            return Err(HlxError::InvalidConfiguration(format!(
                        "{} backup has {} entries, expected {}",
                        self.what,
                        entries.len(),
                        self.entries.len()
                    )));
        }
        self.entries = entries;
        Ok(())
    }
}

/// Raised when a `set_name` collides with an existing name elsewhere in the
/// same collection.
pub fn check_name_unique<T>(
    collection: &IdentifierCollection<T>,
    id: Identifier,
    candidate: &str,
    name_of: impl Fn(&T) -> &str,
) -> HlxResult<()> {
    for (other_id, entry) in collection.iter() {
        if other_id != id && name_of(entry) == candidate {
            return Err(HlxError::BadCommand(format!(
                        "name '{candidate}' already in use"
                    )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_maps_every_identifier_in_range() {
        let col = IdentifierCollection::new(4, "widget", |id| id * 10);
        assert_eq!(col.max(), 4);
        for id in 1..=4 {
            assert_eq!(*col.get(id).unwrap(), id * 10);
        }
    }

    #[test]
    fn collection_rejects_zero_and_past_max() {
        let col: IdentifierCollection<u8> = IdentifierCollection::new(4, "widget", |id| id);
        assert!(col.get(0).is_err());
        assert!(col.get(5).is_err());
    }

    #[test]
    fn reset_reapplies_generator() {
        let mut col = IdentifierCollection::new(3, "widget", |_| 0u8);
        *col.get_mut(2).unwrap() = 99;
        col.reset(|id| id * 2);
        assert_eq!(*col.get(2).unwrap(), 4);
    }

    #[test]
    fn name_uniqueness_rejects_collision_but_allows_self() {
        let col = IdentifierCollection::new(2, "widget", |id| format!("Widget {id}"));
        assert!(check_name_unique(&col, 1, "Widget 1", |s| s.as_str()).is_ok());
        assert!(check_name_unique(&col, 1, "Widget 2", |s| s.as_str()).is_err());
    }
}
