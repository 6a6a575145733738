//! `Group` — a named set of zone identifiers, stateless with respect to
//! audio attributes.

use std::collections::BTreeSet;

use crate::model::identifier::Identifier;
use crate::model::name::Name;

/// Maximum number of groups.
pub const GROUP_MAX: Identifier = 10;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Group {
    id: Identifier,
    name: Name,
    zone_set: BTreeSet<Identifier>,
}

impl Group {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            name: Name::new(format!("Group Name {id}")).expect("generated name fits"),
            zone_set: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn name_mut(&mut self) -> &mut Name {
        &mut self.name
    }

    /// Zone members in ascending identifier order.
    pub fn zone_set(&self) -> &BTreeSet<Identifier> {
        &self.zone_set
    }

    /// Adds a zone to membership. Idempotent: adding an existing member
    /// is a no-op rather than an error.
    pub fn add_zone(&mut self, zone_id: Identifier) -> bool {
        self.zone_set.insert(zone_id)
    }

    /// Removes a zone from membership. Removing a zone from its last
    /// referring group never deletes the zone — this method
    /// only ever touches `self.zone_set`.
    pub fn remove_zone(&mut self, zone_id: Identifier) -> bool {
        self.zone_set.remove(&zone_id)
    }

    pub fn clear_zones(&mut self) -> bool {
        if self.zone_set.is_empty() {
            return false;
        }
        self.zone_set.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_add_remove_idempotent() {
        let mut g = Group::new(1);
        assert!(g.add_zone(3));
        assert!(!g.add_zone(3));
        assert!(g.remove_zone(3));
        assert!(!g.remove_zone(3));
    }

    #[test]
    fn clear_zones_reports_whether_anything_changed() {
        let mut g = Group::new(1);
        assert!(!g.clear_zones());
        g.add_zone(1);
        g.add_zone(2);
        assert!(g.clear_zones());
        assert!(g.zone_set().is_empty());
    }
}
