//! `Favorite` — a named, empty-bodied slot.

use crate::model::identifier::Identifier;
use crate::model::name::Name;

/// Maximum number of favorites.
pub const FAVORITE_MAX: Identifier = 10;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Favorite {
    id: Identifier,
    name: Name,
}

impl Favorite {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            name: Name::new(format!("Favorite Name {id}")).expect("generated name fits"),
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
}
