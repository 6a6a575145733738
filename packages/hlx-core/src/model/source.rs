//! `Source` — one of up to eight audio inputs.

use crate::model::identifier::Identifier;
use crate::model::name::Name;

/// Maximum number of sources.
pub const SOURCE_MAX: Identifier = 8;

/// One audio input.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Source {
    id: Identifier,
    name: Name,
}

impl Source {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            name: Name::new(format!("Source Name {id}")).expect("generated name fits"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_follows_generated_convention() {
        let s = Source::new(3);
        assert_eq!(s.name().as_str(), "Source Name 3");
    }
}
