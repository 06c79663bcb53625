//! Resource catalog: which tables back which API resources.

mod entity;
mod resources;
mod validator;

pub use entity::*;
pub use resources::builtin_entities;
pub use validator::{validate, validate_routes};

use crate::error::ConfigError;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct Catalog {
    pub entities: Vec<ResolvedEntity>,
    entity_by_resource: HashMap<String, usize>,
}

impl Catalog {
    /// Validate and index entities.
    pub fn new(entities: Vec<ResolvedEntity>) -> Result<Self, ConfigError> {
        validate(&entities)?;
        let entity_by_resource = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.resource.clone(), i))
            .collect();
        Ok(Catalog {
            entities,
            entity_by_resource,
        })
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::new(builtin_entities())
    }

    pub fn entity(&self, resource: &str) -> Option<&ResolvedEntity> {
        self.entity_by_resource.get(resource).map(|&i| &self.entities[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_resource() {
        let catalog = Catalog::builtin().unwrap();
        let bets = catalog.entity("bets").unwrap();
        assert_eq!(bets.table_name, "bets");
        assert!(bets.allows(EntityOperation::Delete));
        assert!(!catalog.entity("countries").unwrap().allows(EntityOperation::Create));
        assert!(catalog.entity("team_logos").is_none());
    }
}
