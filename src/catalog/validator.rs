//! Catalog validation: unique resources, known columns, and route/catalog consistency.

use crate::catalog::entity::ResolvedEntity;
use crate::error::ConfigError;
use crate::routing::{ResourceOperation, RouteRule};
use std::collections::HashSet;

pub fn validate(entities: &[ResolvedEntity]) -> Result<(), ConfigError> {
    let mut resources = HashSet::new();
    for e in entities {
        if !resources.insert(e.resource.as_str()) {
            return Err(ConfigError::DuplicateResource(e.resource.clone()));
        }
        let pk = e.column(&e.pk_column).ok_or_else(|| ConfigError::InvalidPrimaryKey {
            resource: e.resource.clone(),
            column: e.pk_column.clone(),
        })?;
        if pk.pk_type.is_none() {
            return Err(ConfigError::InvalidPrimaryKey {
                resource: e.resource.clone(),
                column: e.pk_column.clone(),
            });
        }
        let referenced = e
            .search_column
            .iter()
            .chain(e.order_column.iter())
            .chain(e.validation.keys());
        for col in referenced {
            if e.column(col).is_none() {
                return Err(ConfigError::UnknownColumn {
                    resource: e.resource.clone(),
                    column: col.clone(),
                });
            }
        }
    }
    Ok(())
}

/// CRUD routes must target a catalog entity. Custom actions may target action-only resources.
pub fn validate_routes<'a>(
    entities: &[ResolvedEntity],
    rules: impl IntoIterator<Item = &'a RouteRule>,
) -> Result<(), ConfigError> {
    let known: HashSet<&str> = entities.iter().map(|e| e.resource.as_str()).collect();
    for rule in rules {
        if matches!(rule.operation, ResourceOperation::CustomAction(_)) {
            continue;
        }
        if !known.contains(rule.resource) {
            return Err(ConfigError::UnknownResource {
                route: rule.to_string(),
                resource: rule.resource.to_string(),
            });
        }
    }
    Ok(())
}
