//! Entity descriptors used by the SQL builder and CRUD service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Primary key type for parsing path/body ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PkType {
    BigInt,
    Text,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub pk_type: Option<PkType>,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. identity, NOW()).
    pub has_default: bool,
    /// PostgreSQL type used to cast bound parameters (e.g. "timestamptz", "numeric").
    pub pg_type: Option<String>,
}

impl ColumnInfo {
    pub fn text(name: &str) -> Self {
        ColumnInfo {
            name: name.to_string(),
            pk_type: None,
            nullable: true,
            has_default: false,
            pg_type: None,
        }
    }

    pub fn typed(name: &str, pg_type: &str) -> Self {
        ColumnInfo {
            pg_type: Some(pg_type.to_string()),
            ..Self::text(name)
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn is_numeric(&self) -> bool {
        self.pg_type.as_deref() == Some("numeric")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityOperation {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    /// Resource name as used by route rules (e.g. "bets").
    pub resource: String,
    pub schema_name: String,
    pub table_name: String,
    pub pk_column: String,
    pub pk_type: PkType,
    pub columns: Vec<ColumnInfo>,
    pub operations: Vec<EntityOperation>,
    /// Column matched by `search` actions.
    pub search_column: Option<String>,
    /// Default ordering column for listings; falls back to the primary key.
    pub order_column: Option<String>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn allows(&self, op: EntityOperation) -> bool {
        self.operations.contains(&op)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn order_column(&self) -> &str {
        self.order_column.as_deref().unwrap_or(&self.pk_column)
    }
}
