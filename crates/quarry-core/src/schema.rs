//! Schema introspection traits and types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Schema introspection interface
///
/// Implementations only read catalog views; `schema` of `None` means the
/// connection's default schema (PostgreSQL `current_schema()`, the connected
/// database on MySQL).
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List base tables in a schema, ordered by name
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>>;

    /// Get columns for a table, ordered by ordinal position
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>>;
}

/// Table information (basic)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: Option<String>,
    pub name: String,
}

impl TableInfo {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }
}

/// Column information as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// 1-based ordinal as the backend numbers it
    pub ordinal: usize,
    /// Backend-native type label, e.g. `character varying(255)` or `tinyint(1)`
    pub data_type: String,
    pub nullable: bool,
}
