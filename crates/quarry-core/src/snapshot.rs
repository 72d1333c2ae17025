//! Ephemeral results handed back to callers

use indexmap::IndexMap;
use serde::Serialize;

/// The tables and columns of one data source at one point in time.
///
/// Built fresh for every request; never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableDescriptor>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    /// Exact, case-sensitive lookup
    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Backend-native type label, not normalized
    #[serde(rename = "type")]
    pub type_label: String,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, type_label: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_label: type_label.into(),
            nullable,
        }
    }
}

/// Up to ten rows of one table, keyed by column in result order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewResult {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<IndexMap<String, serde_json::Value>>,
}

impl PreviewResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
