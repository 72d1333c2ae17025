//! Schema discovery over one open connection

use quarry_core::{
    ColumnDescriptor, Connection, ConnectorSettings, SchemaIntrospection, SchemaSnapshot,
    TableDescriptor,
};
use std::time::Duration;

use crate::IntrospectionError;

/// Reads the tables and columns of a connection's default schema
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    query_timeout: Duration,
}

impl SchemaInspector {
    pub fn new(settings: &ConnectorSettings) -> Self {
        Self {
            query_timeout: settings.query_timeout(),
        }
    }

    /// Snapshot every base table with its columns.
    ///
    /// Tables come back in catalog (name) order and columns in ordinal order.
    /// The whole walk shares one `query_timeout` budget.
    #[tracing::instrument(skip(self, conn), fields(driver = conn.driver_name()))]
    pub async fn inspect(&self, conn: &dyn Connection) -> Result<SchemaSnapshot, IntrospectionError> {
        let introspection = capability(conn)?;
        let snapshot = tokio::time::timeout(self.query_timeout, walk(introspection))
            .await
            .map_err(|_| IntrospectionError::Timeout)??;

        tracing::debug!(table_count = snapshot.tables.len(), "schema inspected");
        Ok(snapshot)
    }

    /// Just the table names, in catalog order
    #[tracing::instrument(skip(self, conn), fields(driver = conn.driver_name()))]
    pub async fn table_names(&self, conn: &dyn Connection) -> Result<Vec<String>, IntrospectionError> {
        let introspection = capability(conn)?;
        let tables = tokio::time::timeout(self.query_timeout, introspection.list_tables(None))
            .await
            .map_err(|_| IntrospectionError::Timeout)?
            .map_err(|e| IntrospectionError::Backend(e.to_string()))?;

        Ok(tables.into_iter().map(|t| t.name).collect())
    }
}

fn capability(conn: &dyn Connection) -> Result<&dyn SchemaIntrospection, IntrospectionError> {
    conn.as_schema_introspection()
        .ok_or(IntrospectionError::NotSupported)
}

async fn walk(introspection: &dyn SchemaIntrospection) -> Result<SchemaSnapshot, IntrospectionError> {
    let tables = introspection
        .list_tables(None)
        .await
        .map_err(|e| IntrospectionError::Backend(e.to_string()))?;

    let mut descriptors = Vec::with_capacity(tables.len());
    for table in tables {
        let mut columns = introspection
            .get_columns(table.schema.as_deref(), &table.name)
            .await
            .map_err(|e| IntrospectionError::Backend(e.to_string()))?;
        columns.sort_by_key(|c| c.ordinal);

        descriptors.push(TableDescriptor {
            name: table.name,
            columns: columns
                .into_iter()
                .map(|c| ColumnDescriptor::new(c.name, c.data_type, c.nullable))
                .collect(),
        });
    }

    Ok(SchemaSnapshot::new(descriptors))
}
