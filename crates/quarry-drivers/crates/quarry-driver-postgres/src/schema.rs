//! PostgreSQL schema introspection implementation

use async_trait::async_trait;
use quarry_core::{ColumnInfo, Connection, Result, SchemaIntrospection, TableInfo, Value};

use crate::PostgresConnection;

/// Ordinary and partitioned tables of one schema
pub(crate) const LIST_TABLES_SQL: &str = "\
SELECT n.nspname::text AS table_schema, c.relname::text AS table_name
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = COALESCE($1::text, current_schema())
  AND c.relkind IN ('r', 'p')
ORDER BY c.relname";

/// Live columns of one table, with the same type labels `\d` shows
pub(crate) const LIST_COLUMNS_SQL: &str = "\
SELECT a.attname::text AS column_name,
       a.attnum::int4 AS ordinal,
       pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
       NOT a.attnotnull AS is_nullable
FROM pg_catalog.pg_attribute a
JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = COALESCE($1::text, current_schema())
  AND c.relname = $2::text
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum";

fn schema_param(schema: Option<&str>) -> Value {
    schema
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null)
}

#[async_trait]
impl SchemaIntrospection for PostgresConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>> {
        let result = self.query(LIST_TABLES_SQL, &[schema_param(schema)]).await?;

        let tables = result
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.get(1).and_then(|v| v.as_str())?;
                let schema = row.get(0).and_then(|v| v.as_str()).map(str::to_string);
                Some(TableInfo::new(schema, name))
            })
            .collect();

        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        let result = self
            .query(
                LIST_COLUMNS_SQL,
                &[schema_param(schema), Value::String(table.to_string())],
            )
            .await?;

        let columns = result
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.get(0).and_then(|v| v.as_str())?.to_string();
                let ordinal = row.get(1).and_then(|v| v.as_i64()).unwrap_or(0) as usize;
                let data_type = row
                    .get(2)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let nullable = row.get(3).and_then(|v| v.as_bool()).unwrap_or(true);

                Some(ColumnInfo {
                    name,
                    ordinal,
                    data_type,
                    nullable,
                })
            })
            .collect();

        Ok(columns)
    }
}
