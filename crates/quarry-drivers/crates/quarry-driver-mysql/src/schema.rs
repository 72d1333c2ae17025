//! MySQL schema introspection implementation

use async_trait::async_trait;
use quarry_core::{ColumnInfo, Connection, Result, SchemaIntrospection, TableInfo, Value};

use crate::MySqlConnection;

pub(crate) const LIST_TABLES_SQL: &str = "\
SELECT TABLE_SCHEMA, TABLE_NAME
FROM information_schema.TABLES
WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
  AND TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME";

/// `COLUMN_TYPE` keeps widths and signedness, e.g. `int(10) unsigned`
pub(crate) const LIST_COLUMNS_SQL: &str = "\
SELECT COLUMN_NAME, ORDINAL_POSITION, COLUMN_TYPE, IS_NULLABLE
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
  AND TABLE_NAME = ?
ORDER BY ORDINAL_POSITION";

impl MySqlConnection {
    fn schema_param(&self, schema: Option<&str>) -> Value {
        schema
            .or(self.default_database())
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null)
    }
}

#[async_trait]
impl SchemaIntrospection for MySqlConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>> {
        let result = self
            .query(LIST_TABLES_SQL, &[self.schema_param(schema)])
            .await?;

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
                &[self.schema_param(schema), Value::String(table.to_string())],
            )
            .await?;

        let columns = result
            .rows
            .iter()
            .filter_map(|row| {
                Some(ColumnInfo {
                    name: row.get(0).and_then(|v| v.as_str())?.to_string(),
                    ordinal: row.get(1).and_then(|v| v.as_i64()).unwrap_or(0) as usize,
                    data_type: row
                        .get(2)
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    // IS_NULLABLE is the string 'YES' or 'NO'
                    nullable: row.get(3).and_then(|v| v.as_bool()).unwrap_or(true),
                })
            })
            .collect();

        Ok(columns)
    }
}
