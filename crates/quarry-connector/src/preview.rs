//! Bounded, whitelisted table previews

use indexmap::IndexMap;
use quarry_core::{Connection, ConnectorSettings, PreviewResult};
use std::time::Duration;

use crate::{PreviewError, SchemaInspector};

/// Runs `SELECT * ... LIMIT n` against tables that are known to exist
#[derive(Debug, Clone)]
pub struct PreviewExecutor {
    inspector: SchemaInspector,
    query_timeout: Duration,
    row_limit: usize,
}

impl PreviewExecutor {
    pub fn new(settings: &ConnectorSettings) -> Self {
        Self {
            inspector: SchemaInspector::new(settings),
            query_timeout: settings.query_timeout(),
            row_limit: settings.preview_row_limit(),
        }
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Preview up to `row_limit` rows of `table`.
    ///
    /// `table` must appear verbatim in a fresh table list for this
    /// connection; anything else fails with `UnknownTable` before a query is
    /// built from it. Backend error text is the driver's own; callers holding
    /// the secret scrub it with [`PreviewError::redact`].
    #[tracing::instrument(skip(self, conn), fields(driver = conn.driver_name()))]
    pub async fn preview(&self, conn: &dyn Connection, table: &str) -> Result<PreviewResult, PreviewError> {
        let tables = self.inspector.table_names(conn).await?;
        if !tables.iter().any(|t| t == table) {
            tracing::debug!(table_count = tables.len(), "table not in whitelist");
            return Err(PreviewError::UnknownTable(table.to_string()));
        }

        let sql = preview_sql(conn, table, self.row_limit);
        let result = tokio::time::timeout(self.query_timeout, conn.query(&sql, &[]))
            .await
            .map_err(|_| PreviewError::Timeout)?
            .map_err(|e| PreviewError::Backend(e.to_string()))?;

        let columns = result.column_names();
        let rows: Vec<IndexMap<String, serde_json::Value>> = result
            .rows
            .iter()
            .take(self.row_limit)
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| {
                        let value = row
                            .get(idx)
                            .map(|v| v.to_json_scalar())
                            .unwrap_or(serde_json::Value::Null);
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect();

        tracing::debug!(row_count = rows.len(), "preview fetched");
        Ok(PreviewResult {
            table: table.to_string(),
            columns,
            rows,
        })
    }
}

/// The only statement ever built from caller input; `table` has already been
/// matched against the catalog.
pub(crate) fn preview_sql(conn: &dyn Connection, table: &str, limit: usize) -> String {
    format!(
        "SELECT * FROM {} LIMIT {}",
        conn.quote_identifier(table),
        limit
    )
}

#[cfg(test)]
mod tests;
