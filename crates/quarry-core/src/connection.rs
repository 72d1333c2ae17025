//! Connection trait

use crate::{QueryResult, Result, SchemaIntrospection, Value};
use async_trait::async_trait;

/// A short-lived connection to a tenant's backend.
///
/// Connections are opened per request and closed when the request is done;
/// nothing in Quarry keeps one alive between requests.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "postgresql", "mysql")
    fn driver_name(&self) -> &str;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Query used to check that the backend is alive
    fn ping_query(&self) -> &'static str {
        "SELECT 1"
    }

    /// Quote an identifier for this connection's SQL dialect.
    ///
    /// The default is ANSI double quotes with embedded quotes doubled.
    fn quote_identifier(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Get schema introspection interface if supported
    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        None
    }
}
