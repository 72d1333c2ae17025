//! PostgreSQL driver implementation

use async_trait::async_trait;
use quarry_core::{Connection, ConnectionConfig, DatabaseDriver, Result};
use std::sync::Arc;

use crate::PostgresConnection;

pub(crate) const DEFAULT_PORT: u16 = 5432;
const URL_SCHEMES: &[&str] = &["postgres", "postgresql"];

/// PostgreSQL database driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn default_port(&self) -> Option<u16> {
        Some(DEFAULT_PORT)
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, database = config.database.as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = PostgresConnection::connect(config).await.inspect_err(|e| {
            tracing::debug!(error = %e, "failed to connect to PostgreSQL database");
        })?;
        Ok(Arc::new(conn))
    }

    /// Accepts `postgres://` and `postgresql://` URLs. A `connect_timeout`
    /// and `sslmode` in the query string are honoured.
    fn parse_connection_string(&self, conn_str: &str) -> Result<ConnectionConfig> {
        ConnectionConfig::from_url(self.name(), conn_str, URL_SCHEMES, DEFAULT_PORT)
    }
}
