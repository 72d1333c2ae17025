//! MySQL driver implementation

use async_trait::async_trait;
use quarry_core::{Connection, ConnectionConfig, DatabaseDriver, Result};
use std::sync::Arc;

use crate::MySqlConnection;

pub(crate) const DEFAULT_PORT: u16 = 3306;
const URL_SCHEMES: &[&str] = &["mysql", "mariadb"];

/// MySQL database driver
///
/// Also serves MariaDB, which speaks the same protocol.
pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MySqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn display_name(&self) -> &'static str {
        "MySQL"
    }

    fn default_port(&self) -> Option<u16> {
        Some(DEFAULT_PORT)
    }

    #[tracing::instrument(skip(self, config), fields(host = %config.host, database = config.database.as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = MySqlConnection::connect(config).await.inspect_err(|e| {
            tracing::debug!(error = %e, "failed to connect to MySQL database");
        })?;
        Ok(Arc::new(conn))
    }

    fn parse_connection_string(&self, conn_str: &str) -> Result<ConnectionConfig> {
        ConnectionConfig::from_url(self.name(), conn_str, URL_SCHEMES, DEFAULT_PORT)
    }
}
