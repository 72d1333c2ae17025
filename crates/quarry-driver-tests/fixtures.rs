//! Fixture data and a connector wired to a test backend

use anyhow::Context;
use async_trait::async_trait;
use quarry_connector::{
    ConnectorSettings, DataSourceConnector, DataSourceKind, DirectoryStore, Role, StoreError,
};
use quarry_core::{ConnectionSecret, DataSourceDescriptor};
use quarry_drivers::DriverRegistry;
use std::sync::Arc;
use std::time::Duration;

use crate::test_containers::Backend;

pub const ORGANIZATION: i64 = 1;
pub const DATA_SOURCE: i64 = 1;
pub const MEMBER: &str = "analyst@acme.test";
pub const USER_ROWS: usize = 25;

/// Directory with one organization, one viewer and one data source
pub struct FixtureDirectory {
    descriptor: DataSourceDescriptor,
}

impl FixtureDirectory {
    pub fn new(kind: DataSourceKind, secret: impl Into<ConnectionSecret>) -> Self {
        Self {
            descriptor: DataSourceDescriptor::new(DATA_SOURCE, ORGANIZATION, "fixture", kind, secret),
        }
    }
}

#[async_trait]
impl DirectoryStore for FixtureDirectory {
    async fn find_descriptor(&self, id: i64) -> Result<Option<DataSourceDescriptor>, StoreError> {
        Ok((id == DATA_SOURCE).then(|| self.descriptor.clone()))
    }

    async fn find_membership(
        &self,
        caller: &str,
        organization_id: i64,
    ) -> Result<Option<Role>, StoreError> {
        Ok((caller == MEMBER && organization_id == ORGANIZATION).then_some(Role::Viewer))
    }

    async fn delete_data_source(&self, _id: i64) -> Result<bool, StoreError> {
        Err(StoreError::Invalid("fixture directory is read-only".into()))
    }

    async fn rotate_secret(&self, _id: i64, _secret: ConnectionSecret) -> Result<bool, StoreError> {
        Err(StoreError::Invalid("fixture directory is read-only".into()))
    }
}

/// Connector over the real drivers with a short connect timeout
pub fn connector(kind: DataSourceKind, secret: impl Into<ConnectionSecret>) -> DataSourceConnector {
    let settings = ConnectorSettings {
        connect_timeout_secs: 2,
        ..ConnectorSettings::default()
    };
    DataSourceConnector::with_drivers(Arc::new(FixtureDirectory::new(kind, secret)), &settings)
}

/// Create `accounts` and `users` and fill `users` with [`USER_ROWS`] rows
pub async fn seed(backend: &Backend) -> anyhow::Result<()> {
    let kind = backend.backend.kind();
    let driver = DriverRegistry::with_defaults()
        .for_kind(kind)
        .context("no driver registered")?;
    let config = driver.parse_connection_string(&backend.connection_string)?;

    // The server may still be starting even after the container reports ready
    let max_retries = 6;
    let mut attempt = 1;
    let conn = loop {
        match driver.connect(&config).await {
            Ok(conn) => break conn,
            Err(e) if attempt < max_retries => {
                let delay = Duration::from_secs(1 << attempt.min(4));
                tracing::warn!(attempt, delay_secs = delay.as_secs(), "connect failed, retrying: {}", e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e).context("backend never accepted connections"),
        }
    };

    let serial = match kind {
        DataSourceKind::MySql => "INT AUTO_INCREMENT PRIMARY KEY",
        _ => "SERIAL PRIMARY KEY",
    };
    let accounts = "CREATE TABLE accounts (id INT NOT NULL PRIMARY KEY, name TEXT, active BOOLEAN)";
    let users = format!("CREATE TABLE users (id {}, name TEXT NOT NULL)", serial);
    let rows: Vec<String> = (1..=USER_ROWS).map(|i| format!("('user{}')", i)).collect();
    let insert = format!("INSERT INTO users (name) VALUES {}", rows.join(", "));

    for sql in [accounts, users.as_str(), insert.as_str()] {
        conn.query(sql, &[])
            .await
            .with_context(|| format!("fixture statement failed: {}", sql))?;
    }
    conn.close().await?;
    Ok(())
}
