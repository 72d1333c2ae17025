//! Data source descriptors

use crate::{ConnectionSecret, QuarryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The closed set of backend kinds a data source may have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSourceKind {
    #[serde(rename = "postgresql")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    /// Registered for bookkeeping only; never introspected
    #[serde(rename = "csv")]
    FlatFile,
}

impl DataSourceKind {
    pub const ALL: [DataSourceKind; 3] = [
        DataSourceKind::Postgres,
        DataSourceKind::MySql,
        DataSourceKind::FlatFile,
    ];

    /// Stored and wire form
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceKind::Postgres => "postgresql",
            DataSourceKind::MySql => "mysql",
            DataSourceKind::FlatFile => "csv",
        }
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, DataSourceKind::Postgres | DataSourceKind::MySql)
    }

    /// Name of the driver that serves this kind, if any
    pub fn driver_name(&self) -> Option<&'static str> {
        match self {
            DataSourceKind::Postgres => Some("postgresql"),
            DataSourceKind::MySql => Some("mysql"),
            DataSourceKind::FlatFile => None,
        }
    }

    /// URL schemes accepted in a secret of this kind
    pub fn url_schemes(&self) -> &'static [&'static str] {
        match self {
            DataSourceKind::Postgres => &["postgres", "postgresql"],
            DataSourceKind::MySql => &["mysql", "mariadb"],
            DataSourceKind::FlatFile => &[],
        }
    }
}

impl FromStr for DataSourceKind {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DataSourceKind::Postgres),
            "mysql" => Ok(DataSourceKind::MySql),
            "csv" => Ok(DataSourceKind::FlatFile),
            other => Err(QuarryError::Configuration(format!(
                "unknown datasource type '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tenant's registered data source.
///
/// Owned by the directory store; the connector only reads it. `Debug` is safe
/// to log because the secret redacts itself.
#[derive(Debug, Clone)]
pub struct DataSourceDescriptor {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub kind: DataSourceKind,
    pub secret: ConnectionSecret,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataSourceDescriptor {
    pub fn new(
        id: i64,
        organization_id: i64,
        name: impl Into<String>,
        kind: DataSourceKind,
        secret: impl Into<ConnectionSecret>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            organization_id,
            name: name.into(),
            kind,
            secret: secret.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the descriptor is usable.
    ///
    /// Relational kinds need a URL secret whose scheme matches the kind.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.name, self.kind, &self.secret)
    }

    /// The public face of the descriptor: everything but the secret.
    pub fn summary(&self) -> DataSourceSummary {
        DataSourceSummary {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    /// Replace the secret, bumping `updated_at`.
    pub fn rotate_secret(&mut self, secret: ConnectionSecret) -> Result<()> {
        validate_fields(&self.name, self.kind, &secret)?;
        self.secret = secret;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// What responses say about a data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSummary {
    pub id: i64,
    pub name: String,
    pub kind: DataSourceKind,
}

/// Validate the parts of a descriptor before one exists.
pub fn validate_fields(name: &str, kind: DataSourceKind, secret: &ConnectionSecret) -> Result<()> {
    if name.trim().is_empty() {
        return Err(QuarryError::Configuration(
            "data source name must not be empty".into(),
        ));
    }
    if secret.is_empty() {
        return Err(QuarryError::Configuration(
            "connection string must not be empty".into(),
        ));
    }
    if !kind.is_relational() {
        return Ok(());
    }

    let url = secret.as_url().ok_or_else(|| {
        QuarryError::Configuration(format!(
            "connection string for a {} data source must be a URL",
            kind
        ))
    })?;
    if !kind.url_schemes().contains(&url.scheme()) {
        return Err(QuarryError::Configuration(format!(
            "connection string scheme '{}' does not match datasource type {}",
            url.scheme(),
            kind
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(QuarryError::Configuration(
            "connection string has no host".into(),
        ));
    }
    Ok(())
}
