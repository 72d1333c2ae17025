//! What the connector needs from the directory of organizations, members
//! and data sources

use async_trait::async_trait;
use quarry_core::{ConnectionSecret, DataSourceDescriptor};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A member's role within one organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "viewer" => Ok(Role::Viewer),
            other => Err(StoreError::Invalid(format!("invalid role '{}'", other))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by a directory store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (duplicate organization, e-mail or
    /// data source name)
    #[error("{0}")]
    Conflict(String),

    /// The request was rejected before touching storage
    #[error("{0}")]
    Invalid(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The backing database failed
    #[error("storage error: {0}")]
    Storage(String),
}

/// Directory lookups the connector performs on every request.
///
/// Implementations must answer from the live store; the connector relies on
/// revoked memberships and deleted descriptors disappearing immediately.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_descriptor(&self, id: i64) -> Result<Option<DataSourceDescriptor>, StoreError>;

    /// The caller's role in `organization_id`, if they are a member.
    ///
    /// `caller` is the member's e-mail address.
    async fn find_membership(
        &self,
        caller: &str,
        organization_id: i64,
    ) -> Result<Option<Role>, StoreError>;

    /// Returns false when no descriptor had that id.
    async fn delete_data_source(&self, id: i64) -> Result<bool, StoreError>;

    /// Returns false when no descriptor had that id.
    async fn rotate_secret(&self, id: i64, secret: ConnectionSecret) -> Result<bool, StoreError>;
}
