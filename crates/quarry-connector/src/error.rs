//! Error types for the connector

use quarry_core::{ConnectionSecret, DataSourceKind};
use serde::Serialize;
use thiserror::Error;

use crate::{Role, StoreError};

/// Why the gateway could not open a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectCategory {
    Timeout,
    AuthRejected,
    NetworkUnreachable,
    MalformedDescriptor,
}

impl ConnectCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectCategory::Timeout => "timeout",
            ConnectCategory::AuthRejected => "auth-rejected",
            ConnectCategory::NetworkUnreachable => "network-unreachable",
            ConnectCategory::MalformedDescriptor => "malformed-descriptor",
        }
    }
}

impl std::fmt::Display for ConnectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed connection attempt.
///
/// `message` has already been scrubbed of the connection secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConnectError {
    pub category: ConnectCategory,
    pub message: String,
}

impl ConnectError {
    pub fn new(category: ConnectCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ConnectCategory::MalformedDescriptor, message)
    }
}

/// Schema inspection failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrospectionError {
    #[error("schema introspection not supported")]
    NotSupported,

    #[error("schema introspection timed out")]
    Timeout,

    /// Driver text; see [`IntrospectionError::redact`]
    #[error("{0}")]
    Backend(String),
}

impl IntrospectionError {
    pub fn redact(self, secret: &ConnectionSecret) -> Self {
        match self {
            IntrospectionError::Backend(msg) => IntrospectionError::Backend(secret.redact(&msg)),
            other => other,
        }
    }
}

/// Table preview failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    /// The table is not in the data source's current table list
    #[error("Table '{0}' not found")]
    UnknownTable(String),

    #[error("preview query timed out")]
    Timeout,

    /// Driver text; see [`PreviewError::redact`]
    #[error("{0}")]
    Backend(String),
}

impl PreviewError {
    pub fn redact(self, secret: &ConnectionSecret) -> Self {
        match self {
            PreviewError::Backend(msg) => PreviewError::Backend(secret.redact(&msg)),
            other => other,
        }
    }
}

impl From<IntrospectionError> for PreviewError {
    fn from(err: IntrospectionError) -> Self {
        match err {
            IntrospectionError::Timeout => PreviewError::Timeout,
            other => PreviewError::Backend(other.to_string()),
        }
    }
}

/// A failed connectivity probe, carrying the redacted backend text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProbeError {
    pub message: String,
}

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ConnectError> for ProbeError {
    fn from(err: ConnectError) -> Self {
        Self::new(err.message)
    }
}

/// Why the gate refused a caller. Kept for audit logs only; callers all see
/// the same "Unauthorized".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    NotAMember,
    InsufficientRole { role: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unauthorized")]
pub struct Unauthorized {
    pub reason: UnauthorizedReason,
}

impl Unauthorized {
    pub fn not_a_member() -> Self {
        Self {
            reason: UnauthorizedReason::NotAMember,
        }
    }

    pub fn insufficient_role(role: Role) -> Self {
        Self {
            reason: UnauthorizedReason::InsufficientRole { role },
        }
    }

    pub fn is_member(&self) -> bool {
        !matches!(self.reason, UnauthorizedReason::NotAMember)
    }
}

/// Everything a connector operation can fail with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    #[error("Unauthorized")]
    Unauthorized(#[from] Unauthorized),

    #[error("Not found")]
    NotFound,

    #[error("Unsupported datasource type")]
    UnsupportedKind(DataSourceKind),

    /// Bad input from the caller, e.g. a malformed replacement secret
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Table '{0}' not found")]
    UnknownTable(String),

    #[error("{0}")]
    Introspection(String),

    #[error("{0}")]
    Preview(String),

    #[error("{0}")]
    Probe(String),

    /// The directory store failed; a fault of this service rather than the
    /// tenant's backend
    #[error("directory store error: {0}")]
    Store(String),
}

impl ConnectorError {
    /// True for the failures that are reported in-band (HTTP 200 with an
    /// error payload) rather than as a status code.
    pub fn is_in_band(&self) -> bool {
        matches!(
            self,
            ConnectorError::Connect(_)
                | ConnectorError::UnknownTable(_)
                | ConnectorError::Introspection(_)
                | ConnectorError::Preview(_)
                | ConnectorError::Probe(_)
        )
    }
}

impl From<StoreError> for ConnectorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ConnectorError::NotFound,
            StoreError::Invalid(msg) | StoreError::Conflict(msg) => ConnectorError::Invalid(msg),
            StoreError::Storage(msg) => ConnectorError::Store(msg),
        }
    }
}

impl From<PreviewError> for ConnectorError {
    fn from(err: PreviewError) -> Self {
        match err {
            PreviewError::UnknownTable(table) => ConnectorError::UnknownTable(table),
            other => ConnectorError::Preview(other.to_string()),
        }
    }
}

impl From<IntrospectionError> for ConnectorError {
    fn from(err: IntrospectionError) -> Self {
        ConnectorError::Introspection(err.to_string())
    }
}

impl From<ProbeError> for ConnectorError {
    fn from(err: ProbeError) -> Self {
        ConnectorError::Probe(err.message)
    }
}

pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;
