//! Error types for Quarry

use thiserror::Error;

/// Core error type for driver and catalog operations
#[derive(Error, Debug)]
pub enum QuarryError {
    /// The remote host could not be reached or dropped the connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote server rejected the supplied credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    Schema(String),

    /// The connection string or descriptor cannot be turned into a config
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl QuarryError {
    /// Rewrite the message carried by this error with `f`.
    ///
    /// Used to scrub secrets out of driver text without losing the variant.
    pub fn map_message(self, f: impl FnOnce(&str) -> String) -> Self {
        match self {
            QuarryError::Connection(m) => QuarryError::Connection(f(&m)),
            QuarryError::Authentication(m) => QuarryError::Authentication(f(&m)),
            QuarryError::Query(m) => QuarryError::Query(f(&m)),
            QuarryError::Schema(m) => QuarryError::Schema(f(&m)),
            QuarryError::Configuration(m) => QuarryError::Configuration(f(&m)),
            QuarryError::Serialization(e) => QuarryError::Other(f(&e.to_string())),
            QuarryError::NotSupported(m) => QuarryError::NotSupported(f(&m)),
            QuarryError::NotFound(m) => QuarryError::NotFound(f(&m)),
            QuarryError::Timeout(m) => QuarryError::Timeout(f(&m)),
            QuarryError::Other(m) => QuarryError::Other(f(&m)),
        }
    }
}

/// Result type alias for Quarry operations
pub type Result<T> = std::result::Result<T, QuarryError>;
