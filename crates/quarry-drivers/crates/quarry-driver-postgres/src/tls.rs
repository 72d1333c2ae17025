//! PostgreSQL TLS support
//!
//! Turns the `sslmode` carried in a data source's connection string into a
//! connector for tokio-postgres. Certificate files are not supported: a
//! tenant secret is a single URL, so verification relies on the system trust
//! store.

use native_tls::{TlsConnector as NativeTlsConnector, TlsConnectorBuilder};
use postgres_native_tls::MakeTlsConnector;
use quarry_core::{QuarryError, TlsMode};
use tokio_postgres::config::SslMode;
use tracing::debug;

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// `disable` never needs a connector
    #[error("TLS mode {mode} does not use a TLS connector")]
    UnsupportedMode { mode: TlsMode },

    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

impl From<TlsError> for QuarryError {
    fn from(error: TlsError) -> Self {
        QuarryError::Configuration(error.to_string())
    }
}

/// Build a TLS connector for `mode`.
///
/// `prefer` and `require` encrypt without verifying the peer, matching libpq.
pub fn build_tls_connector(mode: TlsMode) -> Result<MakeTlsConnector, TlsError> {
    if mode == TlsMode::Disable {
        return Err(TlsError::UnsupportedMode { mode });
    }

    debug!(mode = %mode, "building PostgreSQL TLS connector");

    let mut builder = NativeTlsConnector::builder();
    configure_verification(&mut builder, mode);

    let connector = builder
        .build()
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;

    Ok(MakeTlsConnector::new(connector))
}

fn configure_verification(builder: &mut TlsConnectorBuilder, mode: TlsMode) {
    match mode {
        TlsMode::Disable => {}
        TlsMode::Prefer | TlsMode::Require => {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        TlsMode::VerifyCa => {
            builder.danger_accept_invalid_hostnames(true);
        }
        TlsMode::VerifyFull => {}
    }
}

/// The tokio-postgres negotiation mode for `mode`
pub fn to_pg_ssl_mode(mode: TlsMode) -> SslMode {
    match mode {
        TlsMode::Disable => SslMode::Disable,
        TlsMode::Prefer => SslMode::Prefer,
        TlsMode::Require | TlsMode::VerifyCa | TlsMode::VerifyFull => SslMode::Require,
    }
}
