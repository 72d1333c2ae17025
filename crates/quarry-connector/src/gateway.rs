//! Opening short-lived connections to tenant backends

use async_trait::async_trait;
use quarry_core::{
    Connection, ConnectionSecret, ConnectorSettings, DataSourceDescriptor, QuarryError,
};
use quarry_drivers::DriverRegistry;
use std::sync::Arc;
use std::time::Duration;

use crate::{ConnectCategory, ConnectError};

/// Opens one connection per request for a data source
#[async_trait]
pub trait ConnectionGateway: Send + Sync {
    async fn open(&self, descriptor: &DataSourceDescriptor)
    -> Result<ScopedConnection, ConnectError>;
}

/// Gateway backed by the registered backend drivers
pub struct DriverGateway {
    registry: DriverRegistry,
    connect_timeout: Duration,
}

impl DriverGateway {
    pub fn new(registry: DriverRegistry, settings: &ConnectorSettings) -> Self {
        Self {
            registry,
            connect_timeout: settings.connect_timeout(),
        }
    }

    /// Gateway over the PostgreSQL and MySQL drivers
    pub fn with_defaults(settings: &ConnectorSettings) -> Self {
        Self::new(DriverRegistry::with_defaults(), settings)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

/// Map a driver error onto a connect category, scrubbing the secret from
/// its text.
pub(crate) fn categorize(error: &QuarryError, secret: &ConnectionSecret) -> ConnectError {
    let category = match error {
        QuarryError::Authentication(_) => ConnectCategory::AuthRejected,
        QuarryError::Timeout(_) => ConnectCategory::Timeout,
        QuarryError::Configuration(_) => ConnectCategory::MalformedDescriptor,
        _ => ConnectCategory::NetworkUnreachable,
    };
    ConnectError::new(category, secret.redact(&error.to_string()))
}

#[async_trait]
impl ConnectionGateway for DriverGateway {
    #[tracing::instrument(
        skip(self, descriptor),
        fields(datasource_id = descriptor.id, kind = %descriptor.kind)
    )]
    async fn open(
        &self,
        descriptor: &DataSourceDescriptor,
    ) -> Result<ScopedConnection, ConnectError> {
        let driver = self.registry.for_kind(descriptor.kind).ok_or_else(|| {
            ConnectError::malformed(format!("no driver for datasource type {}", descriptor.kind))
        })?;

        let mut config = driver
            .parse_connection_string(descriptor.secret.expose())
            .map_err(|e| categorize(&e, &descriptor.secret))?;
        config.cap_connect_timeout(self.connect_timeout);

        let start = std::time::Instant::now();
        let conn = match tokio::time::timeout(self.connect_timeout, driver.connect(&config)).await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                let err = categorize(&e, &descriptor.secret);
                tracing::debug!(category = %err.category, error = %err, "connect failed");
                return Err(err);
            }
            Err(_) => {
                tracing::debug!(
                    timeout_secs = self.connect_timeout.as_secs(),
                    "connect timed out"
                );
                return Err(ConnectError::new(
                    ConnectCategory::Timeout,
                    format!(
                        "connection timed out after {}s",
                        self.connect_timeout.as_secs()
                    ),
                ));
            }
        };

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "connection opened"
        );
        Ok(ScopedConnection::new(conn, descriptor.secret.clone()))
    }
}

/// A connection that is closed when the request is done with it.
///
/// Call [`release`](Self::release) on the normal path. If the guard is
/// dropped instead (early return, panic, a cancelled request future) the
/// close is spawned onto the current Tokio runtime.
pub struct ScopedConnection {
    conn: Arc<dyn Connection>,
    secret: ConnectionSecret,
    released: bool,
}

impl ScopedConnection {
    pub fn new(conn: Arc<dyn Connection>, secret: ConnectionSecret) -> Self {
        Self {
            conn,
            secret,
            released: false,
        }
    }

    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    /// Scrub this connection's secret out of `text`
    pub fn redact(&self, text: &str) -> String {
        self.secret.redact(text)
    }

    pub fn secret(&self) -> &ConnectionSecret {
        &self.secret
    }

    /// Close the connection now.
    ///
    /// Close failures are logged and swallowed; the request has its answer.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %self.redact(&e.to_string()), "error closing connection");
        }
    }
}

impl std::ops::Deref for ScopedConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref()
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        if self.released || self.conn.is_closed() {
            return;
        }
        let conn = Arc::clone(&self.conn);
        let secret = self.secret.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.close().await {
                        tracing::debug!(
                            error = %secret.redact(&e.to_string()),
                            "error closing dropped connection"
                        );
                    }
                });
            }
            Err(_) => {
                tracing::warn!("connection dropped outside a Tokio runtime; not closed");
            }
        }
    }
}
