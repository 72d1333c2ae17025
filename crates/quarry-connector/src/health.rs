//! Connectivity checks for data sources
//!
//! A probe opens a connection through the gateway, times one ping query and
//! releases the connection again. Success means the backend is reachable and
//! accepted the credentials; the latency is classified into a
//! [`HealthStatus`] on top of that.

mod ping;
mod status;

#[cfg(test)]
mod tests;

pub use ping::ping;
pub use status::{HealthStatus, HealthThresholds};

use quarry_core::{ConnectorSettings, DataSourceDescriptor};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::{ConnectionGateway, ProbeError};

/// A successful probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Healthy {
    /// Round trip of the ping query
    #[serde(rename = "latency_ms", serialize_with = "as_millis")]
    pub latency: Duration,
    pub status: HealthStatus,
}

fn as_millis<S: serde::Serializer>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(latency.as_millis() as u64)
}

/// Probes data sources through a gateway
pub struct HealthProber {
    gateway: Arc<dyn ConnectionGateway>,
    query_timeout: Duration,
    thresholds: HealthThresholds,
}

impl HealthProber {
    pub fn new(gateway: Arc<dyn ConnectionGateway>, settings: &ConnectorSettings) -> Self {
        Self {
            gateway,
            query_timeout: settings.query_timeout(),
            thresholds: HealthThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Open, ping, release.
    ///
    /// Bounded by the gateway's connect timeout plus `query_timeout`. Every
    /// failure becomes a [`ProbeError`] with the secret scrubbed out.
    #[tracing::instrument(skip(self, descriptor), fields(datasource_id = descriptor.id, kind = %descriptor.kind))]
    pub async fn probe(&self, descriptor: &DataSourceDescriptor) -> Result<Healthy, ProbeError> {
        let conn = self.gateway.open(descriptor).await?;

        let outcome = tokio::time::timeout(self.query_timeout, ping(conn.connection())).await;
        let latency = match outcome {
            Ok(Ok(latency)) => latency,
            Ok(Err(e)) => {
                let message = conn.redact(&e.to_string());
                conn.release().await;
                return Err(ProbeError::new(message));
            }
            Err(_) => {
                conn.release().await;
                return Err(ProbeError::new(format!(
                    "ping timed out after {}s",
                    self.query_timeout.as_secs()
                )));
            }
        };
        conn.release().await;

        let status = HealthStatus::from_latency_with_thresholds(latency, &self.thresholds);
        tracing::debug!(latency_ms = latency.as_millis() as u64, ?status, "probe succeeded");
        Ok(Healthy { latency, status })
    }
}
