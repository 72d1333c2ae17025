//! The connector façade: one linear path per request

use quarry_core::{
    ConnectionSecret, ConnectorSettings, DataSourceDescriptor, DataSourceSummary, PreviewResult,
    SchemaSnapshot, TableDescriptor,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    AuthorizationGate, ConnectionGateway, ConnectorError, ConnectorResult, DirectoryStore,
    DriverGateway, HealthProber, Healthy, PreviewExecutor, SchemaInspector,
};

/// Result of exploring a data source.
///
/// Connection and introspection failures are reported in `error` with an
/// empty table list rather than failing the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exploration {
    pub datasource: DataSourceSummary,
    pub tables: Vec<TableDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Explore, preview, test and administer tenant data sources.
///
/// Every operation resolves the descriptor, checks the caller's membership,
/// rejects non-relational kinds, and only then touches the network. Nothing
/// is retried.
pub struct DataSourceConnector {
    directory: Arc<dyn DirectoryStore>,
    gateway: Arc<dyn ConnectionGateway>,
    gate: AuthorizationGate,
    inspector: SchemaInspector,
    previewer: PreviewExecutor,
    prober: HealthProber,
}

impl DataSourceConnector {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        gateway: Arc<dyn ConnectionGateway>,
        settings: &ConnectorSettings,
    ) -> Self {
        Self {
            gate: AuthorizationGate::new(Arc::clone(&directory)),
            inspector: SchemaInspector::new(settings),
            previewer: PreviewExecutor::new(settings),
            prober: HealthProber::new(Arc::clone(&gateway), settings),
            directory,
            gateway,
        }
    }

    /// Connector over the built-in PostgreSQL and MySQL drivers
    pub fn with_drivers(directory: Arc<dyn DirectoryStore>, settings: &ConnectorSettings) -> Self {
        let gateway = Arc::new(DriverGateway::with_defaults(settings));
        Self::new(directory, gateway, settings)
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    async fn resolve(&self, id: i64) -> ConnectorResult<DataSourceDescriptor> {
        self.directory
            .find_descriptor(id)
            .await?
            .ok_or(ConnectorError::NotFound)
    }

    /// List the tables and columns of a data source
    #[tracing::instrument(skip(self), fields(organization_id, kind))]
    pub async fn explore(&self, caller: &str, id: i64) -> ConnectorResult<Exploration> {
        let descriptor = self.resolve(id).await?;
        record_descriptor(&descriptor);
        self.gate.authorize(caller, descriptor.organization_id).await?;
        ensure_relational(&descriptor)?;

        let (tables, error) = match self.inspect(&descriptor).await {
            Ok(snapshot) => (snapshot.tables, None),
            Err(e) => {
                tracing::warn!(error = %e, "exploration failed");
                (Vec::new(), Some(e.to_string()))
            }
        };

        Ok(Exploration {
            datasource: descriptor.summary(),
            tables,
            error,
        })
    }

    async fn inspect(&self, descriptor: &DataSourceDescriptor) -> ConnectorResult<SchemaSnapshot> {
        let conn = self.gateway.open(descriptor).await?;
        let outcome = self
            .inspector
            .inspect(conn.connection())
            .await
            .map_err(|e| e.redact(conn.secret()));
        conn.release().await;
        Ok(outcome?)
    }

    /// Fetch the first rows of `table`
    #[tracing::instrument(skip(self), fields(organization_id, kind))]
    pub async fn preview(&self, caller: &str, id: i64, table: &str) -> ConnectorResult<PreviewResult> {
        let descriptor = self.resolve(id).await?;
        record_descriptor(&descriptor);
        self.gate.authorize(caller, descriptor.organization_id).await?;
        ensure_relational(&descriptor)?;

        let conn = self.gateway.open(&descriptor).await?;
        let outcome = self
            .previewer
            .preview(conn.connection(), table)
            .await
            .map_err(|e| e.redact(conn.secret()));
        conn.release().await;

        let preview = outcome.inspect_err(|e| tracing::info!(error = %e, "preview failed"))?;
        tracing::info!(row_count = preview.row_count(), "preview served");
        Ok(preview)
    }

    /// Check the data source is reachable and accepts its credentials.
    ///
    /// A caller who is not a member sees `NotFound`, the same as for a
    /// missing descriptor.
    #[tracing::instrument(skip(self), fields(organization_id, kind))]
    pub async fn test_connection(&self, caller: &str, id: i64) -> ConnectorResult<Healthy> {
        let descriptor = self.resolve(id).await?;
        record_descriptor(&descriptor);
        self.gate
            .authorize(caller, descriptor.organization_id)
            .await
            .map_err(hide_unauthorized)?;
        ensure_relational(&descriptor)?;

        let healthy = self.prober.probe(&descriptor).await?;
        tracing::info!(
            latency_ms = healthy.latency.as_millis() as u64,
            status = ?healthy.status,
            "connection test passed"
        );
        Ok(healthy)
    }

    /// Remove a data source. Admins only.
    ///
    /// Non-members get `NotFound`; viewers get `Unauthorized`. Deleting an id
    /// that no longer exists is `NotFound`.
    #[tracing::instrument(skip(self), fields(organization_id))]
    pub async fn delete_data_source(&self, caller: &str, id: i64) -> ConnectorResult<()> {
        let descriptor = self.resolve(id).await?;
        tracing::Span::current().record("organization_id", descriptor.organization_id);
        self.gate
            .require_admin(caller, descriptor.organization_id)
            .await
            .map_err(hide_non_member)?;

        if !self.directory.delete_data_source(id).await? {
            return Err(ConnectorError::NotFound);
        }
        tracing::info!(name = %descriptor.name, "data source deleted");
        Ok(())
    }

    /// Replace a data source's connection string. Admins only.
    #[tracing::instrument(skip(self, secret), fields(organization_id))]
    pub async fn rotate_secret(
        &self,
        caller: &str,
        id: i64,
        secret: ConnectionSecret,
    ) -> ConnectorResult<()> {
        let mut descriptor = self.resolve(id).await?;
        tracing::Span::current().record("organization_id", descriptor.organization_id);
        self.gate
            .require_admin(caller, descriptor.organization_id)
            .await?;

        // Validation messages never echo the secret
        descriptor
            .rotate_secret(secret)
            .map_err(|e| ConnectorError::Invalid(e.to_string()))?;
        if !self
            .directory
            .rotate_secret(id, descriptor.secret.clone())
            .await?
        {
            return Err(ConnectorError::NotFound);
        }
        tracing::info!(name = %descriptor.name, "connection secret rotated");
        Ok(())
    }
}

fn record_descriptor(descriptor: &DataSourceDescriptor) {
    let span = tracing::Span::current();
    span.record("organization_id", descriptor.organization_id);
    span.record("kind", descriptor.kind.as_str());
}

fn ensure_relational(descriptor: &DataSourceDescriptor) -> ConnectorResult<()> {
    if descriptor.kind.is_relational() {
        Ok(())
    } else {
        Err(ConnectorError::UnsupportedKind(descriptor.kind))
    }
}

fn hide_unauthorized(err: ConnectorError) -> ConnectorError {
    match err {
        ConnectorError::Unauthorized(_) => ConnectorError::NotFound,
        other => other,
    }
}

fn hide_non_member(err: ConnectorError) -> ConnectorError {
    match err {
        ConnectorError::Unauthorized(denied) if !denied.is_member() => ConnectorError::NotFound,
        other => other,
    }
}
