//! PostgreSQL connection implementation

use async_trait::async_trait;
use bytes::BytesMut;
use quarry_core::{
    ColumnMeta, Connection, ConnectionConfig, QuarryError, QueryResult, Result, Row,
    SchemaIntrospection, TlsMode, Value,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_postgres::{
    Client, NoTls, Row as PgRow,
    error::SqlState,
    types::{ToSql, Type},
};

use crate::decode::{RawCell, decode_cell};
use crate::tls::{build_tls_connector, to_pg_ssl_mode};

fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {})", detail));
        }
    }

    if let Some(hint) = db_error.hint() {
        if !hint.trim().is_empty() {
            message.push_str(&format!(" (hint: {})", hint));
        }
    }

    format!("{} (code: {})", message, code.code())
}

/// Map a connect-time failure onto the error variant the gateway categorizes.
pub(crate) fn classify_connect_error(error: &tokio_postgres::Error) -> QuarryError {
    if let Some(db_error) = error.as_db_error() {
        let message = format_postgres_error(error);
        let code = db_error.code();
        if code == &SqlState::INVALID_PASSWORD
            || code == &SqlState::INVALID_AUTHORIZATION_SPECIFICATION
        {
            return QuarryError::Authentication(message);
        }
        return QuarryError::Connection(message);
    }

    let message = error.to_string();
    if message.contains("timeout") {
        QuarryError::Timeout(message)
    } else if message.contains("password missing") {
        QuarryError::Authentication(message)
    } else {
        QuarryError::Connection(message)
    }
}

fn query_error(action: &str, error: &tokio_postgres::Error) -> QuarryError {
    let message = format!("Failed to {}: {}", action, format_postgres_error(error));
    if error.is_closed() {
        QuarryError::Connection(message)
    } else {
        QuarryError::Query(message)
    }
}

fn spawn_connection<F>(connection: F, closed: Arc<AtomicBool>)
where
    F: Future<Output = std::result::Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!(error = %e, "PostgreSQL connection ended with error");
        }
        closed.store(true, Ordering::SeqCst);
    });
}

/// PostgreSQL connection wrapper
///
/// The client is dropped on `close()`, which ends the background connection
/// task and sends Terminate to the server.
pub struct PostgresConnection {
    client: Mutex<Option<Client>>,
    closed: Arc<AtomicBool>,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database
    #[tracing::instrument(skip(config), fields(host = %config.host, port = config.port, database = config.database.as_deref(), ssl_mode = %config.tls_mode))]
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .application_name("quarry")
            .ssl_mode(to_pg_ssl_mode(config.tls_mode));

        if let Some(database) = &config.database {
            pg_config.dbname(database);
        }
        if let Some(user) = &config.username {
            pg_config.user(user);
        }
        if let Some(password) = &config.password {
            pg_config.password(password.expose());
        }
        if let Some(timeout) = config.connect_timeout {
            pg_config.connect_timeout(timeout);
        }
        if let Some(options) = config.params.get("options") {
            pg_config.options(options);
        }

        let closed = Arc::new(AtomicBool::new(false));
        let client = if config.tls_mode == TlsMode::Disable {
            let (client, connection) = pg_config
                .connect(NoTls)
                .await
                .map_err(|e| classify_connect_error(&e))?;
            spawn_connection(connection, Arc::clone(&closed));
            client
        } else {
            let tls = build_tls_connector(config.tls_mode)?;
            let (client, connection) = pg_config
                .connect(tls)
                .await
                .map_err(|e| classify_connect_error(&e))?;
            spawn_connection(connection, Arc::clone(&closed));
            client
        };

        tracing::debug!("PostgreSQL connection established");
        Ok(Self {
            client: Mutex::new(Some(client)),
            closed,
        })
    }
}

/// Wrapper enum for converting quarry_core::Value to types implementing ToSql.
#[derive(Debug)]
enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    DateTimeUtc(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
}

impl PgValue {
    /// Convert a Value into the PgValue whose binary width matches the
    /// parameter type the statement was prepared with.
    fn for_type(value: &Value, target_type: Option<&Type>) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int8(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int16(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int32(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int64(v) => Self::coerce_int(*v, target_type),
            Value::Float32(v) => match target_type {
                Some(&Type::FLOAT8) => PgValue::Float64(*v as f64),
                _ => PgValue::Float32(*v),
            },
            Value::Float64(v) => match target_type {
                Some(&Type::FLOAT4) => PgValue::Float32(*v as f32),
                _ => PgValue::Float64(*v),
            },
            Value::Decimal(v) | Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::DateTimeUtc(v) => PgValue::DateTimeUtc(*v),
            Value::Date(v) => PgValue::Date(*v),
            Value::Time(v) => PgValue::Time(*v),
            Value::DateTime(v) => PgValue::DateTime(*v),
            Value::Array(_) => PgValue::String(value.to_string()),
        }
    }

    fn coerce_int(value: i64, target_type: Option<&Type>) -> Self {
        match target_type {
            Some(&Type::INT2) => PgValue::Int16(value as i16),
            Some(&Type::INT4) => PgValue::Int32(value as i32),
            _ => PgValue::Int64(value),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Time(v) => v.to_sql(ty, out),
            PgValue::DateTime(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();

        let guard = self.client.lock().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| QuarryError::Connection("connection is closed".into()))?;

        // Prepare first so we know the target types for each parameter
        let statement = client
            .prepare(sql)
            .await
            .map_err(|e| query_error("prepare query", &e))?;

        let param_types = statement.params();
        let pg_params: Vec<PgValue> = params
            .iter()
            .enumerate()
            .map(|(i, value)| PgValue::for_type(value, param_types.get(i)))
            .collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let pg_rows = client
            .query(&statement, &param_refs)
            .await
            .map_err(|e| query_error("execute query", &e))?;

        // Column metadata comes from the statement so empty results still have columns
        let columns: Vec<ColumnMeta> = statement
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| ColumnMeta::new(col.name(), col.type_().name(), idx))
            .collect();
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let rows: Vec<Row> = pg_rows
            .iter()
            .map(|pg_row| {
                let values = (0..columns.len())
                    .map(|idx| postgres_to_value(pg_row, idx))
                    .collect();
                Row::new(column_names.clone(), values)
            })
            .collect();

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );

        Ok(QueryResult {
            id: uuid::Uuid::new_v4(),
            columns,
            rows,
            execution_time_ms,
        })
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        escape_identifier_pg(identifier)
    }

    async fn close(&self) -> Result<()> {
        let client = self.client.lock().await.take();
        self.closed.store(true, Ordering::SeqCst);
        if client.is_some() {
            tracing::debug!("closing PostgreSQL connection");
        }
        drop(client);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

fn postgres_to_value(row: &PgRow, idx: usize) -> Value {
    let ty = row.columns()[idx].type_();
    match row.try_get::<_, RawCell>(idx) {
        Ok(RawCell(raw)) => decode_cell(ty, raw),
        // RawCell accepts every type, so only a bad index lands here
        Err(e) => {
            tracing::warn!(column = idx, error = %e, "failed to read result cell");
            Value::Null
        }
    }
}

/// Escape a PostgreSQL identifier
fn escape_identifier_pg(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
