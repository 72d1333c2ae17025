//! MySQL connection implementation

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Timelike};
use mysql_async::{Conn, Opts, OptsBuilder, Params, Row as MySqlRow, consts::ColumnType, prelude::*};
use quarry_core::{
    ColumnMeta, Connection, ConnectionConfig, QuarryError, QueryResult, Result, Row,
    SchemaIntrospection, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::tls::build_ssl_opts;

/// Server error codes that mean the credentials were refused
const ACCESS_DENIED_CODES: &[u16] = &[
    1044, // ER_DBACCESS_DENIED_ERROR
    1045, // ER_ACCESS_DENIED_ERROR
    1698, // ER_ACCESS_DENIED_NO_PASSWORD_ERROR
];

/// Map a connect-time failure onto the error variant the gateway categorizes.
pub(crate) fn classify_connect_error(error: &mysql_async::Error) -> QuarryError {
    match error {
        mysql_async::Error::Server(server) if ACCESS_DENIED_CODES.contains(&server.code) => {
            QuarryError::Authentication(server.message.clone())
        }
        mysql_async::Error::Server(server) => {
            QuarryError::Connection(format!("{} (code: {})", server.message, server.code))
        }
        mysql_async::Error::Url(e) => QuarryError::Configuration(e.to_string()),
        other => QuarryError::Connection(other.to_string()),
    }
}

fn query_error(error: mysql_async::Error) -> QuarryError {
    match error {
        mysql_async::Error::Server(server) => QuarryError::Query(format!(
            "Failed to execute query: {} (code: {})",
            server.message, server.code
        )),
        mysql_async::Error::Io(e) => QuarryError::Connection(e.to_string()),
        other => QuarryError::Query(format!("Failed to execute query: {}", other)),
    }
}

/// MySQL connection wrapper
///
/// Holds exactly one server session; there is no pool behind it.
pub struct MySqlConnection {
    conn: Mutex<Option<Conn>>,
    /// Resolved at connect time so introspection has a concrete schema even
    /// when the URL named no database
    database_name: Option<String>,
    closed: AtomicBool,
}

impl MySqlConnection {
    /// Connect to a MySQL database
    #[tracing::instrument(skip(config), fields(host = %config.host, port = config.port, database = config.database.as_deref()))]
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut opts_builder = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .db_name(config.database.clone())
            .user(config.username.clone())
            .pass(config.password.as_ref().map(|p| p.expose().to_string()))
            .prefer_socket(false);

        if let Some(ssl_opts) = build_ssl_opts(config.tls_mode) {
            opts_builder = opts_builder.ssl_opts(Some(ssl_opts));
        }

        let opts: Opts = opts_builder.into();
        let mut conn = Conn::new(opts)
            .await
            .map_err(|e| classify_connect_error(&e))?;

        let database_name = match &config.database {
            Some(db) => Some(db.clone()),
            None => {
                let row: Option<(Option<String>,)> = conn
                    .query_first("SELECT DATABASE()")
                    .await
                    .map_err(query_error)?;
                row.and_then(|(db,)| db)
            }
        };

        tracing::debug!(database = ?database_name, "MySQL connection established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            database_name,
            closed: AtomicBool::new(false),
        })
    }

    /// The database this session is using, if any.
    ///
    /// In MySQL "schema" and "database" are synonyms.
    pub fn default_database(&self) -> Option<&str> {
        self.database_name.as_deref()
    }
}

fn to_params(values: &[Value]) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.iter().map(value_to_mysql).collect())
    }
}

fn mysql_date(date: NaiveDate, hour: u32, min: u32, sec: u32, micro: u32) -> mysql_async::Value {
    mysql_async::Value::Date(
        date.year() as u16,
        date.month() as u8,
        date.day() as u8,
        hour as u8,
        min as u8,
        sec as u8,
        micro,
    )
}

fn value_to_mysql(value: &Value) -> mysql_async::Value {
    use mysql_async::Value as My;

    match value {
        Value::Null => My::NULL,
        Value::Bool(v) => My::Int(*v as i64),
        Value::Int8(v) => My::Int(*v as i64),
        Value::Int16(v) => My::Int(*v as i64),
        Value::Int32(v) => My::Int(*v as i64),
        Value::Int64(v) => My::Int(*v),
        Value::Float32(v) => My::Float(*v),
        Value::Float64(v) => My::Double(*v),
        Value::Decimal(v) | Value::String(v) => My::Bytes(v.as_bytes().to_vec()),
        Value::Bytes(v) => My::Bytes(v.clone()),
        Value::Uuid(v) => My::Bytes(v.to_string().into_bytes()),
        Value::Json(v) => My::Bytes(v.to_string().into_bytes()),
        Value::Date(v) => mysql_date(*v, 0, 0, 0, 0),
        Value::Time(v) => My::Time(
            false,
            0,
            v.hour() as u8,
            v.minute() as u8,
            v.second() as u8,
            v.nanosecond() / 1_000,
        ),
        Value::DateTime(v) => mysql_date(
            v.date(),
            v.hour(),
            v.minute(),
            v.second(),
            v.nanosecond() / 1_000,
        ),
        Value::DateTimeUtc(v) => {
            let naive = v.naive_utc();
            mysql_date(
                naive.date(),
                naive.hour(),
                naive.minute(),
                naive.second(),
                naive.nanosecond() / 1_000,
            )
        }
        Value::Array(items) => {
            let json: Vec<serde_json::Value> = items.iter().map(Value::to_json_scalar).collect();
            My::Bytes(serde_json::Value::Array(json).to_string().into_bytes())
        }
    }
}

/// Convert a mysql_async value to our Value, using the column type to pick
/// the right interpretation of byte strings.
pub(crate) fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        // BIT(n) arrives as n bits packed big-endian, at most eight bytes
        mysql_async::Value::Bytes(bytes) if col_type == ColumnType::MYSQL_TYPE_BIT => {
            if bytes.len() > 8 {
                return Value::Bytes(bytes);
            }
            let bits = bytes
                .iter()
                .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
            if bits <= i64::MAX as u64 {
                Value::Int64(bits as i64)
            } else {
                Value::Decimal(bits.to_string())
            }
        }
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => {
                    s.parse::<i64>().map(Value::Int64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_FLOAT => {
                    s.parse::<f32>().map(Value::Float32).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DOUBLE => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                // Exact text; a float would lose digits
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    Value::Decimal(s)
                }
                ColumnType::MYSQL_TYPE_JSON => serde_json::from_str(&s)
                    .map(Value::Json)
                    .unwrap_or(Value::String(s)),
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => {
            if u <= i64::MAX as u64 {
                Value::Int64(u as i64)
            } else {
                Value::Decimal(u.to_string())
            }
        }
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
            match (col_type, date) {
                (ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE, Some(date)) => {
                    Value::Date(date)
                }
                (_, Some(date)) => date
                    .and_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)
                    .map(Value::DateTime)
                    .unwrap_or_else(|| Value::Date(date)),
                // Zero dates such as 0000-00-00 have no chrono form
                (_, None) => Value::String(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, min, sec
                )),
            }
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            if !negative && days == 0 {
                if let Some(time) = chrono::NaiveTime::from_hms_micro_opt(
                    hours as u32,
                    mins as u32,
                    secs as u32,
                    micros,
                ) {
                    return Value::Time(time);
                }
            }
            // TIME spans +-838 hours, beyond a time of day
            let total_hours = days * 24 + hours as u32;
            let sign = if negative { "-" } else { "" };
            Value::String(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, mins, secs, micros
            ))
        }
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();

        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| QuarryError::Connection("connection is closed".into()))?;

        let result = conn
            .exec_iter(sql, to_params(params))
            .await
            .map_err(query_error)?;

        // Read metadata before the rows so empty results still have columns
        let mysql_columns = result.columns_ref().to_vec();
        let mysql_rows: Vec<MySqlRow> = result.collect_and_drop().await.map_err(query_error)?;

        let columns: Vec<ColumnMeta> = mysql_columns
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                ColumnMeta::new(col.name_str(), format!("{:?}", col.column_type()), idx)
            })
            .collect();
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let rows: Vec<Row> = mysql_rows
            .into_iter()
            .map(|mut mysql_row| {
                let values = mysql_columns
                    .iter()
                    .enumerate()
                    .map(|(idx, col)| {
                        let raw = mysql_row
                            .take::<mysql_async::Value, _>(idx)
                            .unwrap_or(mysql_async::Value::NULL);
                        mysql_value_to_value(raw, col.column_type())
                    })
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
        escape_identifier_mysql(identifier)
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.lock().await.take();
        self.closed.store(true, Ordering::SeqCst);
        if let Some(conn) = conn {
            tracing::debug!("closing MySQL connection");
            conn.disconnect().await.map_err(|e| {
                QuarryError::Connection(format!("Failed to close MySQL connection: {}", e))
            })?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

/// Escape a MySQL identifier
fn escape_identifier_mysql(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}
