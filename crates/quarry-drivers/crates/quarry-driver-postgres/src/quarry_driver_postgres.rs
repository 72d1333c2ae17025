//! PostgreSQL driver implementation

mod connection;
mod decode;
mod driver;
mod schema;
mod tls;

pub use connection::PostgresConnection;
pub use driver::PostgresDriver;
pub use tls::{TlsError, build_tls_connector, to_pg_ssl_mode};
