//! MySQL/MariaDB driver implementation

mod connection;
mod driver;
mod schema;
mod tls;

pub use connection::MySqlConnection;
pub use driver::MySqlDriver;
pub use tls::build_ssl_opts;
