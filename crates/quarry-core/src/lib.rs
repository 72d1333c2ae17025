//! Quarry Core - Core abstractions shared by the connector and its drivers
//!
//! This crate provides the fundamental traits and types that all other
//! Quarry crates depend on. It defines:
//!
//! - `DatabaseDriver` - Trait for backend driver implementations
//! - `Connection` - Trait for short-lived backend connections
//! - `SchemaIntrospection` - Trait for catalog inspection
//! - `DataSourceDescriptor` - The stored description of a tenant data source
//! - `ConnectionSecret` - A connection string that redacts itself
//! - Common types like `Value`, `Row`, `QueryResult`, `SchemaSnapshot`

mod connection;
mod descriptor;
mod driver;
mod error;
mod schema;
mod secret;
mod settings;
mod snapshot;
mod tls;
mod types;

pub use connection::*;
pub use descriptor::*;
pub use driver::*;
pub use error::*;
pub use schema::*;
pub use secret::*;
pub use settings::*;
pub use snapshot::*;
pub use tls::*;
pub use types::*;
