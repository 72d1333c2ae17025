//! Quarry Drivers - Backend driver implementations
//!
//! This crate bundles the concrete drivers for the relational data source
//! kinds and the registry the connection gateway resolves them from.

#[cfg(feature = "mysql")]
pub use quarry_driver_mysql as mysql;
#[cfg(feature = "postgres")]
pub use quarry_driver_postgres as postgres;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from quarry-core
pub use quarry_core::{
    ColumnMeta, Connection, ConnectionConfig, DatabaseDriver, QuarryError, QueryResult, Result,
    Row, SchemaIntrospection, Value,
};
