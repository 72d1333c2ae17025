//! Quarry Connector - the data source connector
//!
//! Every request runs the same linear path: resolve the descriptor, ask the
//! [`AuthorizationGate`], open one short-lived connection through the
//! [`ConnectionGateway`], hand it to the [`SchemaInspector`],
//! [`PreviewExecutor`] or [`HealthProber`], release it, respond.
//!
//! [`DataSourceConnector`] wires those steps together. Nothing is pooled or
//! cached between requests.

mod directory;
mod error;
mod gate;
mod gateway;
pub mod health;
mod inspector;
mod preview;
mod service;

pub use directory::{DirectoryStore, Role, StoreError};
pub use error::*;
pub use gate::AuthorizationGate;
pub use gateway::{ConnectionGateway, DriverGateway, ScopedConnection};
pub use health::{HealthProber, HealthStatus, HealthThresholds, Healthy};
pub use inspector::SchemaInspector;
pub use preview::PreviewExecutor;
pub use service::{DataSourceConnector, Exploration};

pub use quarry_core::{
    ConnectorSettings, DataSourceDescriptor, DataSourceKind, DataSourceSummary, PreviewResult,
    SchemaSnapshot,
};
