use super::*;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use quarry_core::{Connection, ConnectionConfig, QuarryError, Result};

struct StubDriver;

#[async_trait]
impl DatabaseDriver for StubDriver {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn connect(&self, _config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        Err(QuarryError::NotSupported("stub".into()))
    }

    fn parse_connection_string(&self, conn_str: &str) -> Result<ConnectionConfig> {
        ConnectionConfig::from_url("stub", conn_str, &["stub"], 1)
    }
}

#[test]
fn test_defaults_cover_relational_kinds() {
    let registry = DriverRegistry::with_defaults();

    assert_eq!(registry.list(), vec!["mysql", "postgresql"]);
    assert_eq!(
        registry.for_kind(DataSourceKind::Postgres).map(|d| d.name()),
        Some("postgresql")
    );
    assert_eq!(
        registry.for_kind(DataSourceKind::MySql).map(|d| d.name()),
        Some("mysql")
    );
}

#[test]
fn test_flat_file_has_no_driver() {
    let registry = DriverRegistry::with_defaults();
    assert!(registry.for_kind(DataSourceKind::FlatFile).is_none());
}

#[test]
fn test_register_and_lookup() {
    let mut registry = DriverRegistry::new();
    assert!(!registry.has("stub"));

    registry.register(Arc::new(StubDriver));
    assert!(registry.has("stub"));
    assert!(registry.get("stub").is_some());
    assert!(registry.get("oracle").is_none());
    assert!(registry.for_kind(DataSourceKind::Postgres).is_none());
}
