use super::*;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use quarry_core::{QueryResult, Value};

struct Dialect {
    backticks: bool,
}

#[async_trait]
impl Connection for Dialect {
    fn driver_name(&self) -> &str {
        if self.backticks { "mysql" } else { "postgresql" }
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> quarry_core::Result<QueryResult> {
        Ok(QueryResult::empty())
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        if self.backticks {
            format!("`{}`", identifier.replace('`', "``"))
        } else {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }

    async fn close(&self) -> quarry_core::Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[test]
fn test_preview_sql_quotes_per_dialect() {
    assert_eq!(
        preview_sql(&Dialect { backticks: false }, "Order Items", 10),
        "SELECT * FROM \"Order Items\" LIMIT 10"
    );
    assert_eq!(
        preview_sql(&Dialect { backticks: true }, "order`items", 10),
        "SELECT * FROM `order``items` LIMIT 10"
    );
}

#[test]
fn test_row_limit_never_exceeds_ten() {
    let settings = ConnectorSettings {
        preview_row_limit: 1_000,
        ..Default::default()
    };
    assert_eq!(PreviewExecutor::new(&settings).row_limit(), 10);
}

#[tokio::test]
async fn test_connection_without_introspection_cannot_preview() {
    let executor = PreviewExecutor::new(&ConnectorSettings::default());
    let err = executor
        .preview(&Dialect { backticks: false }, "users")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PreviewError::Backend("schema introspection not supported".into())
    );
}
