//! Docker containers for the integration suite.
//!
//! Each test starts its own container; it is removed when the returned
//! [`Backend`] is dropped.

use anyhow::Context;
use quarry_core::DataSourceKind;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::{mysql::Mysql, postgres::Postgres};

/// Backends the suite runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestBackend {
    Postgres,
    Mysql,
}

impl TestBackend {
    pub fn kind(&self) -> DataSourceKind {
        match self {
            TestBackend::Postgres => DataSourceKind::Postgres,
            TestBackend::Mysql => DataSourceKind::MySql,
        }
    }

    /// Catalog type labels of the `accounts` fixture, in column order
    pub fn account_types(&self) -> [&'static str; 3] {
        match self {
            TestBackend::Postgres => ["integer", "text", "boolean"],
            TestBackend::Mysql => ["int", "text", "tinyint(1)"],
        }
    }
}

enum Container {
    Postgres(ContainerAsync<Postgres>),
    Mysql(ContainerAsync<Mysql>),
}

/// A running container and the connection string that reaches it
pub struct Backend {
    _container: Container,
    pub backend: TestBackend,
    pub host: String,
    pub port: u16,
    pub connection_string: String,
}

impl Backend {
    /// The connection string with the password swapped for `password`
    pub fn with_password(&self, password: &str) -> String {
        match self.backend {
            TestBackend::Postgres => format!(
                "postgresql://postgres:{}@{}:{}/postgres?sslmode=disable",
                password, self.host, self.port
            ),
            TestBackend::Mysql => format!(
                "mysql://root:{}@{}:{}/test?ssl-mode=disabled",
                password, self.host, self.port
            ),
        }
    }
}

/// Start a fresh container for `backend`
pub async fn start(backend: TestBackend) -> anyhow::Result<Backend> {
    tracing::info!(?backend, "starting test container");

    let (container, host, port) = match backend {
        TestBackend::Postgres => {
            let container = Postgres::default()
                .start()
                .await
                .context("failed to start PostgreSQL container")?;
            let host = container.get_host().await?.to_string();
            let port = container.get_host_port_ipv4(5432).await?;
            (Container::Postgres(container), host, port)
        }
        TestBackend::Mysql => {
            let container = Mysql::default()
                .start()
                .await
                .context("failed to start MySQL container")?;
            let host = container.get_host().await?.to_string();
            let port = container.get_host_port_ipv4(3306).await?;
            (Container::Mysql(container), host, port)
        }
    };

    let connection_string = match backend {
        TestBackend::Postgres => format!(
            "postgresql://postgres:postgres@{}:{}/postgres?sslmode=disable",
            host, port
        ),
        TestBackend::Mysql => format!("mysql://root@{}:{}/test?ssl-mode=disabled", host, port),
    };

    Ok(Backend {
        _container: container,
        backend,
        host,
        port,
        connection_string,
    })
}
