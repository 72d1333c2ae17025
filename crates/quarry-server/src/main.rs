use anyhow::Context;
use clap::Parser;
use quarry_connector::DataSourceConnector;
use quarry_server::{
    AppState,
    config::{Cli, ServerConfig},
    logging::{self, LoggingConfig},
    router,
};
use quarry_store::SqliteDirectory;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?.with_cli(&cli);

    let _log_guard = logging::init(LoggingConfig::from_settings(&config.logging))?;

    let directory = SqliteDirectory::open(&config.database)
        .with_context(|| format!("Failed to open directory database {:?}", config.database))?;
    let connector =
        DataSourceConnector::with_drivers(Arc::new(directory.clone()), &config.connector);
    let app = router(AppState::new(directory, connector));

    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        connect_timeout_secs = config.connector.connect_timeout_secs,
        query_timeout_secs = config.connector.query_timeout_secs,
        "quarry listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("quarry stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
