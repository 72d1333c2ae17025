//! Router and shared state

use axum::{
    Router,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    routing::{get, post},
};
use quarry_connector::DataSourceConnector;
use quarry_store::SqliteDirectory;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{ApiError, handlers};

/// Header carrying the authenticated caller's e-mail
pub const CALLER_HEADER: &str = "x-quarry-user";

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<DataSourceConnector>,
    pub directory: SqliteDirectory,
}

impl AppState {
    pub fn new(directory: SqliteDirectory, connector: DataSourceConnector) -> Self {
        Self {
            connector: Arc::new(connector),
            directory,
        }
    }
}

/// The caller named by [`CALLER_HEADER`], lower-cased
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(quarry_store::normalize_email)
            .filter(|email| !email.is_empty())
            .map(Caller)
            .ok_or_else(ApiError::unauthenticated)
    }
}

/// Path parameters. A segment that does not parse, such as a non-numeric
/// id, answers 404 rather than axum's plain-text 400.
#[derive(Debug)]
pub struct RoutePath<T>(pub T);

impl<S, T> FromRequestParts<S> for RoutePath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(RoutePath(value)),
            Err(rejection) => {
                tracing::debug!(%rejection, "unmatched path parameters");
                Err(ApiError::not_found())
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/signup", post(handlers::directory::signup))
        .route("/dashboard", get(handlers::directory::dashboard))
        .route("/org/{id}", get(handlers::directory::organization))
        .route("/org/{id}/datasources", post(handlers::directory::add_data_source))
        .route("/org/{id}/members", post(handlers::directory::invite_member))
        .route("/datasource/{id}/explore", get(handlers::connector::explore))
        .route("/datasource/{id}/preview/{table}", get(handlers::connector::preview))
        .route("/datasource/{id}/test", get(handlers::connector::test_connection))
        .route("/datasource/{id}/secret", post(handlers::connector::rotate_secret))
        .route("/datasource/{id}/delete", post(handlers::connector::delete_data_source))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
