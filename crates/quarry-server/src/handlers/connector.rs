//! Data source endpoints backed by the connector

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use quarry_connector::{ConnectorError, Exploration, HealthStatus, PreviewResult};
use quarry_core::ConnectionSecret;
use serde::{Deserialize, Serialize};

use crate::{
    ApiError, AppState,
    routes::{Caller, RoutePath},
};

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    status: &'static str,
    #[serde(flatten)]
    preview: PreviewResult,
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    status: &'static str,
    message: &'static str,
    latency_ms: u64,
    health: HealthStatus,
}

#[derive(Debug, Deserialize)]
pub struct RotateSecretRequest {
    #[serde(default)]
    connection_string: Option<String>,
}

/// Explore and preview answer 403 for a missing data source too, so ids of
/// other tenants cannot be probed.
fn forbid_missing(err: ConnectorError) -> ConnectorError {
    match err {
        ConnectorError::NotFound => ConnectorError::Unauthorized(
            quarry_connector::Unauthorized::not_a_member(),
        ),
        other => other,
    }
}

pub async fn explore(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath(id): RoutePath<i64>,
) -> Result<Json<Exploration>, ApiError> {
    let exploration = state
        .connector
        .explore(&caller, id)
        .await
        .map_err(forbid_missing)?;
    Ok(Json(exploration))
}

pub async fn preview(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath((id, table)): RoutePath<(i64, String)>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let preview = state
        .connector
        .preview(&caller, id, &table)
        .await
        .map_err(forbid_missing)?;
    Ok(Json(PreviewResponse {
        status: "success",
        preview,
    }))
}

pub async fn test_connection(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath(id): RoutePath<i64>,
) -> Result<Json<TestResponse>, ApiError> {
    let healthy = state.connector.test_connection(&caller, id).await?;
    Ok(Json(TestResponse {
        status: "success",
        message: "Connection successful!",
        latency_ms: healthy.latency.as_millis() as u64,
        health: healthy.status,
    }))
}

pub async fn rotate_secret(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath(id): RoutePath<i64>,
    Json(request): Json<RotateSecretRequest>,
) -> Result<StatusCode, ApiError> {
    let secret = request
        .connection_string
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("All fields are required"))?;

    state
        .connector
        .rotate_secret(&caller, id, ConnectionSecret::new(secret))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_data_source(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath(id): RoutePath<i64>,
) -> Result<StatusCode, ApiError> {
    state.connector.delete_data_source(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
