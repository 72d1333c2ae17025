//! Organization, membership and data source registration endpoints

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use quarry_connector::{DataSourceKind, DataSourceSummary, Role};
use quarry_core::ConnectionSecret;
use quarry_store::{InviteOutcome, Member, Organization, OrganizationMembership, User};
use serde::{Deserialize, Serialize};

use crate::{
    ApiError, AppState,
    routes::{Caller, RoutePath},
};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    organization_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    organization: Organization,
    user: User,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    organization: Organization,
    role: Role,
    data_sources: Vec<DataSourceSummary>,
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
pub struct AddDataSourceRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    connection_string: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

fn required(field: Option<String>) -> Result<String, ApiError> {
    field
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("All fields are required"))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let name = required(request.organization_name)?;
    let email = required(request.email)?;

    let (organization, user) = state
        .directory
        .call(move |store| store.create_organization(&name, &email))
        .await?;
    Ok((StatusCode::CREATED, Json(SignupResponse { organization, user })))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<OrganizationMembership>>, ApiError> {
    let memberships = state
        .directory
        .call(move |store| store.list_memberships(&caller))
        .await?;
    Ok(Json(memberships))
}

pub async fn organization(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath(id): RoutePath<i64>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let role = state.connector.gate().authorize(&caller, id).await?;

    let (organization, data_sources, members) = state
        .directory
        .call(move |store| {
            Ok((
                store.find_organization(id)?,
                store.list_data_sources(id)?,
                store.list_members(id)?,
            ))
        })
        .await?;
    let organization = organization.ok_or_else(ApiError::not_found)?;

    Ok(Json(OrganizationResponse {
        organization,
        role,
        data_sources,
        members,
    }))
}

pub async fn add_data_source(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath(id): RoutePath<i64>,
    Json(request): Json<AddDataSourceRequest>,
) -> Result<(StatusCode, Json<DataSourceSummary>), ApiError> {
    state.connector.gate().require_admin(&caller, id).await?;

    let name = required(request.name)?;
    let kind: DataSourceKind = required(request.kind)?
        .parse()
        .map_err(|_| ApiError::bad_request("Unsupported datasource type"))?;
    let secret = ConnectionSecret::new(required(request.connection_string)?);

    let descriptor = state
        .directory
        .call(move |store| store.add_data_source(id, &name, kind, secret))
        .await?;
    Ok((StatusCode::CREATED, Json(descriptor.summary())))
}

pub async fn invite_member(
    State(state): State<AppState>,
    Caller(caller): Caller,
    RoutePath(id): RoutePath<i64>,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    state.connector.gate().require_admin(&caller, id).await?;

    let email = request
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;
    let role: Role = match request.role {
        Some(role) => role.parse()?,
        None => Role::Viewer,
    };

    let outcome = state
        .directory
        .call(move |store| store.invite_member(id, &email, role))
        .await?;
    let status = match outcome {
        InviteOutcome::Added(_) => StatusCode::CREATED,
        InviteOutcome::AlreadyMember(_) => StatusCode::OK,
    };
    Ok((status, Json(outcome.member().clone())))
}
