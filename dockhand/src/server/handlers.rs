//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::models::deployment::DeploymentConfig;
use crate::models::job::JobId;
use crate::models::profile::ProfileId;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "dockhand".to_string(),
        version: version.version,
    })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

/// Submit a deployment. Answers as soon as the job exists.
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<DeploymentConfig>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let config = body(payload)?;
    let submission = state.jobs.submit(config).await?;
    Ok((StatusCode::ACCEPTED, Json(submission)))
}

pub async fn recent_jobs_handler(State(state): State<Arc<ServerState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.jobs.recent_jobs().await?))
}

pub async fn job_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<JobId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.jobs.get_job(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsQuery {
    #[serde(default)]
    pub image_key: String,
}

pub async fn image_tags_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<TagsQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.jobs.image_tags(&query.image_key).await?))
}

pub async fn list_profiles_handler(State(state): State<Arc<ServerState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.profiles.list().await?))
}

#[derive(Deserialize)]
pub struct SaveProfileRequest {
    #[serde(default)]
    pub id: Option<ProfileId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub passphrase: String,
    #[serde(default)]
    pub config: DeploymentConfig,
}

#[derive(Debug, Serialize)]
pub struct SaveProfileResponse {
    pub id: ProfileId,
}

pub async fn save_profile_handler(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<SaveProfileRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let id = state
        .profiles
        .save(
            request.id,
            &request.name,
            SecretString::from(request.passphrase),
            request.config,
        )
        .await?;
    Ok(Json(SaveProfileResponse { id }))
}

#[derive(Deserialize)]
pub struct LoadProfileRequest {
    #[serde(default)]
    pub passphrase: String,
}

pub async fn load_profile_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<ProfileId>,
    payload: Result<Json<LoadProfileRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = body(payload)?;
    let config = state
        .profiles
        .load(id, SecretString::from(request.passphrase))
        .await?;
    Ok(Json(config))
}

pub async fn delete_profile_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<ProfileId>,
) -> ApiResult<impl IntoResponse> {
    state.profiles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
