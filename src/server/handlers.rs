use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use grocery_list_core::{CreateListRequest, ListId, ListPayload, SaveListRequest};

use super::auth::AuthUser;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: grocery_list_core::version(),
    })
}

#[derive(Serialize)]
pub struct MeResponse {
    username: String,
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        username: user.username,
    })
}

/// Names of every list the caller owns or has been shared.
pub async fn list_names(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BTreeMap<ListId, String>>, ApiError> {
    let names = state
        .service
        .owned_and_shared_list_names(&user.username)
        .await?;
    Ok(Json(names))
}

pub async fn create_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateListRequest>,
) -> Result<(StatusCode, Json<ListPayload>), ApiError> {
    let request = body.validate()?;
    let list = state.service.create(request, &user.username).await?;
    Ok((StatusCode::CREATED, Json(ListPayload::from(&list))))
}

pub async fn get_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<ListId>,
) -> Result<Json<ListPayload>, ApiError> {
    let list = state.service.list_by_id(id, &user.username).await?;
    Ok(Json(ListPayload::from(&list)))
}

pub async fn save_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<ListId>,
    ApiJson(body): ApiJson<SaveListRequest>,
) -> Result<Json<ListPayload>, ApiError> {
    let submitted = body.validate()?;
    if submitted.id != id {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "invalid_parameter",
            format!("body id {} does not match path id {}", submitted.id, id),
        ));
    }

    let list = state.service.save_list(submitted, &user.username).await?;
    Ok(Json(ListPayload::from(&list)))
}

pub async fn delete_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<ListId>,
) -> Result<StatusCode, ApiError> {
    state.service.remove_list(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn share_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((id, target)): ApiPath<(ListId, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .share_list(id, &user.username, &target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unshare_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath((id, target)): ApiPath<(ListId, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .unshare_list(id, &user.username, &target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
