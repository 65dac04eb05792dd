use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::AuthPrincipal;
use crate::models::principal::{
    CreatePrincipalRequest, Principal, UpdatePermissionsRequest, UpdateProfileRequest,
    UpdateStatusRequest,
};
use crate::ops;

pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Json(payload): Json<CreatePrincipalRequest>,
) -> AppResult<(StatusCode, Json<Principal>)> {
    let admin = ops::admins::create(&state.pool, &requester, payload).await?;
    Ok((StatusCode::CREATED, Json(admin)))
}

pub async fn list(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
) -> AppResult<Json<Vec<Principal>>> {
    let admins = ops::admins::list(&state.pool, &requester).await?;
    Ok(Json(admins))
}

pub async fn get(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Principal>> {
    let admin = ops::admins::get(&state.pool, &requester, id).await?;
    Ok(Json(admin))
}

pub async fn update(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<Principal>> {
    let admin = ops::admins::update_profile(&state.pool, &requester, id, payload).await?;
    Ok(Json(admin))
}

pub async fn set_status(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Principal>> {
    let admin = ops::admins::set_status(&state.pool, &requester, id, payload).await?;
    Ok(Json(admin))
}

pub async fn set_permissions(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePermissionsRequest>,
) -> AppResult<Json<Principal>> {
    let admin = ops::admins::set_permissions(&state.pool, &requester, id, payload).await?;
    Ok(Json(admin))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ops::admins::delete(&state.pool, &requester, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
