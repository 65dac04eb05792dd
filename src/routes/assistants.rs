use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::AuthPrincipal;
use crate::models::principal::{
    AssistantListQuery, CreateAssistantRequest, Principal, UpdateAssistantPermissionsRequest,
    UpdateAssistantRequest, UpdateStatusRequest,
};
use crate::ops;

pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Json(payload): Json<CreateAssistantRequest>,
) -> AppResult<(StatusCode, Json<Principal>)> {
    let assistant = ops::assistants::create(&state.pool, &requester, payload).await?;
    Ok((StatusCode::CREATED, Json(assistant)))
}

pub async fn list(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Query(query): Query<AssistantListQuery>,
) -> AppResult<Json<Vec<Principal>>> {
    let assistants = ops::assistants::list(&state.pool, &requester, query).await?;
    Ok(Json(assistants))
}

pub async fn get(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Principal>> {
    let assistant = ops::assistants::get(&state.pool, &requester, id).await?;
    Ok(Json(assistant))
}

pub async fn update(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssistantRequest>,
) -> AppResult<Json<Principal>> {
    let assistant = ops::assistants::update(&state.pool, &requester, id, payload).await?;
    Ok(Json(assistant))
}

pub async fn set_status(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Principal>> {
    let assistant = ops::assistants::set_status(&state.pool, &requester, id, payload).await?;
    Ok(Json(assistant))
}

pub async fn set_permissions(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssistantPermissionsRequest>,
) -> AppResult<Json<Principal>> {
    let assistant = ops::assistants::set_permissions(&state.pool, &requester, id, payload).await?;
    Ok(Json(assistant))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ops::assistants::delete(&state.pool, &requester, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
