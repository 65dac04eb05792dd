use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::AuthPrincipal;
use crate::models::principal::UpdateStatusRequest;
use crate::models::shop::{CreateShopRequest, Shop, UpdateShopRequest};
use crate::ops;

pub async fn create(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Json(payload): Json<CreateShopRequest>,
) -> AppResult<(StatusCode, Json<Shop>)> {
    let shop = ops::shops::create(&state.pool, &requester, payload).await?;
    Ok((StatusCode::CREATED, Json(shop)))
}

pub async fn list(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
) -> AppResult<Json<Vec<Shop>>> {
    let shops = ops::shops::list(&state.pool, &requester).await?;
    Ok(Json(shops))
}

pub async fn get(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Shop>> {
    let shop = ops::shops::get(&state.pool, &requester, id).await?;
    Ok(Json(shop))
}

pub async fn update(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShopRequest>,
) -> AppResult<Json<Shop>> {
    let shop = ops::shops::update(&state.pool, &requester, id, payload).await?;
    Ok(Json(shop))
}

pub async fn set_status(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Shop>> {
    let shop = ops::shops::set_status(&state.pool, &requester, id, payload).await?;
    Ok(Json(shop))
}

pub async fn delete(
    State(state): State<AppState>,
    AuthPrincipal(requester): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    ops::shops::delete(&state.pool, &requester, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
