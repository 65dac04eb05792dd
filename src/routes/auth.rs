use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::PrincipalSnapshot;
use crate::errors::AppResult;
use crate::jwt::AuthPrincipal;
use crate::models::principal::{AuthResponse, LoginRequest};
use crate::ops;

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = ops::auth::login(&state.pool, &state.jwt, payload).await?;
    Ok(Json(response))
}

/// Echoes the session snapshot the token carries. Edits made since login do
/// not show up here until the account logs in again.
pub async fn me(AuthPrincipal(snapshot): AuthPrincipal) -> AppResult<Json<PrincipalSnapshot>> {
    Ok(Json(snapshot))
}
