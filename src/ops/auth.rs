use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::jwt::JwtConfig;
use crate::models::principal::{
    AuthResponse, DbPrincipal, LoginRequest, Principal, PrincipalKind, PrincipalStatus,
};
use crate::utils::{utc_now, verify_password};

use super::PRINCIPAL_COLUMNS;

/// Kind-scoped credential check. The issued token captures the account's
/// entire authorization state; later grants or revocations only reach a
/// session through a fresh login.
pub async fn login(
    pool: &SqlitePool,
    jwt: &JwtConfig,
    req: LoginRequest,
) -> AppResult<AuthResponse> {
    let kind = PrincipalKind::parse(&req.kind).ok_or_else(|| {
        AppError::validation("kind must be one of general, admin, shop_owner, assistant")
    })?;

    let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE kind = ? AND username = ?");
    let mut db = sqlx::query_as::<_, DbPrincipal>(&sql)
        .bind(kind.as_str())
        .bind(&req.username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::auth("invalid credentials"))?;

    if !verify_password(&req.password, &db.password_hash)? {
        return Err(AppError::auth("invalid credentials"));
    }

    // The root is exempt from status gating; everyone else must be active.
    if kind != PrincipalKind::General && db.status() != Some(PrincipalStatus::Active) {
        return Err(AppError::auth("account is not active"));
    }

    let now = utc_now();
    sqlx::query("UPDATE principals SET last_login = ? WHERE id = ?")
        .bind(now)
        .bind(&db.id)
        .execute(pool)
        .await?;
    db.last_login = Some(now);

    let principal: Principal = db.try_into()?;
    let token = jwt.encode(&principal)?;

    Ok(AuthResponse { token, principal })
}
