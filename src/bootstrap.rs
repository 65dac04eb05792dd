//! First-run seeding of the general admin account.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::principal::{PrincipalKind, PrincipalStatus};
use crate::utils::{hash_password, utc_now};

/// Ensures exactly one general admin row exists and returns its id.
///
/// Idempotent: when a root already exists it is left untouched, credentials
/// included. The root row holds no explicit permissions; its authority comes
/// from its kind alone.
pub async fn ensure_general_admin(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    phone: &str,
    fullname: &str,
) -> AppResult<Uuid> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM principals WHERE kind = 'general'")
            .fetch_optional(pool)
            .await?;
    if let Some(raw) = existing {
        let id = Uuid::parse_str(&raw)
            .map_err(|e| AppError::internal(format!("corrupt principal id: {e}")))?;
        return Ok(id);
    }

    crate::ops::validate_username(username)?;
    crate::ops::validate_fullname(fullname)?;
    crate::ops::validate_phone(phone)?;

    let password_hash = hash_password(password)?;
    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO principals (id, kind, username, password_hash, fullname, phone, status, \
         permissions, store_id, created_by_kind, created_by_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(PrincipalKind::General.as_str())
    .bind(username)
    .bind(password_hash)
    .bind(fullname)
    .bind(phone)
    .bind(PrincipalStatus::Active.as_str())
    .bind("[]")
    .bind(Option::<String>::None)
    .bind(Option::<String>::None)
    .bind(Option::<String>::None)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!(%id, username, "general admin seeded");
    Ok(id)
}
