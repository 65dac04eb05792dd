use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Action, Entity, PrincipalSnapshot, Verb};
use crate::errors::AppResult;
use crate::models::principal::{
    CreatePrincipalRequest, DbPrincipal, Principal, PrincipalKind, PrincipalStatus,
    UpdatePermissionsRequest, UpdateProfileRequest, UpdateStatusRequest,
};
use crate::utils::{hash_password, utc_now};

pub async fn create(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    req: CreatePrincipalRequest,
) -> AppResult<Principal> {
    super::authorize(requester, Action::new(Verb::Create, Entity::ShopOwner), None)?;

    super::validate_username(&req.username)?;
    super::validate_fullname(&req.fullname)?;
    super::validate_phone(&req.phone)?;
    let status = match req.status.as_deref() {
        Some(s) => super::parse_principal_status(s)?,
        None => PrincipalStatus::Active,
    };
    // Owners only ever hold delegatable tags; an admin granter is further
    // capped by what it holds itself.
    let permissions = super::validate_grant(
        &req.permissions,
        super::grantable_universe(requester, PrincipalKind::ShopOwner),
    )?;

    super::ensure_username_available(pool, PrincipalKind::ShopOwner, &req.username, None).await?;
    super::ensure_phone_available(pool, PrincipalKind::ShopOwner, &req.phone, None).await?;

    let password_hash = hash_password(&req.password)?;
    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO principals (id, kind, username, password_hash, fullname, phone, status, \
         permissions, store_id, created_by_kind, created_by_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(PrincipalKind::ShopOwner.as_str())
    .bind(&req.username)
    .bind(password_hash)
    .bind(&req.fullname)
    .bind(&req.phone)
    .bind(status.as_str())
    .bind(super::permissions_json(permissions)?)
    .bind(Option::<String>::None)
    .bind(requester.kind.as_str())
    .bind(requester.id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(super::map_unique_violation)?;

    let created = super::fetch_principal(pool, PrincipalKind::ShopOwner, id).await?;
    let principal: Principal = created.try_into()?;
    Ok(principal)
}

pub async fn list(pool: &SqlitePool, requester: &PrincipalSnapshot) -> AppResult<Vec<Principal>> {
    super::authorize(requester, Action::new(Verb::List, Entity::ShopOwner), None)?;

    let sql = format!(
        "SELECT {} FROM principals WHERE kind = 'shop_owner' ORDER BY created_at DESC",
        super::PRINCIPAL_COLUMNS
    );
    let rows = sqlx::query_as::<_, DbPrincipal>(&sql).fetch_all(pool).await?;
    rows.into_iter().map(Principal::try_from).collect()
}

pub async fn get(pool: &SqlitePool, requester: &PrincipalSnapshot, id: Uuid) -> AppResult<Principal> {
    let db = super::fetch_principal(pool, PrincipalKind::ShopOwner, id).await?;
    let target = super::account_target(&db)?;
    super::authorize_read(
        requester,
        Action::new(Verb::Read, Entity::ShopOwner),
        &target,
        "shop owner not found",
    )?;

    let principal: Principal = db.try_into()?;
    Ok(principal)
}

pub async fn update_profile(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<Principal> {
    let mut db = super::fetch_principal(pool, PrincipalKind::ShopOwner, id).await?;
    let target = super::account_target(&db)?;
    super::authorize(requester, Action::new(Verb::UpdateProfile, Entity::ShopOwner), Some(&target))?;

    if let Some(fullname) = req.fullname.as_ref() {
        super::validate_fullname(fullname)?;
        db.fullname = fullname.clone();
    }
    if let Some(phone) = req.phone.as_ref() {
        super::validate_phone(phone)?;
        super::ensure_phone_available(pool, PrincipalKind::ShopOwner, phone, Some(target.id))
            .await?;
        db.phone = phone.clone();
    }
    if let Some(password) = req.password.as_deref() {
        db.password_hash = hash_password(password)?;
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE principals SET fullname = ?, phone = ?, password_hash = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&db.fullname)
    .bind(&db.phone)
    .bind(&db.password_hash)
    .bind(now)
    .bind(&db.id)
    .execute(pool)
    .await
    .map_err(super::map_unique_violation)?;

    db.updated_at = now;
    let principal: Principal = db.try_into()?;
    Ok(principal)
}

pub async fn set_status(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    id: Uuid,
    req: UpdateStatusRequest,
) -> AppResult<Principal> {
    let mut db = super::fetch_principal(pool, PrincipalKind::ShopOwner, id).await?;
    let target = super::account_target(&db)?;
    super::authorize(requester, Action::new(Verb::UpdateStatus, Entity::ShopOwner), Some(&target))?;

    let status = super::parse_principal_status(&req.status)?;
    let now = utc_now();
    sqlx::query("UPDATE principals SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now)
        .bind(&db.id)
        .execute(pool)
        .await?;

    db.status = status.as_str().to_string();
    db.updated_at = now;
    let principal: Principal = db.try_into()?;
    Ok(principal)
}

pub async fn set_permissions(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    id: Uuid,
    req: UpdatePermissionsRequest,
) -> AppResult<Principal> {
    let mut db = super::fetch_principal(pool, PrincipalKind::ShopOwner, id).await?;
    let target = super::account_target(&db)?;
    super::authorize(
        requester,
        Action::new(Verb::UpdatePermissions, Entity::ShopOwner),
        Some(&target),
    )?;

    let permissions = super::validate_grant(
        &req.permissions,
        super::grantable_universe(requester, PrincipalKind::ShopOwner),
    )?;
    let json = super::permissions_json(permissions)?;

    let now = utc_now();
    sqlx::query("UPDATE principals SET permissions = ?, updated_at = ? WHERE id = ?")
        .bind(&json)
        .bind(now)
        .bind(&db.id)
        .execute(pool)
        .await?;

    db.permissions = json;
    db.updated_at = now;
    let principal: Principal = db.try_into()?;
    Ok(principal)
}

/// Deleting an owner leaves its shops and assistants in place; they become
/// unreachable through ownership-scoped paths, not gone.
pub async fn delete(pool: &SqlitePool, requester: &PrincipalSnapshot, id: Uuid) -> AppResult<()> {
    let db = super::fetch_principal(pool, PrincipalKind::ShopOwner, id).await?;
    let target = super::account_target(&db)?;
    super::authorize(requester, Action::new(Verb::Delete, Entity::ShopOwner), Some(&target))?;

    sqlx::query("DELETE FROM principals WHERE id = ?")
        .bind(&db.id)
        .execute(pool)
        .await?;

    Ok(())
}
