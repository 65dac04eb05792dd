use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Action, Entity, PrincipalSnapshot, Verb};
use crate::errors::{AppError, AppResult};
use crate::models::principal::{
    AssistantListQuery, CreateAssistantRequest, DbPrincipal, Principal, PrincipalKind,
    PrincipalStatus, UpdateAssistantPermissionsRequest, UpdateAssistantRequest,
    UpdateStatusRequest,
};
use crate::models::shop::ShopStatus;
use crate::utils::{hash_password, utc_now};

pub async fn create(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    req: CreateAssistantRequest,
) -> AppResult<Principal> {
    let shop = super::fetch_shop(pool, req.store_id).await?;
    let target = super::shop_target(&shop)?;
    super::authorize(requester, Action::new(Verb::Create, Entity::Assistant), Some(&target))?;

    // An inactive shop takes no new staff, no matter who asks.
    if shop.status() != Some(ShopStatus::Active) {
        return Err(AppError::validation("shop is not active"));
    }

    super::validate_username(&req.username)?;
    super::validate_fullname(&req.fullname)?;
    super::validate_phone(&req.phone)?;
    let status = match req.status.as_deref() {
        Some(s) => super::parse_principal_status(s)?,
        None => PrincipalStatus::Active,
    };
    let permissions = super::validate_grant_map(
        &req.permissions,
        super::grantable_universe(requester, PrincipalKind::Assistant),
    )?;

    super::ensure_username_available(pool, PrincipalKind::Assistant, &req.username, None).await?;
    super::ensure_phone_available(pool, PrincipalKind::Assistant, &req.phone, None).await?;

    let password_hash = hash_password(&req.password)?;
    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO principals (id, kind, username, password_hash, fullname, phone, status, \
         permissions, store_id, created_by_kind, created_by_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(PrincipalKind::Assistant.as_str())
    .bind(&req.username)
    .bind(password_hash)
    .bind(&req.fullname)
    .bind(&req.phone)
    .bind(status.as_str())
    .bind(super::permissions_json(permissions)?)
    .bind(Some(req.store_id.to_string()))
    .bind(requester.kind.as_str())
    .bind(requester.id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(super::map_unique_violation)?;

    let created = super::fetch_principal(pool, PrincipalKind::Assistant, id).await?;
    let principal: Principal = created.try_into()?;
    Ok(principal)
}

/// Listing is always narrowed to what the requester may see; the optional
/// filters only ever narrow further. A filter pointing at a foreign store
/// yields an empty page, not an error.
pub async fn list(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    query: AssistantListQuery,
) -> AppResult<Vec<Principal>> {
    super::authorize(requester, Action::new(Verb::List, Entity::Assistant), None)?;

    let mut sql =
        format!("SELECT {} FROM principals WHERE kind = 'assistant'", super::PRINCIPAL_COLUMNS);
    let mut binds: Vec<String> = Vec::new();

    match requester.kind {
        PrincipalKind::General | PrincipalKind::Admin => {}
        PrincipalKind::ShopOwner => {
            sql.push_str(" AND store_id IN (SELECT id FROM shops WHERE owner_id = ?)");
            binds.push(requester.id.to_string());
        }
        PrincipalKind::Assistant => match requester.store_id {
            Some(store) => {
                sql.push_str(" AND store_id = ?");
                binds.push(store.to_string());
            }
            None => return Ok(Vec::new()),
        },
    }

    if let Some(store) = query.store_id {
        sql.push_str(" AND store_id = ?");
        binds.push(store.to_string());
    }
    if let Some(status) = query.status.as_deref() {
        let status = super::parse_principal_status(status)?;
        sql.push_str(" AND status = ?");
        binds.push(status.as_str().to_string());
    }
    if let Some(search) = query.search.as_deref() {
        sql.push_str(" AND (lower(fullname) LIKE ? OR lower(username) LIKE ? OR phone LIKE ?)");
        let needle = format!("%{}%", search.to_lowercase());
        binds.push(needle.clone());
        binds.push(needle);
        binds.push(format!("%{search}%"));
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut q = sqlx::query_as::<_, DbPrincipal>(&sql);
    for bind in &binds {
        q = q.bind(bind);
    }
    let rows = q.fetch_all(pool).await?;
    rows.into_iter().map(Principal::try_from).collect()
}

pub async fn get(pool: &SqlitePool, requester: &PrincipalSnapshot, id: Uuid) -> AppResult<Principal> {
    let db = super::fetch_principal(pool, PrincipalKind::Assistant, id).await?;
    let target = super::assistant_target(pool, &db).await?;
    super::authorize_read(
        requester,
        Action::new(Verb::Read, Entity::Assistant),
        &target,
        "assistant not found",
    )?;

    let principal: Principal = db.try_into()?;
    Ok(principal)
}

pub async fn update(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    id: Uuid,
    req: UpdateAssistantRequest,
) -> AppResult<Principal> {
    let mut db = super::fetch_principal(pool, PrincipalKind::Assistant, id).await?;
    let target = super::assistant_target(pool, &db).await?;
    super::authorize(requester, Action::new(Verb::UpdateProfile, Entity::Assistant), Some(&target))?;

    if let Some(fullname) = req.fullname.as_ref() {
        super::validate_fullname(fullname)?;
        db.fullname = fullname.clone();
    }
    if let Some(phone) = req.phone.as_ref() {
        super::validate_phone(phone)?;
        super::ensure_phone_available(pool, PrincipalKind::Assistant, phone, Some(target.id))
            .await?;
        db.phone = phone.clone();
    }
    if let Some(password) = req.password.as_deref() {
        db.password_hash = hash_password(password)?;
    }
    if let Some(store_id) = req.store_id {
        // Moving stores re-runs the shop gate against the destination.
        let shop = super::fetch_shop(pool, store_id).await?;
        let dest = super::shop_target(&shop)?;
        super::authorize(requester, Action::new(Verb::Create, Entity::Assistant), Some(&dest))?;
        if shop.status() != Some(ShopStatus::Active) {
            return Err(AppError::validation("shop is not active"));
        }
        db.store_id = Some(store_id.to_string());
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE principals SET fullname = ?, phone = ?, password_hash = ?, store_id = ?, \
         updated_at = ? WHERE id = ?",
    )
    .bind(&db.fullname)
    .bind(&db.phone)
    .bind(&db.password_hash)
    .bind(&db.store_id)
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
    let mut db = super::fetch_principal(pool, PrincipalKind::Assistant, id).await?;
    let target = super::assistant_target(pool, &db).await?;
    super::authorize(requester, Action::new(Verb::UpdateStatus, Entity::Assistant), Some(&target))?;

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
    req: UpdateAssistantPermissionsRequest,
) -> AppResult<Principal> {
    let mut db = super::fetch_principal(pool, PrincipalKind::Assistant, id).await?;
    let target = super::assistant_target(pool, &db).await?;
    super::authorize(
        requester,
        Action::new(Verb::UpdatePermissions, Entity::Assistant),
        Some(&target),
    )?;

    let permissions = super::validate_grant_map(
        &req.permissions,
        super::grantable_universe(requester, PrincipalKind::Assistant),
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

pub async fn delete(pool: &SqlitePool, requester: &PrincipalSnapshot, id: Uuid) -> AppResult<()> {
    let db = super::fetch_principal(pool, PrincipalKind::Assistant, id).await?;
    let target = super::assistant_target(pool, &db).await?;
    super::authorize(requester, Action::new(Verb::Delete, Entity::Assistant), Some(&target))?;

    sqlx::query("DELETE FROM principals WHERE id = ?")
        .bind(&db.id)
        .execute(pool)
        .await?;

    Ok(())
}
