use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{Action, Entity, PrincipalSnapshot, Verb};
use crate::errors::{AppError, AppResult};
use crate::models::principal::{PrincipalKind, PrincipalStatus, UpdateStatusRequest};
use crate::models::shop::{CreateShopRequest, DbShop, Shop, ShopStatus, UpdateShopRequest};
use crate::utils::utc_now;

pub async fn create(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    req: CreateShopRequest,
) -> AppResult<Shop> {
    super::authorize(requester, Action::new(Verb::Create, Entity::Shop), None)?;

    super::ensure_min_len("name", &req.name, 2)?;
    super::ensure_min_len("address", &req.address, 10)?;
    super::validate_phone(&req.phone)?;
    let tariff = super::parse_tariff(&req.tariff)?;
    let status = match req.status.as_deref() {
        Some(s) => super::parse_shop_status(s)?,
        None => ShopStatus::Active,
    };

    ensure_active_owner(pool, req.owner_id).await?;

    super::ensure_shop_phone_available(pool, &req.phone, None).await?;
    super::ensure_shop_name_address_available(pool, &req.name, &req.address, None).await?;

    let id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO shops (id, name, owner_id, phone, address, status, tariff, \
         created_by_kind, created_by_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&req.name)
    .bind(req.owner_id.to_string())
    .bind(&req.phone)
    .bind(&req.address)
    .bind(status.as_str())
    .bind(tariff.as_str())
    .bind(requester.kind.as_str())
    .bind(requester.id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(super::map_unique_violation)?;

    let created = super::fetch_shop(pool, id).await?;
    let shop: Shop = created.try_into()?;
    Ok(shop)
}

/// Owners see their own shops; the root and tagged admins see everything.
pub async fn list(pool: &SqlitePool, requester: &PrincipalSnapshot) -> AppResult<Vec<Shop>> {
    super::authorize(requester, Action::new(Verb::List, Entity::Shop), None)?;

    let rows = match requester.kind {
        PrincipalKind::ShopOwner => {
            let sql = format!(
                "SELECT {} FROM shops WHERE owner_id = ? ORDER BY created_at DESC",
                super::SHOP_COLUMNS
            );
            sqlx::query_as::<_, DbShop>(&sql)
                .bind(requester.id.to_string())
                .fetch_all(pool)
                .await?
        }
        _ => {
            let sql = format!("SELECT {} FROM shops ORDER BY created_at DESC", super::SHOP_COLUMNS);
            sqlx::query_as::<_, DbShop>(&sql).fetch_all(pool).await?
        }
    };
    rows.into_iter().map(Shop::try_from).collect()
}

pub async fn get(pool: &SqlitePool, requester: &PrincipalSnapshot, id: Uuid) -> AppResult<Shop> {
    let db = super::fetch_shop(pool, id).await?;
    let target = super::shop_target(&db)?;
    super::authorize_read(
        requester,
        Action::new(Verb::Read, Entity::Shop),
        &target,
        "shop not found",
    )?;

    let shop: Shop = db.try_into()?;
    Ok(shop)
}

pub async fn update(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    id: Uuid,
    req: UpdateShopRequest,
) -> AppResult<Shop> {
    let mut db = super::fetch_shop(pool, id).await?;
    let target = super::shop_target(&db)?;
    super::authorize(requester, Action::new(Verb::UpdateProfile, Entity::Shop), Some(&target))?;

    if let Some(name) = req.name.as_ref() {
        super::ensure_min_len("name", name, 2)?;
        db.name = name.clone();
    }
    if let Some(address) = req.address.as_ref() {
        super::ensure_min_len("address", address, 10)?;
        db.address = address.clone();
    }
    // Name and address are unique as a pair, so touching either re-checks both.
    if req.name.is_some() || req.address.is_some() {
        super::ensure_shop_name_address_available(pool, &db.name, &db.address, Some(target.id))
            .await?;
    }
    if let Some(phone) = req.phone.as_ref() {
        super::validate_phone(phone)?;
        super::ensure_shop_phone_available(pool, phone, Some(target.id)).await?;
        db.phone = phone.clone();
    }
    if let Some(tariff) = req.tariff.as_deref() {
        db.tariff = super::parse_tariff(tariff)?.as_str().to_string();
    }
    if let Some(owner_id) = req.owner_id {
        ensure_active_owner(pool, owner_id).await?;
        db.owner_id = owner_id.to_string();
    }

    let now = utc_now();
    sqlx::query(
        "UPDATE shops SET name = ?, owner_id = ?, phone = ?, address = ?, tariff = ?, \
         updated_at = ? WHERE id = ?",
    )
    .bind(&db.name)
    .bind(&db.owner_id)
    .bind(&db.phone)
    .bind(&db.address)
    .bind(&db.tariff)
    .bind(now)
    .bind(&db.id)
    .execute(pool)
    .await
    .map_err(super::map_unique_violation)?;

    db.updated_at = now;
    let shop: Shop = db.try_into()?;
    Ok(shop)
}

pub async fn set_status(
    pool: &SqlitePool,
    requester: &PrincipalSnapshot,
    id: Uuid,
    req: UpdateStatusRequest,
) -> AppResult<Shop> {
    let mut db = super::fetch_shop(pool, id).await?;
    let target = super::shop_target(&db)?;
    super::authorize(requester, Action::new(Verb::UpdateStatus, Entity::Shop), Some(&target))?;

    let status = super::parse_shop_status(&req.status)?;
    let now = utc_now();
    sqlx::query("UPDATE shops SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now)
        .bind(&db.id)
        .execute(pool)
        .await?;

    db.status = status.as_str().to_string();
    db.updated_at = now;
    let shop: Shop = db.try_into()?;
    Ok(shop)
}

/// Deleting a shop leaves its assistants in place; their store link then
/// points at nothing, which cuts them out of ownership-scoped paths.
pub async fn delete(pool: &SqlitePool, requester: &PrincipalSnapshot, id: Uuid) -> AppResult<()> {
    let db = super::fetch_shop(pool, id).await?;
    let target = super::shop_target(&db)?;
    super::authorize(requester, Action::new(Verb::Delete, Entity::Shop), Some(&target))?;

    sqlx::query("DELETE FROM shops WHERE id = ?")
        .bind(&db.id)
        .execute(pool)
        .await?;

    Ok(())
}

/// A shop must always point at a real, active owner.
async fn ensure_active_owner(pool: &SqlitePool, owner_id: Uuid) -> AppResult<()> {
    let owner = super::fetch_principal(pool, PrincipalKind::ShopOwner, owner_id).await?;
    if owner.status() != Some(PrincipalStatus::Active) {
        return Err(AppError::validation("shop owner is not active"));
    }
    Ok(())
}
