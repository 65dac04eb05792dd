//! Lifecycle operations
//!
//! One module per entity family. Every mutating operation runs the same
//! gauntlet: evaluator first, then validation, then uniqueness pre-checks,
//! then the single persisting write. Unique-violation errors coming back
//! from the store are translated to conflicts in exactly one place here.

pub mod admins;
pub mod assistants;
pub mod auth;
pub mod shop_owners;
pub mod shops;

use std::collections::HashMap;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::authz::{evaluate, Action, Decision, DenyReason, PrincipalSnapshot, TargetRef};
use crate::catalog::{Permission, PermissionSet};
use crate::errors::{AppError, AppResult};
use crate::models::principal::{DbPrincipal, PrincipalKind, PrincipalStatus};
use crate::models::shop::{DbShop, ShopStatus, Tariff};

pub(crate) const PRINCIPAL_COLUMNS: &str = "id, kind, username, password_hash, fullname, phone, \
     status, permissions, store_id, created_by_kind, created_by_id, last_login, created_at, \
     updated_at";

pub(crate) const SHOP_COLUMNS: &str = "id, name, owner_id, phone, address, status, tariff, \
     created_by_kind, created_by_id, created_at, updated_at";

pub(crate) fn authorize(
    requester: &PrincipalSnapshot,
    action: Action,
    target: Option<&TargetRef>,
) -> AppResult<()> {
    evaluate(requester, action, target).ok().map_err(AppError::forbidden)
}

/// Read-path variant: an ownership miss is indistinguishable from absence,
/// so it comes back as not-found instead of a 403.
pub(crate) fn authorize_read(
    requester: &PrincipalSnapshot,
    action: Action,
    target: &TargetRef,
    missing: &str,
) -> AppResult<()> {
    match evaluate(requester, action, Some(target)) {
        Decision::Allow => Ok(()),
        Decision::Deny(DenyReason::NotOwner) => Err(AppError::not_found(missing)),
        Decision::Deny(reason) => Err(AppError::forbidden(reason)),
    }
}

// ---- field validation ----

pub(crate) fn ensure_min_len(field: &str, value: &str, min: usize) -> AppResult<()> {
    if value.trim().len() < min {
        return Err(AppError::validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_username(username: &str) -> AppResult<()> {
    ensure_min_len("username", username, 3)
}

pub(crate) fn validate_fullname(fullname: &str) -> AppResult<()> {
    ensure_min_len("fullname", fullname, 3)
}

/// +998 followed by exactly nine digits.
pub(crate) fn validate_phone(phone: &str) -> AppResult<()> {
    let ok = phone
        .strip_prefix("+998")
        .map(|rest| rest.len() == 9 && rest.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false);
    if !ok {
        return Err(AppError::validation("phone must match +998XXXXXXXXX"));
    }
    Ok(())
}

pub(crate) fn parse_principal_status(s: &str) -> AppResult<PrincipalStatus> {
    PrincipalStatus::parse(s)
        .ok_or_else(|| AppError::validation("status must be one of active, inactive, blocked"))
}

pub(crate) fn parse_shop_status(s: &str) -> AppResult<ShopStatus> {
    ShopStatus::parse(s)
        .ok_or_else(|| AppError::validation("status must be one of active, inactive"))
}

pub(crate) fn parse_tariff(s: &str) -> AppResult<Tariff> {
    Tariff::parse(s)
        .ok_or_else(|| AppError::validation("tariff must be one of Basic, Standard, Premium"))
}

// ---- permission grants ----

/// The tags `granter` may put on a target of `target_kind`. The target's
/// kind caps what it can ever hold; an admin granter is additionally capped
/// by its own held set when granting downward to shop owners.
pub(crate) fn grantable_universe(
    granter: &PrincipalSnapshot,
    target_kind: PrincipalKind,
) -> PermissionSet {
    match target_kind {
        // The root holds no explicit grants and is never granted to.
        PrincipalKind::General => PermissionSet::EMPTY,
        PrincipalKind::Admin => PermissionSet::FULL,
        PrincipalKind::ShopOwner => {
            if granter.kind == PrincipalKind::General {
                PermissionSet::SHOP_OWNER_DELEGATABLE
            } else {
                PermissionSet::SHOP_OWNER_DELEGATABLE.intersection(granter.permissions)
            }
        }
        PrincipalKind::Assistant => match granter.kind {
            // Store-level granters never hand out more than they hold.
            PrincipalKind::ShopOwner | PrincipalKind::Assistant => {
                PermissionSet::SHOP_OWNER_DELEGATABLE.intersection(granter.permissions)
            }
            PrincipalKind::General | PrincipalKind::Admin => PermissionSet::FULL,
        },
    }
}

/// Validates requested tags against an allowed universe. Anything unknown
/// or outside the universe fails the whole call, named in the error; there
/// is no silent intersection.
pub(crate) fn validate_grant(raw: &[String], allowed: PermissionSet) -> AppResult<PermissionSet> {
    let mut set = PermissionSet::EMPTY;
    let mut invalid: Vec<&str> = Vec::new();
    for tag in raw {
        match Permission::from_tag(tag) {
            Some(p) if allowed.contains(p) => set.insert(p),
            _ => invalid.push(tag.as_str()),
        }
    }
    if !invalid.is_empty() {
        return Err(AppError::validation(format!(
            "invalid permissions: {}",
            invalid.join(", ")
        )));
    }
    Ok(set)
}

/// Map-shaped boundary for assistant grants: only the true entries count.
/// Sorted before validation so rejection lists are deterministic.
pub(crate) fn validate_grant_map(
    raw: &HashMap<String, bool>,
    allowed: PermissionSet,
) -> AppResult<PermissionSet> {
    let mut requested: Vec<String> =
        raw.iter().filter(|(_, on)| **on).map(|(tag, _)| tag.clone()).collect();
    requested.sort();
    validate_grant(&requested, allowed)
}

pub(crate) fn permissions_json(set: PermissionSet) -> AppResult<String> {
    serde_json::to_string(&set)
        .map_err(|e| AppError::internal(format!("failed to serialize permissions: {e}")))
}

// ---- uniqueness ----

pub(crate) async fn ensure_username_available(
    pool: &SqlitePool,
    kind: PrincipalKind,
    username: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM principals WHERE kind = ? AND username = ? AND id != ?",
    )
    .bind(kind.as_str())
    .bind(username)
    .bind(exclude.map(|u| u.to_string()).unwrap_or_default())
    .fetch_one(pool)
    .await?;

    if count > 0 {
        return Err(AppError::conflict("username already taken"));
    }
    Ok(())
}

pub(crate) async fn ensure_phone_available(
    pool: &SqlitePool,
    kind: PrincipalKind,
    phone: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM principals WHERE kind = ? AND phone = ? AND id != ?",
    )
    .bind(kind.as_str())
    .bind(phone)
    .bind(exclude.map(|u| u.to_string()).unwrap_or_default())
    .fetch_one(pool)
    .await?;

    if count > 0 {
        return Err(AppError::conflict("phone already taken"));
    }
    Ok(())
}

pub(crate) async fn ensure_shop_phone_available(
    pool: &SqlitePool,
    phone: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM shops WHERE phone = ? AND id != ?")
        .bind(phone)
        .bind(exclude.map(|u| u.to_string()).unwrap_or_default())
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::conflict("phone already taken"));
    }
    Ok(())
}

pub(crate) async fn ensure_shop_name_address_available(
    pool: &SqlitePool,
    name: &str,
    address: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(1) FROM shops WHERE name = ? AND address = ? AND id != ?")
            .bind(name)
            .bind(address)
            .bind(exclude.map(|u| u.to_string()).unwrap_or_default())
            .fetch_one(pool)
            .await?;

    if count > 0 {
        return Err(AppError::conflict("name and address already taken"));
    }
    Ok(())
}

/// The single point translating store unique-violations into 409s. The
/// pre-checks above are an optimization; under concurrent writes this is
/// what actually decides the loser.
pub(crate) fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.kind() == sqlx::error::ErrorKind::UniqueViolation {
            let msg = db.message();
            let field = if msg.contains(".username") {
                "username"
            } else if msg.contains(".phone") {
                "phone"
            } else if msg.contains("shops.name") {
                "name and address"
            } else {
                "value"
            };
            return AppError::conflict(format!("{field} already taken"));
        }
    }
    AppError::from(err)
}

// ---- row fetching ----

pub(crate) async fn fetch_principal(
    pool: &SqlitePool,
    kind: PrincipalKind,
    id: Uuid,
) -> AppResult<DbPrincipal> {
    let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE kind = ? AND id = ?");
    sqlx::query_as::<_, DbPrincipal>(&sql)
        .bind(kind.as_str())
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{kind} not found")))
}

/// Admin lookups scan the root too: targeting the root account must fail
/// with the root denial, not dissolve into a 404.
pub(crate) async fn fetch_admin_like(pool: &SqlitePool, id: Uuid) -> AppResult<DbPrincipal> {
    let sql = format!(
        "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE kind IN ('general', 'admin') AND id = ?"
    );
    sqlx::query_as::<_, DbPrincipal>(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("admin not found"))
}

pub(crate) async fn fetch_shop(pool: &SqlitePool, id: Uuid) -> AppResult<DbShop> {
    maybe_fetch_shop(pool, id).await?.ok_or_else(|| AppError::not_found("shop not found"))
}

pub(crate) async fn maybe_fetch_shop(pool: &SqlitePool, id: Uuid) -> AppResult<Option<DbShop>> {
    let sql = format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = ?");
    let shop = sqlx::query_as::<_, DbShop>(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(shop)
}

/// Reduces an assistant row to its target view, resolving the owning shop.
/// An assistant whose shop is gone keeps its store id but loses the owner
/// link, which makes it unreachable through ownership-scoped paths.
pub(crate) async fn assistant_target(pool: &SqlitePool, db: &DbPrincipal) -> AppResult<TargetRef> {
    let id = Uuid::parse_str(&db.id)
        .map_err(|e| AppError::internal(format!("corrupt principal id: {e}")))?;

    let (shop_id, owner_id) = match &db.store_id {
        Some(raw) => {
            let shop_id = Uuid::parse_str(raw)
                .map_err(|e| AppError::internal(format!("corrupt store id: {e}")))?;
            let owner_id = match maybe_fetch_shop(pool, shop_id).await? {
                Some(shop) => Some(
                    Uuid::parse_str(&shop.owner_id)
                        .map_err(|e| AppError::internal(format!("corrupt shop owner id: {e}")))?,
                ),
                None => None,
            };
            (Some(shop_id), owner_id)
        }
        None => (None, None),
    };

    Ok(TargetRef::assistant(id, shop_id, owner_id))
}

pub(crate) fn parse_row_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::internal(format!("corrupt row id: {e}")))
}

pub(crate) fn row_kind(db: &DbPrincipal) -> AppResult<PrincipalKind> {
    db.kind()
        .ok_or_else(|| AppError::internal(format!("corrupt principal kind: {}", db.kind)))
}

pub(crate) fn account_target(db: &DbPrincipal) -> AppResult<TargetRef> {
    Ok(TargetRef::account(parse_row_id(&db.id)?, row_kind(db)?))
}

pub(crate) fn shop_target(db: &DbShop) -> AppResult<TargetRef> {
    Ok(TargetRef::shop(parse_row_id(&db.id)?, parse_row_id(&db.owner_id)?))
}
