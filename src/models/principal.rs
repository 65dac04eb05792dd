use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::catalog::PermissionSet;
use crate::errors::AppError;

/// The four account kinds, stored in one table behind a `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    General,
    Admin,
    ShopOwner,
    Assistant,
}

impl PrincipalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalKind::General => "general",
            PrincipalKind::Admin => "admin",
            PrincipalKind::ShopOwner => "shop_owner",
            PrincipalKind::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<PrincipalKind> {
        match s {
            "general" => Some(PrincipalKind::General),
            "admin" => Some(PrincipalKind::Admin),
            "shop_owner" => Some(PrincipalKind::ShopOwner),
            "assistant" => Some(PrincipalKind::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PrincipalKind::General => "general admin",
            PrincipalKind::Admin => "admin",
            PrincipalKind::ShopOwner => "shop owner",
            PrincipalKind::Assistant => "assistant",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalStatus {
    Active,
    Inactive,
    Blocked,
}

impl PrincipalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrincipalStatus::Active => "active",
            PrincipalStatus::Inactive => "inactive",
            PrincipalStatus::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<PrincipalStatus> {
        match s {
            "active" => Some(PrincipalStatus::Active),
            "inactive" => Some(PrincipalStatus::Inactive),
            "blocked" => Some(PrincipalStatus::Blocked),
            _ => None,
        }
    }
}

/// Who created a record: the creator's kind and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBy {
    pub role: PrincipalKind,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub username: String,
    pub fullname: String,
    pub phone: String,
    pub status: PrincipalStatus,
    pub permissions: PermissionSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<CreatedBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw row. Ids and enums come out of SQLite as text and are parsed in the
/// `TryFrom` below; the password hash never leaves this type.
#[derive(Debug, Clone, FromRow)]
pub struct DbPrincipal {
    pub id: String,
    pub kind: String,
    pub username: String,
    pub password_hash: String,
    pub fullname: String,
    pub phone: String,
    pub status: String,
    pub permissions: String,
    pub store_id: Option<String>,
    pub created_by_kind: Option<String>,
    pub created_by_id: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbPrincipal {
    pub fn kind(&self) -> Option<PrincipalKind> {
        PrincipalKind::parse(&self.kind)
    }

    pub fn status(&self) -> Option<PrincipalStatus> {
        PrincipalStatus::parse(&self.status)
    }
}

impl TryFrom<DbPrincipal> for Principal {
    type Error = AppError;

    fn try_from(value: DbPrincipal) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|e| AppError::internal(format!("corrupt principal id: {e}")))?;
        let kind = PrincipalKind::parse(&value.kind)
            .ok_or_else(|| AppError::internal(format!("corrupt principal kind: {}", value.kind)))?;
        let status = PrincipalStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("corrupt principal status: {}", value.status)))?;
        let permissions: PermissionSet = serde_json::from_str(&value.permissions)
            .map_err(|e| AppError::internal(format!("corrupt permissions column: {e}")))?;
        let store_id = value
            .store_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| AppError::internal(format!("corrupt store id: {e}")))?;
        let created_by = match (&value.created_by_kind, &value.created_by_id) {
            (Some(k), Some(i)) => {
                let role = PrincipalKind::parse(k)
                    .ok_or_else(|| AppError::internal(format!("corrupt creator kind: {k}")))?;
                let id = Uuid::parse_str(i)
                    .map_err(|e| AppError::internal(format!("corrupt creator id: {e}")))?;
                Some(CreatedBy { role, id })
            }
            _ => None,
        };

        Ok(Principal {
            id,
            kind,
            username: value.username,
            fullname: value.fullname,
            phone: value.phone,
            status,
            permissions,
            store_id,
            created_by,
            last_login: value.last_login,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub kind: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub principal: Principal,
}

/// Create payload for admins and shop owners. Permissions arrive as raw
/// tags and are validated against the granter's allowed universe.
#[derive(Debug, Deserialize)]
pub struct CreatePrincipalRequest {
    pub username: String,
    pub password: String,
    pub fullname: String,
    pub phone: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub status: Option<String>,
}

/// Create payload for assistants. Permissions arrive as a tag -> bool map;
/// only the true entries count.
#[derive(Debug, Deserialize)]
pub struct CreateAssistantRequest {
    pub fullname: String,
    pub phone: String,
    pub username: String,
    pub password: String,
    pub store_id: Uuid,
    #[serde(default)]
    pub permissions: HashMap<String, bool>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssistantRequest {
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    /// Moving an assistant re-runs the shop gate on the new shop.
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssistantPermissionsRequest {
    pub permissions: HashMap<String, bool>,
}

#[derive(Debug, Deserialize)]
pub struct AssistantListQuery {
    pub store_id: Option<Uuid>,
    pub status: Option<String>,
    /// Case-insensitive substring match on fullname, username or phone.
    pub search: Option<String>,
}
