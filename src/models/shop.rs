use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::principal::{CreatedBy, PrincipalKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopStatus {
    Active,
    Inactive,
}

impl ShopStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShopStatus::Active => "active",
            ShopStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<ShopStatus> {
        match s {
            "active" => Some(ShopStatus::Active),
            "inactive" => Some(ShopStatus::Inactive),
            _ => None,
        }
    }
}

/// Billing plan. The capitalized names are the wire and storage format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tariff {
    Basic,
    Standard,
    Premium,
}

impl Tariff {
    pub fn as_str(self) -> &'static str {
        match self {
            Tariff::Basic => "Basic",
            Tariff::Standard => "Standard",
            Tariff::Premium => "Premium",
        }
    }

    pub fn parse(s: &str) -> Option<Tariff> {
        match s {
            "Basic" => Some(Tariff::Basic),
            "Standard" => Some(Tariff::Standard),
            "Premium" => Some(Tariff::Premium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Shop {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub phone: String,
    pub address: String,
    pub status: ShopStatus,
    pub tariff: Tariff,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<CreatedBy>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbShop {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub phone: String,
    pub address: String,
    pub status: String,
    pub tariff: String,
    pub created_by_kind: Option<String>,
    pub created_by_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbShop {
    pub fn status(&self) -> Option<ShopStatus> {
        ShopStatus::parse(&self.status)
    }
}

impl TryFrom<DbShop> for Shop {
    type Error = AppError;

    fn try_from(value: DbShop) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|e| AppError::internal(format!("corrupt shop id: {e}")))?;
        let owner_id = Uuid::parse_str(&value.owner_id)
            .map_err(|e| AppError::internal(format!("corrupt shop owner id: {e}")))?;
        let status = ShopStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("corrupt shop status: {}", value.status)))?;
        let tariff = Tariff::parse(&value.tariff)
            .ok_or_else(|| AppError::internal(format!("corrupt shop tariff: {}", value.tariff)))?;
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

        Ok(Shop {
            id,
            name: value.name,
            owner_id,
            phone: value.phone,
            address: value.address,
            status,
            tariff,
            created_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    pub name: String,
    pub owner_id: Uuid,
    pub phone: String,
    pub address: String,
    pub tariff: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    /// Reassigning re-checks that the new owner exists and is active.
    pub owner_id: Option<Uuid>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tariff: Option<String>,
}
