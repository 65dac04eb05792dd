use serde::Serialize;
use uuid::Uuid;

use crate::catalog::{Permission, PermissionSet};
use crate::models::principal::{PrincipalKind, PrincipalStatus};

/// The requester exactly as the session token captured it at login.
///
/// Evaluation never refreshes this from the database. Permission or status
/// edits made after the token was issued take effect on the next login.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalSnapshot {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub username: String,
    pub status: PrincipalStatus,
    pub permissions: PermissionSet,
    /// Assistants only: the shop the session is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
}

impl PrincipalSnapshot {
    pub fn new(id: Uuid, kind: PrincipalKind) -> Self {
        Self {
            id,
            kind,
            username: String::new(),
            status: PrincipalStatus::Active,
            permissions: PermissionSet::EMPTY,
            store_id: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_store(mut self, store_id: Uuid) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }
}

/// The resource side of a check, reduced to the fields the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct TargetRef {
    pub id: Uuid,
    pub is_root: bool,
    /// For assistants, their shop; for shops, the shop itself.
    pub shop_id: Option<Uuid>,
    /// The shop owner the target hangs under, when one exists. Stays `None`
    /// for orphaned assistants whose shop is gone.
    pub owner_id: Option<Uuid>,
}

impl TargetRef {
    /// An admin or shop-owner account.
    pub fn account(id: Uuid, kind: PrincipalKind) -> Self {
        Self {
            id,
            is_root: kind == PrincipalKind::General,
            shop_id: None,
            owner_id: None,
        }
    }

    pub fn assistant(id: Uuid, shop_id: Option<Uuid>, owner_id: Option<Uuid>) -> Self {
        Self { id, is_root: false, shop_id, owner_id }
    }

    pub fn shop(id: Uuid, owner_id: Uuid) -> Self {
        Self { id, is_root: false, shop_id: Some(id), owner_id: Some(owner_id) }
    }
}
