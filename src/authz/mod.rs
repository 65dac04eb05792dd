//! Authorization core
//!
//! Every privileged operation funnels through [`evaluate`], a pure function
//! over the requester's session snapshot, the attempted action and an
//! optional target. It does no I/O; callers resolve the target rows first
//! and reduce them to a [`TargetRef`].

mod evaluator;
mod principal;

pub use evaluator::evaluate;
pub use principal::{PrincipalSnapshot, TargetRef};

use std::fmt;

use crate::catalog::Permission;

/// The entity families a request can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Admin,
    ShopOwner,
    Assistant,
    Shop,
}

impl Entity {
    /// The catalog tag an admin needs for this entity family.
    pub fn capability(self) -> Permission {
        match self {
            Entity::Admin => Permission::ManageAdmins,
            Entity::ShopOwner => Permission::ManageShopOwners,
            Entity::Assistant => Permission::ManageAssistants,
            Entity::Shop => Permission::ManageShops,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    List,
    Read,
    UpdateProfile,
    UpdateStatus,
    UpdatePermissions,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub entity: Entity,
}

impl Action {
    pub fn new(verb: Verb, entity: Entity) -> Self {
        Self { verb, entity }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn ok(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Why a check was denied. The code is what clients see in the error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingPermission(Permission),
    NotOwner,
    TargetIsRoot,
    SelfEscalation,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::MissingPermission(_) => "missing_permission",
            DenyReason::NotOwner => "not_owner",
            DenyReason::TargetIsRoot => "forbidden_target_is_root",
            DenyReason::SelfEscalation => "self_escalation",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::MissingPermission(p) => write!(f, "requires the {} permission", p.as_tag()),
            DenyReason::NotOwner => f.write_str("target belongs to another shop owner"),
            DenyReason::TargetIsRoot => f.write_str("the general admin account cannot be targeted"),
            DenyReason::SelfEscalation => {
                f.write_str("cannot change the standing of your own account")
            }
        }
    }
}
