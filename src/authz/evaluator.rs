use crate::catalog::Permission;
use crate::models::principal::PrincipalKind;

use super::principal::{PrincipalSnapshot, TargetRef};
use super::{Action, Decision, DenyReason, Entity, Verb};

/// Decides whether `requester` may perform `action`, optionally against a
/// resolved `target`.
///
/// Rule order:
/// 1. general admin -> allow
/// 2. target is the root account -> deny (forbidden_target_is_root)
/// 3. target is the requester -> reads and profile edits allowed, standing
///    changes (status, permissions, delete) denied (self_escalation)
/// 4. admin -> allow iff the entity's capability tag is held
/// 5. shop owner -> ownership decides for assistants and own-shop reads
/// 6. assistant -> needs the delegated tag and stays inside its own store
pub fn evaluate(
    requester: &PrincipalSnapshot,
    action: Action,
    target: Option<&TargetRef>,
) -> Decision {
    if requester.kind == PrincipalKind::General {
        return Decision::Allow;
    }

    if let Some(t) = target {
        if t.is_root {
            return deny(requester, action, DenyReason::TargetIsRoot);
        }
        if t.id == requester.id {
            match action.verb {
                Verb::Read | Verb::UpdateProfile => return Decision::Allow,
                Verb::UpdateStatus | Verb::UpdatePermissions | Verb::Delete => {
                    return deny(requester, action, DenyReason::SelfEscalation)
                }
                Verb::Create | Verb::List => {}
            }
        }
    }

    match requester.kind {
        PrincipalKind::General => Decision::Allow,
        PrincipalKind::Admin => {
            let cap = action.entity.capability();
            if requester.has(cap) {
                Decision::Allow
            } else {
                deny(requester, action, DenyReason::MissingPermission(cap))
            }
        }
        PrincipalKind::ShopOwner => evaluate_shop_owner(requester, action, target),
        PrincipalKind::Assistant => evaluate_assistant(requester, action, target),
    }
}

/// Owners rule their own shops by ownership alone; holding a tag is not
/// required to staff a shop the owner already owns.
fn evaluate_shop_owner(
    requester: &PrincipalSnapshot,
    action: Action,
    target: Option<&TargetRef>,
) -> Decision {
    match action.entity {
        Entity::Assistant => match target {
            Some(t) if t.owner_id == Some(requester.id) => Decision::Allow,
            Some(_) => deny(requester, action, DenyReason::NotOwner),
            // Bare lists are narrowed to the owner's shops in the query.
            None => Decision::Allow,
        },
        Entity::Shop => match (action.verb, target) {
            (Verb::List, _) => Decision::Allow,
            (Verb::Read, Some(t)) if t.owner_id == Some(requester.id) => Decision::Allow,
            (Verb::Read, Some(_)) => deny(requester, action, DenyReason::NotOwner),
            _ => deny(requester, action, DenyReason::MissingPermission(Permission::ManageShops)),
        },
        Entity::Admin | Entity::ShopOwner => {
            deny(requester, action, DenyReason::MissingPermission(action.entity.capability()))
        }
    }
}

fn evaluate_assistant(
    requester: &PrincipalSnapshot,
    action: Action,
    target: Option<&TargetRef>,
) -> Decision {
    // Reading the shop the session is bound to needs no tag.
    if action.entity == Entity::Shop && action.verb == Verb::Read {
        return match target {
            Some(t) if requester.store_id.is_some() && t.shop_id == requester.store_id => {
                Decision::Allow
            }
            Some(_) => deny(requester, action, DenyReason::NotOwner),
            None => deny(requester, action, DenyReason::MissingPermission(Permission::ManageShops)),
        };
    }

    // Beyond that, assistants only ever manage their own store's staff;
    // everything else sits behind tags the delegatable subset never contains.
    if action.entity != Entity::Assistant {
        return deny(requester, action, DenyReason::MissingPermission(action.entity.capability()));
    }
    if !requester.has(Permission::ManageAssistants) {
        return deny(
            requester,
            action,
            DenyReason::MissingPermission(Permission::ManageAssistants),
        );
    }
    match target {
        Some(t) if requester.store_id.is_some() && t.shop_id == requester.store_id => {
            Decision::Allow
        }
        Some(_) => deny(requester, action, DenyReason::NotOwner),
        None => Decision::Allow,
    }
}

fn deny(requester: &PrincipalSnapshot, action: Action, reason: DenyReason) -> Decision {
    tracing::debug!(
        requester = %requester.id,
        kind = requester.kind.as_str(),
        verb = ?action.verb,
        entity = ?action.entity,
        reason = reason.code(),
        "authorization denied"
    );
    Decision::Deny(reason)
}
