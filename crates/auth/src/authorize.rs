use std::collections::{HashMap, HashSet};

use thiserror::Error;

use stockroom_core::{DivisionId, DomainError};

use crate::{Actor, Permission, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: actor is outside division {division} and lacks '{override_permission}'")]
    OutOfScope {
        division: String,
        override_permission: String,
    },
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(permission) => DomainError::unauthorized(permission),
            AuthzError::OutOfScope {
                override_permission,
                ..
            } => DomainError::unauthorized(override_permission),
        }
    }
}

/// Capability check consulted before every stock-affecting transition.
///
/// Role/permission evaluation lives outside the stock core; implementors
/// answer `can(actor, permission)` without side effects.
pub trait Capabilities: Send + Sync {
    fn can(&self, actor: &Actor, permission: &Permission) -> bool;
}

impl<C> Capabilities for &C
where
    C: Capabilities + ?Sized,
{
    fn can(&self, actor: &Actor, permission: &Permission) -> bool {
        (**self).can(actor, permission)
    }
}

impl<C> Capabilities for std::sync::Arc<C>
where
    C: Capabilities + ?Sized,
{
    fn can(&self, actor: &Actor, permission: &Permission) -> bool {
        (**self).can(actor, permission)
    }
}

/// Grants exactly the permissions listed on the actor (`"*"` grants all).
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectGrants;

impl Capabilities for DirectGrants {
    fn can(&self, actor: &Actor, permission: &Permission) -> bool {
        actor
            .permissions
            .iter()
            .any(|p| p.is_wildcard() || p == permission)
    }
}

/// Role-to-permission mapping on top of the actor's direct grants.
#[derive(Debug, Default, Clone)]
pub struct RolePolicy {
    grants: HashMap<Role, HashSet<Permission>>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.grants.entry(role).or_default().extend(permissions);
        self
    }
}

impl Capabilities for RolePolicy {
    fn can(&self, actor: &Actor, permission: &Permission) -> bool {
        if DirectGrants.can(actor, permission) {
            return true;
        }
        actor.roles.iter().any(|role| {
            self.grants.get(role).is_some_and(|perms| {
                perms.iter().any(|p| p.is_wildcard() || p == permission)
            })
        })
    }
}

/// Authorize an actor for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize<C>(caps: &C, actor: &Actor, required: &Permission) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    if caps.can(actor, required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Require the actor to belong to `division`, unless it holds `override_permission`.
pub fn ensure_division<C>(
    caps: &C,
    actor: &Actor,
    division: Option<DivisionId>,
    override_permission: &Permission,
) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    if actor.division_id == division || caps.can(actor, override_permission) {
        return Ok(());
    }
    Err(AuthzError::OutOfScope {
        division: division.map_or_else(|| "main warehouse".to_string(), |d| d.to_string()),
        override_permission: override_permission.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{
        WAREHOUSE_ORDER_CONFIRM, WAREHOUSE_ORDER_DELIVER, WAREHOUSE_ORDER_VIEW_ALL, WILDCARD,
    };
    use stockroom_core::UserId;

    fn actor(division: Option<DivisionId>) -> Actor {
        Actor::new(UserId::new(), division)
    }

    #[test]
    fn direct_grants_match_listed_permission() {
        let a = actor(None).with_permissions([WAREHOUSE_ORDER_CONFIRM]);
        assert!(DirectGrants.can(&a, &WAREHOUSE_ORDER_CONFIRM));
        assert!(!DirectGrants.can(&a, &WAREHOUSE_ORDER_DELIVER));
    }

    #[test]
    fn wildcard_grants_everything() {
        let a = actor(None).with_permissions([WILDCARD]);
        assert!(authorize(&DirectGrants, &a, &WAREHOUSE_ORDER_DELIVER).is_ok());
    }

    #[test]
    fn role_policy_resolves_role_grants() {
        let policy = RolePolicy::new().grant(Role::new("warehouse"), [WAREHOUSE_ORDER_DELIVER]);
        let a = actor(None).with_roles([Role::new("warehouse")]);
        assert!(policy.can(&a, &WAREHOUSE_ORDER_DELIVER));
        assert!(!policy.can(&a, &WAREHOUSE_ORDER_CONFIRM));
    }

    #[test]
    fn missing_permission_is_forbidden_and_maps_to_unauthorized() {
        let a = actor(None);
        let err = authorize(&DirectGrants, &a, &WAREHOUSE_ORDER_CONFIRM).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("warehouse_order.confirm".to_string()));
        assert_eq!(
            DomainError::from(err),
            DomainError::unauthorized("warehouse_order.confirm")
        );
    }

    #[test]
    fn division_scope_requires_membership_or_override() {
        let division = DivisionId::new();
        let member = actor(Some(division));
        let outsider = actor(Some(DivisionId::new()));
        let overseer = actor(None).with_permissions([WAREHOUSE_ORDER_VIEW_ALL]);

        assert!(ensure_division(&DirectGrants, &member, Some(division), &WAREHOUSE_ORDER_VIEW_ALL).is_ok());
        assert!(ensure_division(&DirectGrants, &outsider, Some(division), &WAREHOUSE_ORDER_VIEW_ALL).is_err());
        assert!(ensure_division(&DirectGrants, &overseer, Some(division), &WAREHOUSE_ORDER_VIEW_ALL).is_ok());
    }
}
