//! Authorization predicates for stock opname sessions.
//!
//! A warehouse session is visible to main-warehouse actors, a division
//! session to members of that division. `STOCK_OPNAME_VIEW_ALL` lifts the
//! scope restriction.

use stockroom_auth::permissions::{
    STOCK_OPNAME_FINALIZE, STOCK_OPNAME_MANAGE, STOCK_OPNAME_PROCESS, STOCK_OPNAME_VIEW,
    STOCK_OPNAME_VIEW_ALL,
};
use stockroom_auth::{Actor, AuthzError, Capabilities, Permission, authorize, ensure_division};
use stockroom_core::{DomainError, DomainResult, StateMachine};

use crate::session::{OpnameAction, OpnameScope, OpnameStatus, ScopeKind, StockOpname};

/// Bind a requested scope kind to the actor's own division.
pub fn resolve_scope(kind: ScopeKind, actor: &Actor) -> DomainResult<OpnameScope> {
    match kind {
        ScopeKind::Warehouse => Ok(OpnameScope::Warehouse),
        ScopeKind::Division => actor
            .division_id
            .map(OpnameScope::Division)
            .ok_or_else(|| {
                DomainError::validation("division opname requires an actor assigned to a division")
            }),
    }
}

/// Opening a session in `scope` needs the manage permission inside that scope.
pub fn authorize_initialize<C>(caps: &C, actor: &Actor, scope: OpnameScope) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    scoped(caps, actor, scope, &STOCK_OPNAME_MANAGE)
}

pub fn authorize_view<C>(caps: &C, actor: &Actor, opname: &StockOpname) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    scoped(caps, actor, opname.scope(), &STOCK_OPNAME_VIEW)
}

pub fn authorize_manage<C>(caps: &C, actor: &Actor, opname: &StockOpname) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    scoped(caps, actor, opname.scope(), &STOCK_OPNAME_MANAGE)
}

pub fn authorize_process<C>(caps: &C, actor: &Actor, opname: &StockOpname) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    scoped(caps, actor, opname.scope(), &STOCK_OPNAME_PROCESS)
}

pub fn authorize_finalize<C>(caps: &C, actor: &Actor, opname: &StockOpname) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    scoped(caps, actor, opname.scope(), &STOCK_OPNAME_FINALIZE)
}

pub fn can_view<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, opname: &StockOpname) -> bool {
    authorize_view(caps, actor, opname).is_ok()
}

/// Header edits and deletion are only offered while nothing has been counted.
pub fn can_manage<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, opname: &StockOpname) -> bool {
    opname.status() == OpnameStatus::Pending && authorize_manage(caps, actor, opname).is_ok()
}

pub fn can_process<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, opname: &StockOpname) -> bool {
    opname.status().allows(OpnameAction::Count) && authorize_process(caps, actor, opname).is_ok()
}

pub fn can_finalize<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, opname: &StockOpname) -> bool {
    opname.status().allows(OpnameAction::Finalize)
        && authorize_finalize(caps, actor, opname).is_ok()
}

fn scoped<C>(
    caps: &C,
    actor: &Actor,
    scope: OpnameScope,
    permission: &Permission,
) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, permission)?;
    ensure_division(caps, actor, scope.division_id(), &STOCK_OPNAME_VIEW_ALL)
}
