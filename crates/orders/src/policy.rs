//! Authorization predicates for warehouse orders.
//!
//! `authorize_*` answer "may this actor attempt the action on this order" from
//! permissions and division membership alone; the status check is the state
//! machine's job. `can_*` combine both and are what a UI asks before showing an
//! action. All are pure.

use stockroom_auth::permissions::{
    WAREHOUSE_ORDER_CONFIRM, WAREHOUSE_ORDER_CREATE, WAREHOUSE_ORDER_DELETE,
    WAREHOUSE_ORDER_DELIVER, WAREHOUSE_ORDER_RECEIVE, WAREHOUSE_ORDER_REJECT,
    WAREHOUSE_ORDER_REVISION, WAREHOUSE_ORDER_UPDATE, WAREHOUSE_ORDER_VIEW,
    WAREHOUSE_ORDER_VIEW_ALL,
};
use stockroom_auth::{Actor, AuthzError, Capabilities, Permission, authorize, ensure_division};
use stockroom_core::{DivisionId, StateMachine};

use crate::order::{OrderAction, WarehouseOrder};

/// Submitting an order for `division` requires membership (or the global override).
pub fn authorize_create<C>(caps: &C, actor: &Actor, division: DivisionId) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, &WAREHOUSE_ORDER_CREATE)?;
    ensure_division(caps, actor, Some(division), &WAREHOUSE_ORDER_VIEW_ALL)
}

pub fn authorize_view<C>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    owner_or_division(caps, actor, order, &WAREHOUSE_ORDER_VIEW)
}

pub fn authorize_edit<C>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    owner_or_division(caps, actor, order, &WAREHOUSE_ORDER_UPDATE)
}

pub fn authorize_delete<C>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    owner_or_division(caps, actor, order, &WAREHOUSE_ORDER_DELETE)
}

pub fn authorize_confirm<C>(caps: &C, actor: &Actor, _order: &WarehouseOrder) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, &WAREHOUSE_ORDER_CONFIRM)
}

pub fn authorize_reject<C>(caps: &C, actor: &Actor, _order: &WarehouseOrder) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, &WAREHOUSE_ORDER_REJECT)
}

pub fn authorize_request_revision<C>(
    caps: &C,
    actor: &Actor,
    _order: &WarehouseOrder,
) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, &WAREHOUSE_ORDER_REVISION)
}

pub fn authorize_deliver<C>(caps: &C, actor: &Actor, _order: &WarehouseOrder) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, &WAREHOUSE_ORDER_DELIVER)
}

/// Receipt is reserved to members of the ordering division (or the global override).
pub fn authorize_receive<C>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, &WAREHOUSE_ORDER_RECEIVE)?;
    ensure_division(caps, actor, Some(order.division_id()), &WAREHOUSE_ORDER_VIEW_ALL)
}

pub fn can_view<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> bool {
    authorize_view(caps, actor, order).is_ok()
}

pub fn can_edit<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> bool {
    order.is_editable() && authorize_edit(caps, actor, order).is_ok()
}

pub fn can_delete<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> bool {
    order.is_editable() && authorize_delete(caps, actor, order).is_ok()
}

pub fn can_confirm<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> bool {
    order.status().allows(OrderAction::Confirm) && authorize_confirm(caps, actor, order).is_ok()
}

pub fn can_reject<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> bool {
    order.status().allows(OrderAction::Reject) && authorize_reject(caps, actor, order).is_ok()
}

pub fn can_request_revision<C: Capabilities + ?Sized>(
    caps: &C,
    actor: &Actor,
    order: &WarehouseOrder,
) -> bool {
    order.status().allows(OrderAction::RequestRevision)
        && authorize_request_revision(caps, actor, order).is_ok()
}

pub fn can_deliver<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> bool {
    order.status().allows(OrderAction::Deliver) && authorize_deliver(caps, actor, order).is_ok()
}

pub fn can_receive<C: Capabilities + ?Sized>(caps: &C, actor: &Actor, order: &WarehouseOrder) -> bool {
    order.status().allows(OrderAction::Receive) && authorize_receive(caps, actor, order).is_ok()
}

fn owner_or_division<C>(
    caps: &C,
    actor: &Actor,
    order: &WarehouseOrder,
    permission: &Permission,
) -> Result<(), AuthzError>
where
    C: Capabilities + ?Sized,
{
    authorize(caps, actor, permission)?;
    if actor.user_id == order.requested_by() {
        return Ok(());
    }
    ensure_division(caps, actor, Some(order.division_id()), &WAREHOUSE_ORDER_VIEW_ALL)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::order::{CartLine, OrderRequest};
    use stockroom_auth::DirectGrants;
    use stockroom_core::{ItemId, UserId, WarehouseOrderId};

    fn order_for(division: DivisionId, requester: UserId) -> WarehouseOrder {
        WarehouseOrder::submit(OrderRequest {
            id: WarehouseOrderId::new(),
            order_number: "WO/20261019/0001".to_string(),
            requested_by: requester,
            division_id: division,
            description: None,
            notes: None,
            carts: vec![CartLine::new(ItemId::new(), 1)],
            requested_at: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn edit_is_limited_to_owner_or_division_while_editable() {
        let division = DivisionId::new();
        let requester = UserId::new();
        let mut order = order_for(division, requester);

        let owner = Actor::new(requester, Some(division)).with_permissions([WAREHOUSE_ORDER_UPDATE]);
        let colleague =
            Actor::new(UserId::new(), Some(division)).with_permissions([WAREHOUSE_ORDER_UPDATE]);
        let stranger =
            Actor::new(UserId::new(), Some(DivisionId::new())).with_permissions([WAREHOUSE_ORDER_UPDATE]);

        assert!(can_edit(&DirectGrants, &owner, &order));
        assert!(can_edit(&DirectGrants, &colleague, &order));
        assert!(!can_edit(&DirectGrants, &stranger, &order));

        order.confirm(UserId::new(), Utc::now()).unwrap();
        assert!(!can_edit(&DirectGrants, &owner, &order));
    }

    #[test]
    fn confirm_and_deliver_follow_status_and_permission() {
        let mut order = order_for(DivisionId::new(), UserId::new());
        let approver = Actor::new(UserId::new(), None).with_permissions([WAREHOUSE_ORDER_CONFIRM]);
        let courier = Actor::new(UserId::new(), None).with_permissions([WAREHOUSE_ORDER_DELIVER]);

        assert!(can_confirm(&DirectGrants, &approver, &order));
        assert!(!can_confirm(&DirectGrants, &courier, &order));
        assert!(!can_deliver(&DirectGrants, &courier, &order));

        order.confirm(approver.user_id, Utc::now()).unwrap();
        assert!(!can_confirm(&DirectGrants, &approver, &order));
        assert!(can_deliver(&DirectGrants, &courier, &order));
    }

    #[test]
    fn receive_needs_division_membership_or_override() {
        let division = DivisionId::new();
        let mut order = order_for(division, UserId::new());
        order.confirm(UserId::new(), Utc::now()).unwrap();
        order.mark_delivered(UserId::new(), None, Utc::now()).unwrap();

        let member = Actor::new(UserId::new(), Some(division)).with_permissions([WAREHOUSE_ORDER_RECEIVE]);
        let outsider =
            Actor::new(UserId::new(), Some(DivisionId::new())).with_permissions([WAREHOUSE_ORDER_RECEIVE]);
        let overseer = Actor::new(UserId::new(), None)
            .with_permissions([WAREHOUSE_ORDER_RECEIVE, WAREHOUSE_ORDER_VIEW_ALL]);

        assert!(can_receive(&DirectGrants, &member, &order));
        assert!(!can_receive(&DirectGrants, &outsider, &order));
        assert!(can_receive(&DirectGrants, &overseer, &order));
        assert!(matches!(
            authorize_receive(&DirectGrants, &outsider, &order),
            Err(AuthzError::OutOfScope { .. })
        ));
    }

    #[test]
    fn view_allows_requester_from_elsewhere() {
        let requester = UserId::new();
        let order = order_for(DivisionId::new(), requester);
        let moved = Actor::new(requester, Some(DivisionId::new())).with_permissions([WAREHOUSE_ORDER_VIEW]);
        let without_permission = Actor::new(requester, None);

        assert!(can_view(&DirectGrants, &moved, &order));
        assert!(!can_view(&DirectGrants, &without_permission, &order));
    }

    #[test]
    fn predicates_have_no_side_effects() {
        let order = order_for(DivisionId::new(), UserId::new());
        let before = order.clone();
        let anyone = Actor::new(UserId::new(), None);
        let _ = (
            can_view(&DirectGrants, &anyone, &order),
            can_edit(&DirectGrants, &anyone, &order),
            can_confirm(&DirectGrants, &anyone, &order),
            can_deliver(&DirectGrants, &anyone, &order),
            can_receive(&DirectGrants, &anyone, &order),
        );
        assert_eq!(order, before);
    }
}
