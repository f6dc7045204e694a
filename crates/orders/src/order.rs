use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    AggregateRoot, DivisionId, DomainError, DomainResult, ItemId, RejectId, StateMachine, UserId,
    WarehouseOrderId,
};

use crate::reject::WarehouseOrderReject;

/// Warehouse order status lifecycle.
///
/// ```text
/// Pending ──confirm──▶ Confirmed ──deliver──▶ Delivered ──receive──▶ Finished
///    │ ╲                  ▲
///    │  ╲revision──▶ Revision ──confirm──┘
///    │                    │
///    └──reject──▶ Rejected ◀──reject──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseOrderStatus {
    Pending,
    Confirmed,
    Rejected,
    Revision,
    Delivered,
    Finished,
}

impl WarehouseOrderStatus {
    pub const ALL: [WarehouseOrderStatus; 6] = [
        WarehouseOrderStatus::Pending,
        WarehouseOrderStatus::Confirmed,
        WarehouseOrderStatus::Rejected,
        WarehouseOrderStatus::Revision,
        WarehouseOrderStatus::Delivered,
        WarehouseOrderStatus::Finished,
    ];

    /// Carts may be replaced and the order deleted only in these states.
    pub fn is_editable(self) -> bool {
        matches!(
            self,
            WarehouseOrderStatus::Pending | WarehouseOrderStatus::Revision
        )
    }
}

impl core::fmt::Display for WarehouseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            WarehouseOrderStatus::Pending => "pending",
            WarehouseOrderStatus::Confirmed => "confirmed",
            WarehouseOrderStatus::Rejected => "rejected",
            WarehouseOrderStatus::Revision => "revision",
            WarehouseOrderStatus::Delivered => "delivered",
            WarehouseOrderStatus::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Status-changing actions on a warehouse order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    RequestRevision,
    Confirm,
    Reject,
    Deliver,
    Receive,
}

impl core::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderAction::RequestRevision => "request revision",
            OrderAction::Confirm => "confirm",
            OrderAction::Reject => "reject",
            OrderAction::Deliver => "deliver",
            OrderAction::Receive => "receive",
        };
        f.write_str(s)
    }
}

impl StateMachine for WarehouseOrderStatus {
    type Action = OrderAction;

    fn transition(self, action: OrderAction) -> DomainResult<Self> {
        use OrderAction as A;
        use WarehouseOrderStatus as S;

        match (self, action) {
            (S::Pending, A::RequestRevision) => Ok(S::Revision),
            (S::Pending | S::Revision, A::Confirm) => Ok(S::Confirmed),
            (S::Pending | S::Revision, A::Reject) => Ok(S::Rejected),
            (S::Confirmed, A::Deliver) => Ok(S::Delivered),
            (S::Delivered, A::Receive) => Ok(S::Finished),
            (from, action) => Err(DomainError::invalid_transition(from, action)),
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            WarehouseOrderStatus::Rejected | WarehouseOrderStatus::Finished
        )
    }
}

/// Requested line: an item and how many units of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(item_id: ItemId, quantity: i64) -> Self {
        Self { item_id, quantity }
    }
}

/// Everything needed to submit a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub id: WarehouseOrderId,
    pub order_number: String,
    pub requested_by: UserId,
    pub division_id: DivisionId,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub carts: Vec<CartLine>,
    pub requested_at: DateTime<Utc>,
}

/// Aggregate root: WarehouseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseOrder {
    id: WarehouseOrderId,
    order_number: String,
    status: WarehouseOrderStatus,
    requested_by: UserId,
    division_id: DivisionId,
    description: Option<String>,
    notes: Option<String>,
    revision_note: Option<String>,
    carts: Vec<CartLine>,
    requested_at: DateTime<Utc>,
    accepted_date: Option<DateTime<Utc>>,
    confirmed_by: Option<UserId>,
    delivered_by: Option<UserId>,
    delivered_at: Option<DateTime<Utc>>,
    delivery_notes: Option<String>,
    received_by: Option<UserId>,
    received_at: Option<DateTime<Utc>>,
    receipt_notes: Option<String>,
    version: u64,
}

impl WarehouseOrder {
    /// Validate and open a new order in `Pending`.
    pub fn submit(request: OrderRequest) -> DomainResult<Self> {
        if request.order_number.trim().is_empty() {
            return Err(DomainError::validation("order number cannot be empty"));
        }
        validate_carts(&request.carts)?;

        Ok(Self {
            id: request.id,
            order_number: request.order_number,
            status: WarehouseOrderStatus::Pending,
            requested_by: request.requested_by,
            division_id: request.division_id,
            description: request.description,
            notes: request.notes,
            revision_note: None,
            carts: request.carts,
            requested_at: request.requested_at,
            accepted_date: None,
            confirmed_by: None,
            delivered_by: None,
            delivered_at: None,
            delivery_notes: None,
            received_by: None,
            received_at: None,
            receipt_notes: None,
            version: 0,
        })
    }

    /// Used by stores when a committed write bumps the row version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn id_typed(&self) -> WarehouseOrderId {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn status(&self) -> WarehouseOrderStatus {
        self.status
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn division_id(&self) -> DivisionId {
        self.division_id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn revision_note(&self) -> Option<&str> {
        self.revision_note.as_deref()
    }

    pub fn carts(&self) -> &[CartLine] {
        &self.carts
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn accepted_date(&self) -> Option<DateTime<Utc>> {
        self.accepted_date
    }

    pub fn confirmed_by(&self) -> Option<UserId> {
        self.confirmed_by
    }

    pub fn delivered_by(&self) -> Option<UserId> {
        self.delivered_by
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn delivery_notes(&self) -> Option<&str> {
        self.delivery_notes.as_deref()
    }

    pub fn received_by(&self) -> Option<UserId> {
        self.received_by
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn receipt_notes(&self) -> Option<&str> {
        self.receipt_notes.as_deref()
    }

    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }

    pub fn ensure_editable(&self) -> DomainResult<()> {
        if self.is_editable() {
            Ok(())
        } else {
            Err(DomainError::order_not_editable(self.status))
        }
    }

    /// Replace the whole cart set (only while editable).
    pub fn replace_carts(
        &mut self,
        carts: Vec<CartLine>,
        description: Option<String>,
        notes: Option<String>,
    ) -> DomainResult<()> {
        self.ensure_editable()?;
        validate_carts(&carts)?;
        self.carts = carts;
        if description.is_some() {
            self.description = description;
        }
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }

    pub fn request_revision(&mut self, note: Option<String>) -> DomainResult<()> {
        self.status = self.status.transition(OrderAction::RequestRevision)?;
        self.revision_note = note;
        Ok(())
    }

    pub fn confirm(&mut self, actor: UserId, at: DateTime<Utc>) -> DomainResult<()> {
        self.status = self.status.transition(OrderAction::Confirm)?;
        self.accepted_date = Some(at);
        self.confirmed_by = Some(actor);
        Ok(())
    }

    /// Reject the order, producing its audit record.
    pub fn reject(
        &mut self,
        reason: &str,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<WarehouseOrderReject> {
        if reason.trim().is_empty() {
            return Err(DomainError::validation("reject reason cannot be empty"));
        }
        self.status = self.status.transition(OrderAction::Reject)?;
        Ok(WarehouseOrderReject::new(
            RejectId::new(),
            self.id,
            reason.trim().to_string(),
            actor,
            at,
        ))
    }

    pub fn mark_delivered(
        &mut self,
        actor: UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.status = self.status.transition(OrderAction::Deliver)?;
        self.delivered_by = Some(actor);
        self.delivered_at = Some(at);
        self.delivery_notes = notes;
        Ok(())
    }

    pub fn mark_received(
        &mut self,
        actor: UserId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.status = self.status.transition(OrderAction::Receive)?;
        self.received_by = Some(actor);
        self.received_at = Some(at);
        self.receipt_notes = notes;
        Ok(())
    }
}

impl AggregateRoot for WarehouseOrder {
    type Id = WarehouseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Cart rules shared by submission and replacement.
pub fn validate_carts(carts: &[CartLine]) -> DomainResult<()> {
    if carts.is_empty() {
        return Err(DomainError::validation("order requires at least one cart line"));
    }
    let mut seen = HashSet::with_capacity(carts.len());
    for line in carts {
        if line.quantity <= 0 {
            return Err(DomainError::invalid_quantity(format!(
                "cart quantity for item {} must be positive",
                line.item_id
            )));
        }
        if !seen.insert(line.item_id) {
            return Err(DomainError::validation(format!(
                "item {} appears in more than one cart line",
                line.item_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(carts: Vec<CartLine>) -> OrderRequest {
        OrderRequest {
            id: WarehouseOrderId::new(),
            order_number: "WO/20261019/0001".to_string(),
            requested_by: UserId::new(),
            division_id: DivisionId::new(),
            description: Some("monthly supplies".to_string()),
            notes: None,
            carts,
            requested_at: Utc::now(),
        }
    }

    fn pending() -> WarehouseOrder {
        WarehouseOrder::submit(request(vec![CartLine::new(ItemId::new(), 2)])).unwrap()
    }

    #[test]
    fn transition_table() {
        use OrderAction as A;
        use WarehouseOrderStatus as S;

        let allowed = [
            (S::Pending, A::RequestRevision, S::Revision),
            (S::Pending, A::Confirm, S::Confirmed),
            (S::Pending, A::Reject, S::Rejected),
            (S::Revision, A::Confirm, S::Confirmed),
            (S::Revision, A::Reject, S::Rejected),
            (S::Confirmed, A::Deliver, S::Delivered),
            (S::Delivered, A::Receive, S::Finished),
        ];
        let actions = [A::RequestRevision, A::Confirm, A::Reject, A::Deliver, A::Receive];

        for from in S::ALL {
            for action in actions {
                let expected = allowed
                    .iter()
                    .find(|(f, a, _)| *f == from && *a == action)
                    .map(|(_, _, to)| *to);
                match expected {
                    Some(to) => assert_eq!(from.transition(action), Ok(to)),
                    None => assert!(matches!(
                        from.transition(action),
                        Err(DomainError::InvalidTransition { .. })
                    )),
                }
            }
        }
        assert!(S::Rejected.is_terminal());
        assert!(S::Finished.is_terminal());
        assert!(!S::Delivered.is_terminal());
    }

    #[test]
    fn submit_requires_positive_unique_lines() {
        assert!(matches!(
            WarehouseOrder::submit(request(vec![])),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            WarehouseOrder::submit(request(vec![CartLine::new(ItemId::new(), 0)])),
            Err(DomainError::InvalidQuantity(_))
        ));
        let item = ItemId::new();
        assert!(matches!(
            WarehouseOrder::submit(request(vec![CartLine::new(item, 1), CartLine::new(item, 2)])),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn submitted_order_is_pending_and_editable() {
        let order = pending();
        assert_eq!(order.status(), WarehouseOrderStatus::Pending);
        assert!(order.is_editable());
        assert_eq!(order.version(), 0);
    }

    #[test]
    fn confirm_stamps_accepted_date() {
        let mut order = pending();
        let approver = UserId::new();
        let at = Utc::now();
        order.confirm(approver, at).unwrap();

        assert_eq!(order.status(), WarehouseOrderStatus::Confirmed);
        assert_eq!(order.accepted_date(), Some(at));
        assert_eq!(order.confirmed_by(), Some(approver));
    }

    #[test]
    fn carts_are_frozen_after_confirmation() {
        let mut order = pending();
        order.confirm(UserId::new(), Utc::now()).unwrap();

        let err = order
            .replace_carts(vec![CartLine::new(ItemId::new(), 5)], None, None)
            .unwrap_err();
        assert_eq!(err, DomainError::order_not_editable("confirmed"));
        assert_eq!(order.carts().len(), 1);
        assert_eq!(order.carts()[0].quantity, 2);
    }

    #[test]
    fn revision_keeps_carts_replaceable() {
        let mut order = pending();
        order.request_revision(Some("split by floor".to_string())).unwrap();
        assert_eq!(order.status(), WarehouseOrderStatus::Revision);

        let line = CartLine::new(ItemId::new(), 9);
        order.replace_carts(vec![line], None, Some("revised".to_string())).unwrap();
        assert_eq!(order.carts(), &[line]);
        assert_eq!(order.notes(), Some("revised"));
        assert_eq!(order.revision_note(), Some("split by floor"));
    }

    #[test]
    fn reject_produces_record_and_requires_reason() {
        let mut order = pending();
        assert!(matches!(
            order.reject("   ", UserId::new(), Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(order.status(), WarehouseOrderStatus::Pending);

        let rejecter = UserId::new();
        let record = order.reject(" out of budget ", rejecter, Utc::now()).unwrap();
        assert_eq!(order.status(), WarehouseOrderStatus::Rejected);
        assert_eq!(record.order_id(), order.id_typed());
        assert_eq!(record.reason(), "out of budget");
        assert_eq!(record.rejected_by(), rejecter);
    }

    #[test]
    fn confirm_on_delivered_is_invalid_and_keeps_status() {
        let mut order = pending();
        order.confirm(UserId::new(), Utc::now()).unwrap();
        order.mark_delivered(UserId::new(), None, Utc::now()).unwrap();

        let err = order.confirm(UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::invalid_transition("delivered", "confirm"));
        assert_eq!(order.status(), WarehouseOrderStatus::Delivered);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(WarehouseOrderStatus::Revision).unwrap(),
            "revision"
        );
    }
}
