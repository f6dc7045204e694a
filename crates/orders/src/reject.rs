use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{RejectId, UserId, WarehouseOrderId};

/// Audit record of one rejection. Created once per rejection; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseOrderReject {
    id: RejectId,
    order_id: WarehouseOrderId,
    reason: String,
    rejected_by: UserId,
    rejected_at: DateTime<Utc>,
}

impl WarehouseOrderReject {
    pub(crate) fn new(
        id: RejectId,
        order_id: WarehouseOrderId,
        reason: String,
        rejected_by: UserId,
        rejected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            reason,
            rejected_by,
            rejected_at,
        }
    }

    pub fn id(&self) -> RejectId {
        self.id
    }

    pub fn order_id(&self) -> WarehouseOrderId {
        self.order_id
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn rejected_by(&self) -> UserId {
        self.rejected_by
    }

    pub fn rejected_at(&self) -> DateTime<Utc> {
        self.rejected_at
    }
}
