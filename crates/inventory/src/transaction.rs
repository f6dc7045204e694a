use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ItemId, OpnameId, TransactionId, UserId, WarehouseOrderId};

use crate::item::Location;

/// What kind of mutation a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Issue,
    ConversionIn,
    ConversionOut,
    OpnameAdjustment,
    OrderFulfillment,
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            TransactionType::Issue => "issue",
            TransactionType::ConversionIn => "conversion_in",
            TransactionType::ConversionOut => "conversion_out",
            TransactionType::OpnameAdjustment => "opname_adjustment",
            TransactionType::OrderFulfillment => "order_fulfillment",
        };
        f.write_str(s)
    }
}

/// The workflow document a ledger entry was posted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionReference {
    WarehouseOrder(WarehouseOrderId),
    StockOpname(OpnameId),
}

/// Immutable ledger entry. One per balance mutation; never edited or deleted.
///
/// `quantity` is the signed delta applied to the balance at `location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    id: TransactionId,
    item_id: ItemId,
    location: Location,
    kind: TransactionType,
    quantity: i64,
    balance_after: i64,
    actor: UserId,
    description: String,
    reference: Option<TransactionReference>,
    occurred_at: DateTime<Utc>,
}

impl StockTransaction {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        item_id: ItemId,
        location: Location,
        kind: TransactionType,
        quantity: i64,
        balance_after: i64,
        actor: UserId,
        description: String,
        reference: Option<TransactionReference>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            item_id,
            location,
            kind,
            quantity,
            balance_after,
            actor,
            description,
            reference,
            occurred_at,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn kind(&self) -> TransactionType {
        self.kind
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn balance_after(&self) -> i64 {
        self.balance_after
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn reference(&self) -> Option<TransactionReference> {
        self.reference
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kind_and_location_in_snake_case() {
        let txn = StockTransaction::new(
            ItemId::new(),
            Location::MainWarehouse,
            TransactionType::OpnameAdjustment,
            -5,
            45,
            UserId::new(),
            "count correction".to_string(),
            None,
            Utc::now(),
        );

        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["kind"], "opname_adjustment");
        assert_eq!(json["location"], "main_warehouse");
        assert_eq!(json["quantity"], -5);
    }
}
