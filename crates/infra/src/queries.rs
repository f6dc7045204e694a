//! Read-side projections for listing screens and dashboards.
//!
//! Queries read committed state only and never take part in a unit of work.

use serde::Serialize;

use stockroom_core::{DivisionId, ItemId, WarehouseOrderId};
use stockroom_inventory::{Location, StockTransaction, TransactionReference};
use stockroom_opname::{OpnameScope, OpnameView, StockOpname};
use stockroom_orders::{WarehouseOrder, WarehouseOrderReject, WarehouseOrderStatus};

use crate::error::StockError;
use crate::store::StockStore;

/// An item offered for counting, with its balance in the session's scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpnameCandidate {
    pub item_id: ItemId,
    pub name: String,
    pub unit: String,
    pub stock: i64,
}

/// Order listing filter; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<WarehouseOrderStatus>,
    pub division_id: Option<DivisionId>,
}

impl OrderFilter {
    pub fn status(status: WarehouseOrderStatus) -> Self {
        Self {
            status: Some(status),
            division_id: None,
        }
    }

    pub fn division(mut self, division_id: DivisionId) -> Self {
        self.division_id = Some(division_id);
        self
    }

    fn matches(&self, order: &WarehouseOrder) -> bool {
        self.status.is_none_or(|s| s == order.status())
            && self.division_id.is_none_or(|d| d == order.division_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: WarehouseOrderStatus,
    pub count: usize,
}

#[derive(Debug)]
pub struct StockQueries<S> {
    store: S,
}

impl<S: StockStore> StockQueries<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Items that can be counted in `scope`.
    ///
    /// The warehouse scope offers every item; a division scope offers the
    /// items that division has ever held a balance for.
    pub fn items_for_opname(&self, scope: OpnameScope) -> Result<Vec<OpnameCandidate>, StockError> {
        let location = Location::from(scope.division_id());
        let mut items: Vec<OpnameCandidate> = self
            .store
            .list_items()?
            .into_iter()
            .filter(|item| location == Location::MainWarehouse || item.is_stocked_at(location))
            .map(|item| OpnameCandidate {
                item_id: item.id_typed(),
                name: item.name().to_string(),
                unit: item.unit().to_string(),
                stock: item.stock_at(location),
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// Sessions visible under `view`, newest opname date first.
    pub fn opnames(&self, view: OpnameView) -> Result<Vec<StockOpname>, StockError> {
        let mut opnames: Vec<StockOpname> = self
            .store
            .list_opnames()?
            .into_iter()
            .filter(|o| view.includes(o.scope()))
            .collect();
        opnames.sort_by(|a, b| b.opname_date().cmp(&a.opname_date()));
        Ok(opnames)
    }

    /// Orders matching `filter`, most recently requested first.
    pub fn orders(&self, filter: OrderFilter) -> Result<Vec<WarehouseOrder>, StockError> {
        let mut orders: Vec<WarehouseOrder> = self
            .store
            .list_orders()?
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect();
        orders.sort_by(|a, b| b.requested_at().cmp(&a.requested_at()));
        Ok(orders)
    }

    /// Per-status totals for a dashboard, in lifecycle order (zeros included).
    pub fn status_counts(
        &self,
        division_id: Option<DivisionId>,
    ) -> Result<Vec<StatusCount>, StockError> {
        let orders = self.store.list_orders()?;
        Ok(WarehouseOrderStatus::ALL
            .iter()
            .map(|&status| StatusCount {
                status,
                count: orders
                    .iter()
                    .filter(|o| o.status() == status)
                    .filter(|o| division_id.is_none_or(|d| d == o.division_id()))
                    .count(),
            })
            .collect())
    }

    pub fn ledger_for_item(&self, item_id: ItemId) -> Result<Vec<StockTransaction>, StockError> {
        Ok(self
            .store
            .list_transactions()?
            .into_iter()
            .filter(|t| t.item_id() == item_id)
            .collect())
    }

    /// Entries posted on behalf of one order or opname session.
    pub fn ledger_for_reference(
        &self,
        reference: TransactionReference,
    ) -> Result<Vec<StockTransaction>, StockError> {
        Ok(self
            .store
            .list_transactions()?
            .into_iter()
            .filter(|t| t.reference() == Some(reference))
            .collect())
    }

    pub fn rejects(&self, order_id: WarehouseOrderId) -> Result<Vec<WarehouseOrderReject>, StockError> {
        Ok(self.store.list_rejects(order_id)?)
    }
}
