//! Persistence boundary for items, orders, opname sessions and the ledger.
//!
//! Stores make no assumptions about storage technology. Writes arrive as one
//! [`ChangeSet`] per unit of work and are applied all together or not at all.

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use stockroom_core::{ExpectedVersion, ItemId, OpnameId, WarehouseOrderId};
use stockroom_inventory::{Item, StockTransaction};
use stockroom_opname::StockOpname;
use stockroom_orders::{WarehouseOrder, WarehouseOrderReject};

pub use in_memory::InMemoryStockStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A staged row no longer has the version it was read at.
    #[error("optimistic concurrency conflict: {0}")]
    Conflict(String),

    /// A previous writer panicked while holding the store.
    #[error("store lock poisoned")]
    Poisoned,

    /// A staged update targets a row that does not exist.
    #[error("row missing: {0}")]
    Missing(String),
}

/// A row together with the version the unit of work read it at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged<T> {
    pub row: T,
    pub expected: ExpectedVersion,
}

/// Everything one unit of work wants to persist.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    pub items: Vec<Staged<Item>>,
    pub orders: Vec<Staged<WarehouseOrder>>,
    pub opnames: Vec<Staged<StockOpname>>,
    pub deleted_orders: Vec<(WarehouseOrderId, ExpectedVersion)>,
    pub deleted_opnames: Vec<(OpnameId, ExpectedVersion)>,
    pub transactions: Vec<StockTransaction>,
    pub rejects: Vec<WarehouseOrderReject>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.orders.is_empty()
            && self.opnames.is_empty()
            && self.deleted_orders.is_empty()
            && self.deleted_opnames.is_empty()
            && self.transactions.is_empty()
            && self.rejects.is_empty()
    }
}

/// Storage for the stock core.
///
/// Reads return the last committed state. `commit` verifies every expected
/// version in the change set, bumps the version of every written row by one,
/// and applies everything atomically; on any mismatch nothing is applied.
pub trait StockStore: Send + Sync {
    fn load_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    fn load_order(&self, id: WarehouseOrderId) -> Result<Option<WarehouseOrder>, StoreError>;

    fn load_opname(&self, id: OpnameId) -> Result<Option<StockOpname>, StoreError>;

    fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    fn list_orders(&self) -> Result<Vec<WarehouseOrder>, StoreError>;

    fn list_opnames(&self) -> Result<Vec<StockOpname>, StoreError>;

    /// Ledger entries in commit order.
    fn list_transactions(&self) -> Result<Vec<StockTransaction>, StoreError>;

    fn list_rejects(&self, order_id: WarehouseOrderId)
    -> Result<Vec<WarehouseOrderReject>, StoreError>;

    /// Allocate the next value (starting at 1) of the named counter.
    ///
    /// Allocation is immediate and independent of any change set, so an
    /// aborted unit of work leaves a gap.
    fn next_sequence(&self, key: &str) -> Result<u64, StoreError>;

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn load_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).load_item(id)
    }

    fn load_order(&self, id: WarehouseOrderId) -> Result<Option<WarehouseOrder>, StoreError> {
        (**self).load_order(id)
    }

    fn load_opname(&self, id: OpnameId) -> Result<Option<StockOpname>, StoreError> {
        (**self).load_opname(id)
    }

    fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        (**self).list_items()
    }

    fn list_orders(&self) -> Result<Vec<WarehouseOrder>, StoreError> {
        (**self).list_orders()
    }

    fn list_opnames(&self) -> Result<Vec<StockOpname>, StoreError> {
        (**self).list_opnames()
    }

    fn list_transactions(&self) -> Result<Vec<StockTransaction>, StoreError> {
        (**self).list_transactions()
    }

    fn list_rejects(
        &self,
        order_id: WarehouseOrderId,
    ) -> Result<Vec<WarehouseOrderReject>, StoreError> {
        (**self).list_rejects(order_id)
    }

    fn next_sequence(&self, key: &str) -> Result<u64, StoreError> {
        (**self).next_sequence(key)
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        (**self).commit(changes)
    }
}
