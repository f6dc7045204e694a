//! Unit of work with optimistic retry.
//!
//! A [`UnitOfWork`] reads rows lazily from the store and stages every change
//! together with the version the row was read at. [`run_atomically`] commits
//! the staged [`ChangeSet`] in one call; if any row moved underneath it the
//! whole closure is re-run against fresh state.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use stockroom_core::{
    AggregateRoot, DomainError, ExpectedVersion, ItemId, OpnameId, WarehouseOrderId,
};
use stockroom_inventory::{Item, ItemCatalog, StockTransaction, StockWriter};
use stockroom_opname::StockOpname;
use stockroom_orders::{WarehouseOrder, WarehouseOrderReject};

use crate::error::StockError;
use crate::store::{ChangeSet, Staged, StockStore, StoreError};

#[derive(Debug, Clone)]
struct Tracked<T> {
    row: T,
    expected: ExpectedVersion,
    dirty: bool,
}

impl<T: AggregateRoot> Tracked<T> {
    fn loaded(row: T) -> Self {
        Self {
            expected: ExpectedVersion::Exact(row.version()),
            row,
            dirty: false,
        }
    }

    fn created(row: T) -> Self {
        Self {
            row,
            expected: ExpectedVersion::NEW,
            dirty: true,
        }
    }

    /// Version the row carries once this unit commits.
    fn committed_version(&self) -> u64 {
        self.row.version() + u64::from(self.dirty)
    }

    fn into_staged(self) -> Option<Staged<T>> {
        self.dirty.then_some(Staged {
            row: self.row,
            expected: self.expected,
        })
    }
}

fn track<'m, K, T>(
    rows: &'m mut BTreeMap<K, Tracked<T>>,
    id: K,
    what: &str,
    load: impl FnOnce(K) -> Result<Option<T>, StoreError>,
) -> Result<&'m mut Tracked<T>, StockError>
where
    K: Ord + Copy + core::fmt::Display,
    T: AggregateRoot,
{
    match rows.entry(id) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let row = load(id)?.ok_or_else(|| DomainError::not_found(format!("{what} {id}")))?;
            Ok(entry.insert(Tracked::loaded(row)))
        }
    }
}

/// Staged reads and writes of one atomic operation.
pub struct UnitOfWork<'s, S: ?Sized> {
    store: &'s S,
    items: BTreeMap<ItemId, Tracked<Item>>,
    orders: BTreeMap<WarehouseOrderId, Tracked<WarehouseOrder>>,
    opnames: BTreeMap<OpnameId, Tracked<StockOpname>>,
    deleted_orders: Vec<(WarehouseOrderId, ExpectedVersion)>,
    deleted_opnames: Vec<(OpnameId, ExpectedVersion)>,
    transactions: Vec<StockTransaction>,
    rejects: Vec<WarehouseOrderReject>,
}

impl<'s, S> UnitOfWork<'s, S>
where
    S: StockStore + ?Sized,
{
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            items: BTreeMap::new(),
            orders: BTreeMap::new(),
            opnames: BTreeMap::new(),
            deleted_orders: Vec::new(),
            deleted_opnames: Vec::new(),
            transactions: Vec::new(),
            rejects: Vec::new(),
        }
    }

    /// Read an item as seen by this unit of work (`NotFound` if absent).
    pub fn item(&mut self, id: ItemId) -> Result<&Item, StockError> {
        let store = self.store;
        Ok(&track(&mut self.items, id, "item", |id| store.load_item(id))?.row)
    }

    pub fn order(&mut self, id: WarehouseOrderId) -> Result<&WarehouseOrder, StockError> {
        let store = self.store;
        Ok(&track(&mut self.orders, id, "warehouse order", |id| store.load_order(id))?.row)
    }

    /// Mutable order handle; the order is written back on commit.
    pub fn order_mut(&mut self, id: WarehouseOrderId) -> Result<&mut WarehouseOrder, StockError> {
        let store = self.store;
        let tracked = track(&mut self.orders, id, "warehouse order", |id| store.load_order(id))?;
        tracked.dirty = true;
        Ok(&mut tracked.row)
    }

    /// The order as it will read right after this unit commits.
    pub fn committed_order(&mut self, id: WarehouseOrderId) -> Result<WarehouseOrder, StockError> {
        let store = self.store;
        let tracked = track(&mut self.orders, id, "warehouse order", |id| store.load_order(id))?;
        Ok(tracked.row.clone().with_version(tracked.committed_version()))
    }

    pub fn insert_order(&mut self, order: WarehouseOrder) {
        self.orders
            .insert(order.id_typed(), Tracked::created(order));
    }

    /// Remove an order (and its reject records) on commit.
    pub fn delete_order(&mut self, id: WarehouseOrderId) -> Result<(), StockError> {
        let store = self.store;
        let expected = track(&mut self.orders, id, "warehouse order", |id| store.load_order(id))?
            .expected;
        self.orders.remove(&id);
        self.deleted_orders.push((id, expected));
        Ok(())
    }

    pub fn opname(&mut self, id: OpnameId) -> Result<&StockOpname, StockError> {
        let store = self.store;
        Ok(&track(&mut self.opnames, id, "stock opname", |id| store.load_opname(id))?.row)
    }

    /// Mutable session handle; the session is written back on commit.
    pub fn opname_mut(&mut self, id: OpnameId) -> Result<&mut StockOpname, StockError> {
        let store = self.store;
        let tracked = track(&mut self.opnames, id, "stock opname", |id| store.load_opname(id))?;
        tracked.dirty = true;
        Ok(&mut tracked.row)
    }

    /// The session as it will read right after this unit commits.
    pub fn committed_opname(&mut self, id: OpnameId) -> Result<StockOpname, StockError> {
        let store = self.store;
        let tracked = track(&mut self.opnames, id, "stock opname", |id| store.load_opname(id))?;
        Ok(tracked.row.clone().with_version(tracked.committed_version()))
    }

    pub fn insert_opname(&mut self, opname: StockOpname) {
        self.opnames
            .insert(opname.id_typed(), Tracked::created(opname));
    }

    pub fn delete_opname(&mut self, id: OpnameId) -> Result<(), StockError> {
        let store = self.store;
        let expected = track(&mut self.opnames, id, "stock opname", |id| store.load_opname(id))?
            .expected;
        self.opnames.remove(&id);
        self.deleted_opnames.push((id, expected));
        Ok(())
    }

    pub fn add_reject(&mut self, reject: WarehouseOrderReject) {
        self.rejects.push(reject);
    }

    pub fn next_sequence(&self, key: &str) -> Result<u64, StockError> {
        Ok(self.store.next_sequence(key)?)
    }

    /// Ledger entries staged so far.
    pub fn staged_transactions(&self) -> &[StockTransaction] {
        &self.transactions
    }

    pub fn into_changes(self) -> ChangeSet {
        ChangeSet {
            items: self.items.into_values().filter_map(Tracked::into_staged).collect(),
            orders: self.orders.into_values().filter_map(Tracked::into_staged).collect(),
            opnames: self.opnames.into_values().filter_map(Tracked::into_staged).collect(),
            deleted_orders: self.deleted_orders,
            deleted_opnames: self.deleted_opnames,
            transactions: self.transactions,
            rejects: self.rejects,
        }
    }
}

impl<S> ItemCatalog for UnitOfWork<'_, S>
where
    S: StockStore + ?Sized,
{
    type Error = StockError;

    fn find_item(&self, id: ItemId) -> Result<Option<Item>, StockError> {
        match self.items.get(&id) {
            Some(tracked) => Ok(Some(tracked.row.clone())),
            None => Ok(self.store.load_item(id)?),
        }
    }
}

impl<S> StockWriter for UnitOfWork<'_, S>
where
    S: StockStore + ?Sized,
{
    fn item_mut(&mut self, id: ItemId) -> Result<&mut Item, StockError> {
        let store = self.store;
        let tracked = track(&mut self.items, id, "item", |id| store.load_item(id))?;
        tracked.dirty = true;
        Ok(&mut tracked.row)
    }

    fn record(&mut self, transaction: StockTransaction) {
        self.transactions.push(transaction);
    }
}

/// Run `work` inside a unit of work and commit it.
///
/// Domain errors abort immediately with nothing committed. A version
/// conflict at commit re-runs `work` from scratch, at most `conflict_retries`
/// times, before the conflict is returned to the caller.
pub fn run_atomically<S, T, F>(store: &S, conflict_retries: u32, mut work: F) -> Result<T, StockError>
where
    S: StockStore + ?Sized,
    F: FnMut(&mut UnitOfWork<'_, S>) -> Result<T, StockError>,
{
    let mut attempt = 0u32;
    loop {
        let mut uow = UnitOfWork::new(store);
        let output = work(&mut uow)?;

        match store.commit(uow.into_changes()) {
            Ok(()) => return Ok(output),
            Err(StoreError::Conflict(reason)) if attempt < conflict_retries => {
                attempt += 1;
                tracing::debug!(attempt, %reason, "unit of work conflicted; retrying");
            }
            Err(StoreError::Conflict(reason)) => {
                tracing::warn!(attempts = attempt + 1, %reason, "unit of work conflict retries exhausted");
                return Err(StoreError::Conflict(reason).into());
            }
            Err(err) => return Err(err.into()),
        }
    }
}
