use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use stockroom_core::{AggregateRoot, ExpectedVersion, ItemId, OpnameId, WarehouseOrderId};
use stockroom_inventory::{Item, StockTransaction};
use stockroom_opname::StockOpname;
use stockroom_orders::{WarehouseOrder, WarehouseOrderReject};

use super::{ChangeSet, Staged, StockStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    orders: BTreeMap<WarehouseOrderId, WarehouseOrder>,
    opnames: BTreeMap<OpnameId, StockOpname>,
    transactions: Vec<StockTransaction>,
    rejects: Vec<WarehouseOrderReject>,
    sequences: HashMap<String, u64>,
}

/// In-memory stock store.
///
/// Intended for tests/dev. One write lock covers a whole commit, so a change
/// set is either fully visible to readers or not at all.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    tables: RwLock<Tables>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a new item (master data is maintained outside the stock core).
    pub fn insert_item(&self, item: Item) -> Result<(), StoreError> {
        self.commit(ChangeSet {
            items: vec![Staged {
                row: item,
                expected: ExpectedVersion::NEW,
            }],
            ..ChangeSet::default()
        })
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }
}

/// Rows whose version the store owns.
trait Versioned: AggregateRoot + Sized {
    fn at_version(self, version: u64) -> Self;
}

impl Versioned for Item {
    fn at_version(self, version: u64) -> Self {
        self.with_version(version)
    }
}

impl Versioned for WarehouseOrder {
    fn at_version(self, version: u64) -> Self {
        self.with_version(version)
    }
}

impl Versioned for StockOpname {
    fn at_version(self, version: u64) -> Self {
        self.with_version(version)
    }
}

fn verify<T>(
    table: &BTreeMap<T::Id, T>,
    id: &T::Id,
    expected: ExpectedVersion,
) -> Result<u64, StoreError>
where
    T: Versioned,
    T::Id: Ord,
{
    let current = table.get(id).map(|row| row.version()).unwrap_or(0);
    if current == 0 && matches!(expected, ExpectedVersion::Exact(v) if v > 0) {
        return Err(StoreError::Missing(format!("{id:?}")));
    }
    if !expected.matches(current) {
        return Err(StoreError::Conflict(format!(
            "{id:?}: expected {expected:?}, found {current}"
        )));
    }
    Ok(current)
}

fn verify_staged<T>(table: &BTreeMap<T::Id, T>, staged: &[Staged<T>]) -> Result<(), StoreError>
where
    T: Versioned,
    T::Id: Ord,
{
    for s in staged {
        verify(table, s.row.id(), s.expected)?;
    }
    Ok(())
}

fn verify_deleted<T>(
    table: &BTreeMap<T::Id, T>,
    deleted: &[(T::Id, ExpectedVersion)],
) -> Result<(), StoreError>
where
    T: Versioned,
    T::Id: Ord,
{
    for (id, expected) in deleted {
        if !table.contains_key(id) {
            return Err(StoreError::Missing(format!("{id:?}")));
        }
        verify(table, id, *expected)?;
    }
    Ok(())
}

fn apply<T>(table: &mut BTreeMap<T::Id, T>, staged: Vec<Staged<T>>)
where
    T: Versioned,
    T::Id: Ord,
{
    for Staged { row, .. } in staged {
        let next = table.get(row.id()).map(|r| r.version()).unwrap_or(0) + 1;
        let row = row.at_version(next);
        table.insert(row.id().clone(), row);
    }
}

impl StockStore for InMemoryStockStore {
    fn load_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    fn load_order(&self, id: WarehouseOrderId) -> Result<Option<WarehouseOrder>, StoreError> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    fn load_opname(&self, id: OpnameId) -> Result<Option<StockOpname>, StoreError> {
        Ok(self.read()?.opnames.get(&id).cloned())
    }

    fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    fn list_orders(&self) -> Result<Vec<WarehouseOrder>, StoreError> {
        Ok(self.read()?.orders.values().cloned().collect())
    }

    fn list_opnames(&self) -> Result<Vec<StockOpname>, StoreError> {
        Ok(self.read()?.opnames.values().cloned().collect())
    }

    fn list_transactions(&self) -> Result<Vec<StockTransaction>, StoreError> {
        Ok(self.read()?.transactions.clone())
    }

    fn list_rejects(
        &self,
        order_id: WarehouseOrderId,
    ) -> Result<Vec<WarehouseOrderReject>, StoreError> {
        Ok(self
            .read()?
            .rejects
            .iter()
            .filter(|r| r.order_id() == order_id)
            .cloned()
            .collect())
    }

    fn next_sequence(&self, key: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let counter = tables.sequences.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;

        // Verify everything before touching anything.
        verify_staged(&tables.items, &changes.items)?;
        verify_staged(&tables.orders, &changes.orders)?;
        verify_staged(&tables.opnames, &changes.opnames)?;
        verify_deleted(&tables.orders, &changes.deleted_orders)?;
        verify_deleted(&tables.opnames, &changes.deleted_opnames)?;

        let ChangeSet {
            items,
            orders,
            opnames,
            deleted_orders,
            deleted_opnames,
            transactions,
            rejects,
        } = changes;

        apply(&mut tables.items, items);
        apply(&mut tables.orders, orders);
        apply(&mut tables.opnames, opnames);
        for (id, _) in deleted_orders {
            tables.orders.remove(&id);
            tables.rejects.retain(|r| r.order_id() != id);
        }
        for (id, _) in deleted_opnames {
            tables.opnames.remove(&id);
        }
        tables.transactions.extend(transactions);
        tables.rejects.extend(rejects);
        Ok(())
    }
}
