//! `StockLedger` service: the only entry point that changes item balances.

use chrono::Utc;

use stockroom_auth::permissions::{ITEM_ADJUST, ITEM_CONVERT, ITEM_ISSUE};
use stockroom_auth::{Actor, Capabilities, authorize};
use stockroom_core::ItemId;
use stockroom_inventory::{
    ConversionPosting, Location, PostingContext, StockTransaction, TransactionType, ledger,
};

use crate::config::StockroomConfig;
use crate::error::StockError;
use crate::store::StockStore;
use crate::unit_of_work::run_atomically;

/// Authorized, atomic ledger postings.
///
/// Each call is one unit of work: the balance change and its ledger entry
/// commit together, and concurrent postings against the same item are
/// serialized by the store's version check.
#[derive(Debug)]
pub struct StockLedger<S, C> {
    store: S,
    caps: C,
    conflict_retries: u32,
}

impl<S, C> StockLedger<S, C>
where
    S: StockStore,
    C: Capabilities,
{
    pub fn new(store: S, caps: C, config: &StockroomConfig) -> Self {
        Self {
            store,
            caps,
            conflict_retries: config.conflict_retries,
        }
    }

    pub fn stock_store(&self) -> &S {
        &self.store
    }

    /// Take `quantity` out of `location`, logged as an `Issue`.
    pub fn issue(
        &self,
        item_id: ItemId,
        location: Location,
        quantity: i64,
        description: &str,
        actor: &Actor,
    ) -> Result<StockTransaction, StockError> {
        authorize(&self.caps, actor, &ITEM_ISSUE)?;
        let ctx = PostingContext::new(actor.user_id, description, Utc::now());

        let txn = run_atomically(&self.store, self.conflict_retries, |uow| {
            ledger::issue(uow, item_id, location, quantity, TransactionType::Issue, &ctx)
        })?;

        tracing::info!(
            item_id = %item_id,
            location = %location,
            quantity,
            balance_after = txn.balance_after(),
            actor = %actor.user_id,
            "stock issued"
        );
        Ok(txn)
    }

    /// Apply a signed correction to `location`.
    pub fn adjust(
        &self,
        item_id: ItemId,
        location: Location,
        delta: i64,
        kind: TransactionType,
        description: &str,
        actor: &Actor,
    ) -> Result<StockTransaction, StockError> {
        authorize(&self.caps, actor, &ITEM_ADJUST)?;
        let ctx = PostingContext::new(actor.user_id, description, Utc::now());

        let txn = run_atomically(&self.store, self.conflict_retries, |uow| {
            ledger::adjust(uow, item_id, location, delta, kind, &ctx)
        })?;

        tracing::info!(
            item_id = %item_id,
            location = %location,
            delta,
            kind = %kind,
            balance_after = txn.balance_after(),
            actor = %actor.user_id,
            "stock adjusted"
        );
        Ok(txn)
    }

    /// Break `quantity` bulk units of `source_id` into its reference item.
    pub fn convert(
        &self,
        source_id: ItemId,
        location: Location,
        quantity: i64,
        actor: &Actor,
    ) -> Result<ConversionPosting, StockError> {
        authorize(&self.caps, actor, &ITEM_CONVERT)?;
        let ctx = PostingContext::new(
            actor.user_id,
            format!("conversion of {quantity} unit(s)"),
            Utc::now(),
        );

        let posting = run_atomically(&self.store, self.conflict_retries, |uow| {
            ledger::convert(uow, source_id, location, quantity, &ctx)
        })?;

        tracing::info!(
            item_id = %source_id,
            reference_item_id = %posting.incoming.item_id(),
            location = %location,
            quantity,
            produced = posting.incoming.quantity(),
            actor = %actor.user_id,
            "stock converted"
        );
        Ok(posting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stockroom_auth::DirectGrants;
    use stockroom_auth::permissions::WILDCARD;
    use stockroom_core::{DomainError, UserId};
    use stockroom_inventory::Item;

    use crate::store::InMemoryStockStore;

    fn service() -> StockLedger<Arc<InMemoryStockStore>, DirectGrants> {
        StockLedger::new(
            Arc::new(InMemoryStockStore::new()),
            DirectGrants,
            &StockroomConfig::default(),
        )
    }

    fn seed(ledger: &StockLedger<Arc<InMemoryStockStore>, DirectGrants>, stock: i64) -> ItemId {
        let item = Item::new(ItemId::new(), "Marker", "pcs")
            .unwrap()
            .with_opening_stock(Location::MainWarehouse, stock)
            .unwrap();
        let id = item.id_typed();
        ledger.stock_store().insert_item(item).unwrap();
        id
    }

    #[test]
    fn issue_requires_permission() {
        let ledger = service();
        let id = seed(&ledger, 5);
        let clerk = Actor::new(UserId::new(), None);

        let err = ledger
            .issue(id, Location::MainWarehouse, 1, "pens for HR", &clerk)
            .unwrap_err();
        assert!(matches!(
            err,
            StockError::Domain(DomainError::Unauthorized { .. })
        ));
        assert_eq!(ledger.stock_store().load_item(id).unwrap().unwrap().stock(), 5);
    }

    #[test]
    fn issue_persists_balance_and_entry() {
        let ledger = service();
        let id = seed(&ledger, 5);
        let clerk = Actor::new(UserId::new(), None).with_permissions([ITEM_ISSUE]);

        let txn = ledger
            .issue(id, Location::MainWarehouse, 2, "pens for HR", &clerk)
            .unwrap();

        assert_eq!(txn.kind(), TransactionType::Issue);
        assert_eq!(txn.description(), "pens for HR");
        assert_eq!(txn.actor(), clerk.user_id);
        assert_eq!(ledger.stock_store().load_item(id).unwrap().unwrap().stock(), 3);
        assert_eq!(ledger.stock_store().list_transactions().unwrap(), vec![txn]);
    }

    #[test]
    fn adjust_and_convert_with_wildcard() {
        let ledger = service();
        let piece = seed(&ledger, 0);
        let boxed = Item::new(ItemId::new(), "Marker box", "box")
            .unwrap()
            .with_conversion(12, piece)
            .unwrap();
        let box_id = boxed.id_typed();
        ledger.stock_store().insert_item(boxed).unwrap();
        let admin = Actor::new(UserId::new(), None).with_permissions([WILDCARD]);

        ledger
            .adjust(box_id, Location::MainWarehouse, 2, TransactionType::OpnameAdjustment, "found", &admin)
            .unwrap();
        let posting = ledger.convert(box_id, Location::MainWarehouse, 2, &admin).unwrap();

        assert_eq!(posting.incoming.quantity(), 24);
        assert_eq!(ledger.stock_store().load_item(box_id).unwrap().unwrap().stock(), 0);
        assert_eq!(ledger.stock_store().load_item(piece).unwrap().unwrap().stock(), 24);
    }
}
