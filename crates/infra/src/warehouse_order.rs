//! `WarehouseOrderWorkflow`: division requests against the main warehouse.
//!
//! Every operation checks the actor's capability first, then asks the order's
//! state machine for the transition, then posts any stock movement, all in a
//! single unit of work. `deliver` and `receive` therefore either move every
//! cart line and change the status, or do nothing at all.

use chrono::{DateTime, Utc};

use stockroom_auth::{Actor, Capabilities};
use stockroom_core::{DivisionId, WarehouseOrderId};
use stockroom_inventory::{Location, PostingContext, TransactionReference, TransactionType, ledger};
use stockroom_orders::policy;
use stockroom_orders::{
    CartLine, OrderRequest, WarehouseOrder, WarehouseOrderReject, format_order_number,
    sequence_key, validate_carts,
};

use crate::config::StockroomConfig;
use crate::error::StockError;
use crate::store::StockStore;
use crate::unit_of_work::{UnitOfWork, run_atomically};

/// Cart contents and free-text fields of an order being submitted or edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub carts: Vec<CartLine>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl OrderDraft {
    pub fn new(carts: Vec<CartLine>) -> Self {
        Self {
            carts,
            description: None,
            notes: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug)]
pub struct WarehouseOrderWorkflow<S, C> {
    store: S,
    caps: C,
    config: StockroomConfig,
}

impl<S, C> WarehouseOrderWorkflow<S, C>
where
    S: StockStore,
    C: Capabilities,
{
    pub fn new(store: S, caps: C, config: &StockroomConfig) -> Self {
        Self {
            store,
            caps,
            config: config.clone(),
        }
    }

    pub fn stock_store(&self) -> &S {
        &self.store
    }

    /// Submit a new order in `Pending`. No stock moves at submission.
    pub fn store(
        &self,
        actor: &Actor,
        division_id: DivisionId,
        draft: OrderDraft,
    ) -> Result<WarehouseOrder, StockError> {
        policy::authorize_create(&self.caps, actor, division_id)?;
        validate_carts(&draft.carts)?;
        let now = Utc::now();
        let prefix = self.config.order_number_prefix.as_str();

        let order = self.atomically(|uow| {
            ensure_items_exist(uow, &draft.carts)?;
            let date = now.date_naive();
            let sequence = uow.next_sequence(&sequence_key(prefix, date))?;
            let order = WarehouseOrder::submit(OrderRequest {
                id: WarehouseOrderId::new(),
                order_number: format_order_number(prefix, date, sequence),
                requested_by: actor.user_id,
                division_id,
                description: draft.description.clone(),
                notes: draft.notes.clone(),
                carts: draft.carts.clone(),
                requested_at: now,
            })?;
            let id = order.id_typed();
            uow.insert_order(order);
            uow.committed_order(id)
        })?;

        tracing::info!(
            order_id = %order.id_typed(),
            order_number = order.order_number(),
            division_id = %division_id,
            lines = order.carts().len(),
            actor = %actor.user_id,
            "warehouse order submitted"
        );
        Ok(order)
    }

    /// Replace the cart set wholesale (only while `Pending` or `Revision`).
    pub fn update(
        &self,
        order_id: WarehouseOrderId,
        draft: OrderDraft,
        actor: &Actor,
    ) -> Result<WarehouseOrder, StockError> {
        let order = self.atomically(|uow| {
            policy::authorize_edit(&self.caps, actor, uow.order(order_id)?)?;
            ensure_items_exist(uow, &draft.carts)?;
            uow.order_mut(order_id)?.replace_carts(
                draft.carts.clone(),
                draft.description.clone(),
                draft.notes.clone(),
            )?;
            uow.committed_order(order_id)
        })?;
        Ok(log_transition(order, actor, "warehouse order updated"))
    }

    /// Remove an editable order together with its carts.
    pub fn delete(&self, order_id: WarehouseOrderId, actor: &Actor) -> Result<(), StockError> {
        self.atomically(|uow| {
            let order = uow.order(order_id)?;
            policy::authorize_delete(&self.caps, actor, order)?;
            order.ensure_editable()?;
            uow.delete_order(order_id)
        })?;
        tracing::info!(order_id = %order_id, actor = %actor.user_id, "warehouse order deleted");
        Ok(())
    }

    pub fn request_revision(
        &self,
        order_id: WarehouseOrderId,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<WarehouseOrder, StockError> {
        let order = self.atomically(|uow| {
            policy::authorize_request_revision(&self.caps, actor, uow.order(order_id)?)?;
            uow.order_mut(order_id)?.request_revision(note.clone())?;
            uow.committed_order(order_id)
        })?;
        Ok(log_transition(order, actor, "warehouse order sent back for revision"))
    }

    pub fn confirm(
        &self,
        order_id: WarehouseOrderId,
        actor: &Actor,
    ) -> Result<WarehouseOrder, StockError> {
        let now = Utc::now();
        let order = self.atomically(|uow| {
            policy::authorize_confirm(&self.caps, actor, uow.order(order_id)?)?;
            uow.order_mut(order_id)?.confirm(actor.user_id, now)?;
            uow.committed_order(order_id)
        })?;
        Ok(log_transition(order, actor, "warehouse order confirmed"))
    }

    /// Reject the order and keep the reason as an audit record.
    pub fn reject(
        &self,
        order_id: WarehouseOrderId,
        reason: &str,
        actor: &Actor,
    ) -> Result<WarehouseOrderReject, StockError> {
        let now = Utc::now();
        let (order, reject) = self.atomically(|uow| {
            policy::authorize_reject(&self.caps, actor, uow.order(order_id)?)?;
            let reject = uow.order_mut(order_id)?.reject(reason, actor.user_id, now)?;
            uow.add_reject(reject.clone());
            Ok((uow.committed_order(order_id)?, reject))
        })?;
        log_transition(order, actor, "warehouse order rejected");
        Ok(reject)
    }

    /// Issue every cart line from the main warehouse and mark the order delivered.
    pub fn deliver(
        &self,
        order_id: WarehouseOrderId,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<WarehouseOrder, StockError> {
        let now = Utc::now();
        let order = self.atomically(|uow| {
            let carts = {
                let order = uow.order(order_id)?;
                policy::authorize_deliver(&self.caps, actor, order)?;
                sorted_lines(order)
            };
            uow.order_mut(order_id)?.mark_delivered(actor.user_id, notes.clone(), now)?;

            let ctx = posting_context(uow, order_id, actor, "delivery", now)?;
            for line in &carts {
                ledger::issue(
                    uow,
                    line.item_id,
                    Location::MainWarehouse,
                    line.quantity,
                    TransactionType::OrderFulfillment,
                    &ctx,
                )?;
            }
            uow.committed_order(order_id)
        })?;
        Ok(log_transition(order, actor, "warehouse order delivered"))
    }

    /// Land every cart line in the ordering division's balance and finish the order.
    pub fn receive(
        &self,
        order_id: WarehouseOrderId,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<WarehouseOrder, StockError> {
        let now = Utc::now();
        let order = self.atomically(|uow| {
            let (carts, division_id) = {
                let order = uow.order(order_id)?;
                policy::authorize_receive(&self.caps, actor, order)?;
                (sorted_lines(order), order.division_id())
            };
            uow.order_mut(order_id)?.mark_received(actor.user_id, notes.clone(), now)?;

            let ctx = posting_context(uow, order_id, actor, "receipt", now)?;
            for line in &carts {
                ledger::adjust(
                    uow,
                    line.item_id,
                    Location::Division(division_id),
                    line.quantity,
                    TransactionType::OrderFulfillment,
                    &ctx,
                )?;
            }
            uow.committed_order(order_id)
        })?;
        Ok(log_transition(order, actor, "warehouse order received"))
    }

    fn atomically<T>(
        &self,
        work: impl FnMut(&mut UnitOfWork<'_, S>) -> Result<T, StockError>,
    ) -> Result<T, StockError> {
        run_atomically(&self.store, self.config.conflict_retries, work)
    }
}

/// Log a committed transition and hand the order back to the caller.
fn log_transition(order: WarehouseOrder, actor: &Actor, message: &'static str) -> WarehouseOrder {
    tracing::info!(
        order_id = %order.id_typed(),
        order_number = order.order_number(),
        status = %order.status(),
        actor = %actor.user_id,
        "{message}"
    );
    order
}

fn ensure_items_exist<S>(uow: &mut UnitOfWork<'_, S>, carts: &[CartLine]) -> Result<(), StockError>
where
    S: StockStore + ?Sized,
{
    for line in carts {
        uow.item(line.item_id)?;
    }
    Ok(())
}

/// Cart lines in item-id order, so postings touch items deterministically.
fn sorted_lines(order: &WarehouseOrder) -> Vec<CartLine> {
    let mut lines = order.carts().to_vec();
    lines.sort_by_key(|line| line.item_id);
    lines
}

fn posting_context<S>(
    uow: &mut UnitOfWork<'_, S>,
    order_id: WarehouseOrderId,
    actor: &Actor,
    what: &str,
    at: DateTime<Utc>,
) -> Result<PostingContext, StockError>
where
    S: StockStore + ?Sized,
{
    let number = uow.order(order_id)?.order_number().to_string();
    Ok(
        PostingContext::new(actor.user_id, format!("{what} of warehouse order {number}"), at)
            .with_reference(TransactionReference::WarehouseOrder(order_id)),
    )
}
