//! `StockOpnameWorkflow`: physical count sessions and their ledger corrections.

use chrono::{NaiveDate, Utc};

use stockroom_auth::{Actor, Capabilities};
use stockroom_core::{DomainError, ItemId, OpnameId};
use stockroom_inventory::{Location, PostingContext, TransactionReference, TransactionType, ledger};
use stockroom_opname::policy;
use stockroom_opname::{
    FinalValue, OpnameRequest, OpnameStatus, PhysicalCount, ScopeKind, StockOpname,
};

use crate::config::StockroomConfig;
use crate::error::StockError;
use crate::store::StockStore;
use crate::unit_of_work::{UnitOfWork, run_atomically};

#[derive(Debug)]
pub struct StockOpnameWorkflow<S, C> {
    store: S,
    caps: C,
    conflict_retries: u32,
}

impl<S, C> StockOpnameWorkflow<S, C>
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

    /// Open a session, snapshotting each selected item's balance in the scope.
    pub fn initialize_opname(
        &self,
        scope: ScopeKind,
        item_ids: &[ItemId],
        opname_date: NaiveDate,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<StockOpname, StockError> {
        let scope = policy::resolve_scope(scope, actor)?;
        policy::authorize_initialize(&self.caps, actor, scope)?;
        if item_ids.is_empty() {
            return Err(DomainError::EmptyOpname.into());
        }
        let location = Location::from(scope.division_id());

        let opname = self.atomically(|uow| {
            let mut snapshots = Vec::with_capacity(item_ids.len());
            for &item_id in item_ids {
                snapshots.push((item_id, uow.item(item_id)?.stock_at(location)));
            }
            let opname = StockOpname::initialize(OpnameRequest {
                id: OpnameId::new(),
                opname_date,
                owner: actor.user_id,
                scope,
                notes: notes.clone(),
                snapshots,
            })?;
            let id = opname.id_typed();
            uow.insert_opname(opname);
            uow.committed_opname(id)
        })?;

        tracing::info!(
            opname_id = %opname.id_typed(),
            scope = ?opname.scope(),
            lines = opname.items().len(),
            actor = %actor.user_id,
            "stock opname initialized"
        );
        Ok(opname)
    }

    /// Record physical counts.
    ///
    /// `status` is the state the caller wants to reach: `Processing` keeps the
    /// session open for more counting, `Confirmed` finalizes right after the
    /// counts are saved, with every final value defaulting to its count.
    ///
    /// Saving and finalizing are two separate commits. If finalization fails
    /// (a final value that would drive a balance negative, a lost race with
    /// another finalizer) the error is returned but the counts stay saved and
    /// the session stays `Processing`. Retry with [`Self::finalize_stock`];
    /// re-sending the counts is harmless but not required.
    pub fn save_physical_stock(
        &self,
        opname_id: OpnameId,
        counts: &[PhysicalCount],
        status: OpnameStatus,
        actor: &Actor,
    ) -> Result<StockOpname, StockError> {
        if status == OpnameStatus::Pending {
            return Err(DomainError::validation(
                "physical counts move a session to processing or confirmed",
            )
            .into());
        }

        let opname = self.atomically(|uow| {
            policy::authorize_process(&self.caps, actor, uow.opname(opname_id)?)?;
            uow.opname_mut(opname_id)?.record_counts(counts)?;
            uow.committed_opname(opname_id)
        })?;
        tracing::info!(
            opname_id = %opname_id,
            counted = counts.len(),
            actor = %actor.user_id,
            "physical stock saved"
        );

        if status == OpnameStatus::Confirmed {
            return self.finalize_stock(opname_id, &[], actor);
        }
        Ok(opname)
    }

    /// Close the session and post every non-zero difference as an `OpnameAdjustment`.
    pub fn finalize_stock(
        &self,
        opname_id: OpnameId,
        finals: &[FinalValue],
        actor: &Actor,
    ) -> Result<StockOpname, StockError> {
        let now = Utc::now();
        let (opname, adjustments) = self.atomically(|uow| {
            let location = {
                let opname = uow.opname(opname_id)?;
                policy::authorize_finalize(&self.caps, actor, opname)?;
                Location::from(opname.scope().division_id())
            };
            let differences = uow
                .opname_mut(opname_id)?
                .finalize(finals, actor.user_id, now)?;

            let ctx = PostingContext::new(actor.user_id, format!("stock opname {opname_id}"), now)
                .with_reference(TransactionReference::StockOpname(opname_id));
            for diff in &differences {
                ledger::adjust(
                    uow,
                    diff.item_id,
                    location,
                    diff.difference,
                    TransactionType::OpnameAdjustment,
                    &ctx,
                )?;
            }
            Ok((uow.committed_opname(opname_id)?, differences.len()))
        })?;

        tracing::info!(
            opname_id = %opname_id,
            adjustments,
            actor = %actor.user_id,
            "stock opname finalized"
        );
        Ok(opname)
    }

    /// Delete a session nobody has counted yet.
    pub fn delete(&self, opname_id: OpnameId, actor: &Actor) -> Result<(), StockError> {
        self.atomically(|uow| {
            let opname = uow.opname(opname_id)?;
            policy::authorize_manage(&self.caps, actor, opname)?;
            match opname.status() {
                OpnameStatus::Pending => {}
                OpnameStatus::Confirmed => return Err(DomainError::AlreadyFinalized.into()),
                status => return Err(DomainError::invalid_transition(status, "delete").into()),
            }
            uow.delete_opname(opname_id)
        })?;
        tracing::info!(opname_id = %opname_id, actor = %actor.user_id, "stock opname deleted");
        Ok(())
    }

    fn atomically<T>(
        &self,
        work: impl FnMut(&mut UnitOfWork<'_, S>) -> Result<T, StockError>,
    ) -> Result<T, StockError> {
        run_atomically(&self.store, self.conflict_retries, work)
    }
}
