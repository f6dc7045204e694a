use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{
    AggregateRoot, DivisionId, DomainError, DomainResult, ItemId, OpnameId, StateMachine, UserId,
};

/// Which stock pool a session counts. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpnameScope {
    Warehouse,
    Division(DivisionId),
}

impl OpnameScope {
    pub fn division_id(self) -> Option<DivisionId> {
        match self {
            OpnameScope::Warehouse => None,
            OpnameScope::Division(id) => Some(id),
        }
    }
}

/// Requested scope before it is bound to the actor's division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Warehouse,
    Division,
}

/// Read-only listing filter. `All` applies no scope filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpnameView {
    Warehouse,
    Division(DivisionId),
    All,
}

impl OpnameView {
    pub fn includes(self, scope: OpnameScope) -> bool {
        match self {
            OpnameView::All => true,
            OpnameView::Warehouse => scope == OpnameScope::Warehouse,
            OpnameView::Division(id) => scope == OpnameScope::Division(id),
        }
    }
}

/// Opname session lifecycle: `Pending → Processing → Confirmed`.
///
/// A session may also be finalized straight from `Pending`; every line then
/// keeps its override or system snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpnameStatus {
    Pending,
    Processing,
    Confirmed,
}

impl core::fmt::Display for OpnameStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OpnameStatus::Pending => "pending",
            OpnameStatus::Processing => "processing",
            OpnameStatus::Confirmed => "confirmed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpnameAction {
    Count,
    Finalize,
}

impl core::fmt::Display for OpnameAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OpnameAction::Count => f.write_str("record physical stock"),
            OpnameAction::Finalize => f.write_str("finalize"),
        }
    }
}

impl StateMachine for OpnameStatus {
    type Action = OpnameAction;

    fn transition(self, action: OpnameAction) -> DomainResult<Self> {
        match (self, action) {
            (OpnameStatus::Confirmed, _) => Err(DomainError::AlreadyFinalized),
            (OpnameStatus::Pending | OpnameStatus::Processing, OpnameAction::Count) => {
                Ok(OpnameStatus::Processing)
            }
            (OpnameStatus::Pending | OpnameStatus::Processing, OpnameAction::Finalize) => {
                Ok(OpnameStatus::Confirmed)
            }
        }
    }

    fn is_terminal(self) -> bool {
        self == OpnameStatus::Confirmed
    }
}

/// One counted line.
///
/// `system_stock` is frozen at initialization. `difference` is derived from
/// `final_stock` and `system_stock`, never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOpnameItem {
    item_id: ItemId,
    system_stock: i64,
    physical_stock: Option<i64>,
    final_stock: Option<i64>,
    notes: Option<String>,
    final_notes: Option<String>,
}

impl StockOpnameItem {
    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn system_stock(&self) -> i64 {
        self.system_stock
    }

    pub fn physical_stock(&self) -> Option<i64> {
        self.physical_stock
    }

    pub fn final_stock(&self) -> Option<i64> {
        self.final_stock
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn final_notes(&self) -> Option<&str> {
        self.final_notes.as_deref()
    }

    /// `final_stock - system_stock`, once finalized.
    pub fn difference(&self) -> Option<i64> {
        self.final_stock.map(|f| f - self.system_stock)
    }
}

/// Physical count for one line, written during counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCount {
    pub item_id: ItemId,
    pub physical_stock: i64,
    pub notes: Option<String>,
}

/// Operator override at finalization. `final_stock = None` keeps the count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalValue {
    pub item_id: ItemId,
    pub final_stock: Option<i64>,
    pub final_notes: Option<String>,
}

/// A non-zero correction the ledger must apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpnameDifference {
    pub item_id: ItemId,
    pub difference: i64,
}

/// Everything needed to open a session; `snapshots` are `(item, current stock)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpnameRequest {
    pub id: OpnameId,
    pub opname_date: NaiveDate,
    pub owner: UserId,
    pub scope: OpnameScope,
    pub notes: Option<String>,
    pub snapshots: Vec<(ItemId, i64)>,
}

/// Aggregate root: StockOpname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOpname {
    id: OpnameId,
    opname_date: NaiveDate,
    owner: UserId,
    scope: OpnameScope,
    status: OpnameStatus,
    notes: Option<String>,
    items: Vec<StockOpnameItem>,
    finalized_by: Option<UserId>,
    finalized_at: Option<DateTime<Utc>>,
    version: u64,
}

impl StockOpname {
    /// Open a session in `Pending` from stock snapshots.
    ///
    /// Repeated items keep their first snapshot.
    pub fn initialize(request: OpnameRequest) -> DomainResult<Self> {
        if request.snapshots.is_empty() {
            return Err(DomainError::EmptyOpname);
        }

        let mut seen = HashSet::with_capacity(request.snapshots.len());
        let mut items = Vec::with_capacity(request.snapshots.len());
        for (item_id, system_stock) in request.snapshots {
            if system_stock < 0 {
                return Err(DomainError::validation(format!(
                    "system stock snapshot for item {item_id} is negative"
                )));
            }
            if seen.insert(item_id) {
                items.push(StockOpnameItem {
                    item_id,
                    system_stock,
                    physical_stock: None,
                    final_stock: None,
                    notes: None,
                    final_notes: None,
                });
            }
        }

        Ok(Self {
            id: request.id,
            opname_date: request.opname_date,
            owner: request.owner,
            scope: request.scope,
            status: OpnameStatus::Pending,
            notes: request.notes,
            items,
            finalized_by: None,
            finalized_at: None,
            version: 0,
        })
    }

    /// Used by stores when a committed write bumps the row version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    pub fn id_typed(&self) -> OpnameId {
        self.id
    }

    pub fn opname_date(&self) -> NaiveDate {
        self.opname_date
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn scope(&self) -> OpnameScope {
        self.scope
    }

    pub fn status(&self) -> OpnameStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn items(&self) -> &[StockOpnameItem] {
        &self.items
    }

    pub fn item(&self, item_id: ItemId) -> Option<&StockOpnameItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    pub fn finalized_by(&self) -> Option<UserId> {
        self.finalized_by
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    /// Write physical counts; moves the session to `Processing`.
    ///
    /// All counts are validated before any is written.
    pub fn record_counts(&mut self, counts: &[PhysicalCount]) -> DomainResult<()> {
        let next = self.status.transition(OpnameAction::Count)?;
        let index = self.line_index();

        for count in counts {
            if count.physical_stock < 0 {
                return Err(DomainError::invalid_quantity(format!(
                    "physical stock for item {} cannot be negative",
                    count.item_id
                )));
            }
            if !index.contains_key(&count.item_id) {
                return Err(not_in_session(count.item_id));
            }
        }

        for count in counts {
            let line = &mut self.items[index[&count.item_id]];
            line.physical_stock = Some(count.physical_stock);
            if count.notes.is_some() {
                line.notes = count.notes.clone();
            }
        }
        self.status = next;
        Ok(())
    }

    /// Fix final stock per line and close the session.
    ///
    /// `final_stock` defaults to the physical count, and to the system
    /// snapshot for lines never counted. Returns the non-zero differences.
    pub fn finalize(
        &mut self,
        finals: &[FinalValue],
        actor: UserId,
        at: DateTime<Utc>,
    ) -> DomainResult<Vec<OpnameDifference>> {
        let next = self.status.transition(OpnameAction::Finalize)?;
        let index = self.line_index();

        let mut overrides: HashMap<ItemId, &FinalValue> = HashMap::with_capacity(finals.len());
        for value in finals {
            if value.final_stock.is_some_and(|f| f < 0) {
                return Err(DomainError::invalid_quantity(format!(
                    "final stock for item {} cannot be negative",
                    value.item_id
                )));
            }
            if !index.contains_key(&value.item_id) {
                return Err(not_in_session(value.item_id));
            }
            overrides.insert(value.item_id, value);
        }

        let mut differences = Vec::new();
        for line in &mut self.items {
            let value = overrides.get(&line.item_id);
            let final_stock = value
                .and_then(|v| v.final_stock)
                .or(line.physical_stock)
                .unwrap_or(line.system_stock);
            line.final_stock = Some(final_stock);
            if let Some(notes) = value.and_then(|v| v.final_notes.clone()) {
                line.final_notes = Some(notes);
            }

            let difference = final_stock - line.system_stock;
            if difference != 0 {
                differences.push(OpnameDifference {
                    item_id: line.item_id,
                    difference,
                });
            }
        }

        self.status = next;
        self.finalized_by = Some(actor);
        self.finalized_at = Some(at);
        Ok(differences)
    }

    fn line_index(&self) -> HashMap<ItemId, usize> {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, line)| (line.item_id, idx))
            .collect()
    }
}

impl AggregateRoot for StockOpname {
    type Id = OpnameId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn not_in_session(item_id: ItemId) -> DomainError {
    DomainError::validation(format!("item {item_id} is not part of this opname"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(snapshots: Vec<(ItemId, i64)>) -> OpnameRequest {
        OpnameRequest {
            id: OpnameId::new(),
            opname_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            owner: UserId::new(),
            scope: OpnameScope::Warehouse,
            notes: None,
            snapshots,
        }
    }

    fn count(item_id: ItemId, physical_stock: i64) -> PhysicalCount {
        PhysicalCount {
            item_id,
            physical_stock,
            notes: None,
        }
    }

    #[test]
    fn initialize_requires_items() {
        let err = StockOpname::initialize(request(vec![])).unwrap_err();
        assert_eq!(err, DomainError::EmptyOpname);
    }

    #[test]
    fn initialize_snapshots_and_dedupes() {
        let a = ItemId::new();
        let b = ItemId::new();
        let opname = StockOpname::initialize(request(vec![(a, 10), (b, 4), (a, 99)])).unwrap();

        assert_eq!(opname.status(), OpnameStatus::Pending);
        assert_eq!(opname.items().len(), 2);
        assert_eq!(opname.item(a).unwrap().system_stock(), 10);
        assert_eq!(opname.item(a).unwrap().physical_stock(), None);
        assert_eq!(opname.item(a).unwrap().difference(), None);
    }

    #[test]
    fn counts_move_session_to_processing() {
        let a = ItemId::new();
        let mut opname = StockOpname::initialize(request(vec![(a, 10)])).unwrap();

        opname.record_counts(&[count(a, 8)]).unwrap();
        assert_eq!(opname.status(), OpnameStatus::Processing);
        assert_eq!(opname.item(a).unwrap().physical_stock(), Some(8));

        // Counting again while processing overwrites.
        opname.record_counts(&[count(a, 9)]).unwrap();
        assert_eq!(opname.item(a).unwrap().physical_stock(), Some(9));
    }

    #[test]
    fn negative_count_is_rejected_without_partial_write() {
        let a = ItemId::new();
        let b = ItemId::new();
        let mut opname = StockOpname::initialize(request(vec![(a, 10), (b, 3)])).unwrap();

        let err = opname
            .record_counts(&[count(a, 5), count(b, -1)])
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        assert_eq!(opname.item(a).unwrap().physical_stock(), None);
        assert_eq!(opname.status(), OpnameStatus::Pending);
    }

    #[test]
    fn count_for_foreign_item_is_rejected() {
        let a = ItemId::new();
        let mut opname = StockOpname::initialize(request(vec![(a, 10)])).unwrap();
        let err = opname.record_counts(&[count(ItemId::new(), 1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn finalize_straight_from_pending() {
        let a = ItemId::new();
        let b = ItemId::new();
        let mut opname = StockOpname::initialize(request(vec![(a, 50), (b, 7)])).unwrap();

        let finals = [FinalValue {
            item_id: a,
            final_stock: Some(45),
            final_notes: None,
        }];
        let diffs = opname.finalize(&finals, UserId::new(), Utc::now()).unwrap();

        assert_eq!(opname.status(), OpnameStatus::Confirmed);
        assert_eq!(opname.item(a).unwrap().difference(), Some(-5));
        // Never counted and no override: keeps the snapshot.
        assert_eq!(opname.item(b).unwrap().final_stock(), Some(7));
        assert_eq!(diffs, vec![OpnameDifference { item_id: a, difference: -5 }]);
    }

    #[test]
    fn finalize_defaults_and_differences() {
        let a = ItemId::new();
        let b = ItemId::new();
        let c = ItemId::new();
        let mut opname =
            StockOpname::initialize(request(vec![(a, 10), (b, 5), (c, 7)])).unwrap();
        opname.record_counts(&[count(a, 8), count(b, 5)]).unwrap();

        let finals = [FinalValue {
            item_id: b,
            final_stock: Some(6),
            final_notes: Some("found a box".into()),
        }];
        let actor = UserId::new();
        let diffs = opname.finalize(&finals, actor, Utc::now()).unwrap();

        assert_eq!(opname.status(), OpnameStatus::Confirmed);
        assert_eq!(opname.finalized_by(), Some(actor));
        // a: physical count wins, b: override wins, c: never counted keeps system stock.
        assert_eq!(opname.item(a).unwrap().difference(), Some(-2));
        assert_eq!(opname.item(b).unwrap().difference(), Some(1));
        assert_eq!(opname.item(b).unwrap().final_notes(), Some("found a box"));
        assert_eq!(opname.item(c).unwrap().difference(), Some(0));
        assert_eq!(
            diffs,
            vec![
                OpnameDifference { item_id: a, difference: -2 },
                OpnameDifference { item_id: b, difference: 1 },
            ]
        );
    }

    #[test]
    fn confirmed_session_is_closed() {
        let a = ItemId::new();
        let mut opname = StockOpname::initialize(request(vec![(a, 1)])).unwrap();
        opname.record_counts(&[count(a, 1)]).unwrap();
        opname.finalize(&[], UserId::new(), Utc::now()).unwrap();

        assert_eq!(
            opname.record_counts(&[count(a, 2)]).unwrap_err(),
            DomainError::AlreadyFinalized
        );
        assert_eq!(
            opname.finalize(&[], UserId::new(), Utc::now()).unwrap_err(),
            DomainError::AlreadyFinalized
        );
        assert!(opname.status().is_terminal());
    }

    #[test]
    fn view_filters_by_scope() {
        let division = DivisionId::new();
        assert!(OpnameView::All.includes(OpnameScope::Warehouse));
        assert!(OpnameView::Warehouse.includes(OpnameScope::Warehouse));
        assert!(!OpnameView::Warehouse.includes(OpnameScope::Division(division)));
        assert!(OpnameView::Division(division).includes(OpnameScope::Division(division)));
        assert!(!OpnameView::Division(DivisionId::new()).includes(OpnameScope::Division(division)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

            #[test]
            fn differences_reconcile_to_final_stock(
                lines in prop::collection::vec((0i64..500, proptest::option::of(0i64..500)), 1..12)
            ) {
                let ids: Vec<ItemId> = lines.iter().map(|_| ItemId::new()).collect();
                let snapshots = ids.iter().zip(&lines).map(|(id, (sys, _))| (*id, *sys)).collect();
                let mut opname = StockOpname::initialize(request(snapshots)).unwrap();

                let counts: Vec<PhysicalCount> = ids
                    .iter()
                    .zip(&lines)
                    .filter_map(|(id, (_, phys))| phys.map(|p| count(*id, p)))
                    .collect();
                opname.record_counts(&counts).unwrap();
                let diffs = opname.finalize(&[], UserId::new(), Utc::now()).unwrap();

                for (line, (sys, phys)) in opname.items().iter().zip(&lines) {
                    let expected = phys.unwrap_or(*sys);
                    prop_assert_eq!(line.final_stock(), Some(expected));
                    prop_assert_eq!(line.system_stock() + line.difference().unwrap(), expected);
                }
                prop_assert!(diffs.iter().all(|d| d.difference != 0));
            }
        }
    }
}
