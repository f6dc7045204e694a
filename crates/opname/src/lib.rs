//! Stock opname (physical count reconciliation) domain module.
//!
//! A session snapshots system stock for a set of items, collects physical
//! counts, and on finalization yields the per-item differences the caller
//! posts to the stock ledger.

pub mod policy;
pub mod session;

pub use policy::resolve_scope;
pub use session::{
    FinalValue, OpnameAction, OpnameDifference, OpnameRequest, OpnameScope, OpnameStatus,
    OpnameView, PhysicalCount, ScopeKind, StockOpname, StockOpnameItem,
};
