//! Infrastructure layer: storage, units of work, config and the stock services.
//!
//! Domain crates decide; this crate reads clocks, checks capabilities, and
//! commits their decisions atomically.

pub mod config;
pub mod error;
pub mod ledger;
pub mod queries;
pub mod stock_opname;
pub mod store;
pub mod unit_of_work;
pub mod warehouse_order;


pub use config::StockroomConfig;
pub use error::StockError;
pub use ledger::StockLedger;
pub use queries::{OpnameCandidate, OrderFilter, StatusCount, StockQueries};
pub use stock_opname::StockOpnameWorkflow;
pub use store::{ChangeSet, InMemoryStockStore, Staged, StockStore, StoreError};
pub use unit_of_work::{UnitOfWork, run_atomically};
pub use warehouse_order::{OrderDraft, WarehouseOrderWorkflow};
