//! Inventory domain module: items, the stock ledger and unit conversion.
//!
//! This crate contains business rules for stock, implemented purely as
//! deterministic domain logic (no IO, no locks, no storage). Balances change
//! only through the posting functions in [`ledger`].

pub mod conversion;
pub mod item;
pub mod ledger;
pub mod transaction;

pub use conversion::{Conversion, ResolvedConversion, UnitConversionResolver};
pub use item::{Item, Location};
pub use ledger::{ConversionPosting, ItemCatalog, PostingContext, StockWriter, parse_quantity};
pub use transaction::{StockTransaction, TransactionReference, TransactionType};
