//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod state;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{
    DivisionId, ItemId, OpnameId, RejectId, TransactionId, UserId, WarehouseOrderId,
};
pub use state::StateMachine;
