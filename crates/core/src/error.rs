//! Domain error model.

use thiserror::Error;

use crate::id::ItemId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A quantity was non-positive or not a number.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The mutation would drive an item's balance negative.
    #[error("insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: i64,
        available: i64,
    },

    /// The item has no usable unit conversion.
    #[error("item is not convertible: {0}")]
    NotConvertible(String),

    /// The operation is not permitted from the current state.
    #[error("cannot {action} from status {from}")]
    InvalidTransition { from: String, action: String },

    /// The order has left its editable states.
    #[error("order is not editable in status {status}")]
    OrderNotEditable { status: String },

    /// An opname session was requested without any items.
    #[error("stock opname requires at least one item")]
    EmptyOpname,

    /// The opname session was already finalized.
    #[error("stock opname is already finalized")]
    AlreadyFinalized,

    /// The actor lacks a capability (or scope) for the operation.
    #[error("unauthorized: {permission}")]
    Unauthorized { permission: String },

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn insufficient_stock(item_id: ItemId, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            item_id,
            requested,
            available,
        }
    }

    pub fn not_convertible(msg: impl Into<String>) -> Self {
        Self::NotConvertible(msg.into())
    }

    pub fn invalid_transition(from: impl core::fmt::Display, action: impl core::fmt::Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            action: action.to_string(),
        }
    }

    pub fn order_not_editable(status: impl core::fmt::Display) -> Self {
        Self::OrderNotEditable {
            status: status.to_string(),
        }
    }

    pub fn unauthorized(permission: impl Into<String>) -> Self {
        Self::Unauthorized {
            permission: permission.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
