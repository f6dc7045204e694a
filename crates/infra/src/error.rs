//! Service-level error: domain failures plus storage failures.

use thiserror::Error;

use stockroom_auth::AuthzError;
use stockroom_core::DomainError;

use crate::store::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthzError> for StockError {
    fn from(value: AuthzError) -> Self {
        StockError::Domain(value.into())
    }
}

impl StockError {
    /// The domain failure, if this is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            StockError::Domain(err) => Some(err),
            StockError::Store(_) => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StockError::Store(StoreError::Conflict(_)))
    }
}
