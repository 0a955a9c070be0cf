use tc_core::{CanonicalizationError, StoreError, ValidationError};
use tc_ledger::LedgerError;
use thiserror::Error;

/// Errors from the anchoring services.
///
/// Ledger failures during anchoring never appear here; they are reported as
/// an [`AnchorOutcome`](crate::writer::AnchorOutcome) instead.
#[derive(Error, Debug)]
pub enum AnchorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    /// The ledger could not answer a read the operation depends on.
    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl AnchorError {
    pub fn batch_not_found(id: i64) -> Self {
        Self::NotFound(format!("batch {id}"))
    }
}
