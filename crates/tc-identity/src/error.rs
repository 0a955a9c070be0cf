use tc_core::{CanonicalizationError, StoreError, ValidationError};
use tc_crypto::CryptoError;
use tc_ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    /// The requester is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    #[error("cryptographic failure: {0}")]
    Crypto(#[from] CryptoError),

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
