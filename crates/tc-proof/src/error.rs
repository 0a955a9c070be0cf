use tc_core::CanonicalizationError;
use tc_crypto::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProofError {
    /// The proof text could not be decoded at all.
    #[error("cannot decode proof: {0}")]
    Serialization(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Disclosure requested for a field the document does not have.
    #[error("field '{0}' is not present in the document")]
    UnknownField(String),

    /// Disclosure requested with a proof that does not commit to the data.
    #[error("proof does not commit to the supplied data")]
    ProofMismatch,
}
