use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input was not valid hex of the expected length.
    #[error("invalid hex: {0}")]
    Hex(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    Key(String),

    /// Signature did not verify.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Structural MMR error (empty tree, index out of range).
    #[error("mmr error: {0}")]
    Mmr(String),
}
