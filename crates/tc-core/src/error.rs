//! # Error Types
//!
//! Shared error types used across TraceChain crates. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! Component crates define their own error enums and wrap these via
//! `#[from]` where a variant crosses a crate boundary unchanged.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Relational store failure.
///
/// Always fatal: read paths abort and the HTTP layer answers 500.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database rejected or failed the query.
    #[error("database error: {0}")]
    Database(String),

    /// A stored column could not be decoded into its domain type.
    #[error("corrupt stored value in {column}: {reason}")]
    Corrupt {
        /// Column or field that failed to decode.
        column: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// A uniqueness constraint was violated.
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// Input that fails a domain rule before any store or ledger is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field is missing or malformed.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A DID string does not follow `did:<method>:<...>`.
    #[error("invalid DID: {0}")]
    InvalidDid(String),

    /// A related-table name is not one this system anchors.
    #[error("unknown related table: {0}")]
    UnknownTable(String),
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidField`].
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
