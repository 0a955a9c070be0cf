//! Ledger client error types.

use crate::config::ConfigError;

/// Errors from ledger calls.
///
/// Reasons are carried as strings so the in-process ledger can produce the
/// same variants as the HTTP client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    /// Connection refused, reset, or otherwise failed before a response.
    #[error("ledger unreachable calling {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("ledger timed out calling {endpoint}")]
    Timeout { endpoint: String },

    /// The ledger has no record for the requested key.
    #[error("ledger has no record for {endpoint}")]
    NotFound { endpoint: String },

    /// The ledger answered with a non-2xx status.
    #[error("ledger {endpoint} returned {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected schema.
    #[error("failed to decode ledger response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },

    #[error("ledger configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    /// Transport-level failure: the ledger's answer is unknown.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn from_reqwest(endpoint: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            Self::Unreachable {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        }
    }
}
