//! Ledger client configuration.
//!
//! Without `LEDGER_URL` the service runs against the in-process
//! [`MockLedger`](crate::MockLedger). That is meant for development only and
//! is announced with a warning at startup.

use std::time::Duration;

use tc_core::ChainId;
use url::Url;

use crate::retry::RetryPolicy;

/// Configuration for connecting to the ledger node.
///
/// Custom `Debug` redacts `api_token`.
#[derive(Clone)]
pub struct LedgerConfig {
    /// Base URL of the ledger REST API. `None` selects the in-process ledger.
    pub url: Option<Url>,
    /// Bearer token sent on every request, if set.
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Transport retries after the first attempt. Writes only retry
    /// connection failures.
    pub max_retries: u32,
    /// Ledger network identifier, sent as `X-Ledger-Network`.
    pub network: ChainId,
    /// Actor recorded on every write this service makes.
    pub actor: String,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("network", &self.network)
            .field("actor", &self.actor)
            .finish()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_token: None,
            timeout_secs: 10,
            max_retries: 3,
            network: ChainId::new("tracepost-chain"),
            actor: "tracepost-api".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// - `LEDGER_URL` (optional)
    /// - `LEDGER_API_TOKEN` (optional)
    /// - `LEDGER_TIMEOUT_SECS` (default: 10)
    /// - `LEDGER_MAX_RETRIES` (default: 3)
    /// - `LEDGER_CHAIN_ID` (default: `tracepost-chain`)
    /// - `LEDGER_ACTOR` (default: `tracepost-api`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let url = match non_empty("LEDGER_URL") {
            Some(raw) => Some(
                Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl("LEDGER_URL".into(), e.to_string()))?,
            ),
            None => None,
        };
        let timeout_secs = match non_empty("LEDGER_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => defaults.timeout_secs,
        };
        let max_retries = match non_empty("LEDGER_MAX_RETRIES") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidRetries(raw))?,
            None => defaults.max_retries,
        };

        Ok(Self {
            url,
            api_token: non_empty("LEDGER_API_TOKEN"),
            timeout_secs,
            max_retries,
            network: non_empty("LEDGER_CHAIN_ID")
                .map(ChainId::new)
                .unwrap_or(defaults.network),
            actor: non_empty("LEDGER_ACTOR").unwrap_or(defaults.actor),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Upper bound on one ledger call, every retry and backoff included.
    /// Anything waiting on a call must wait at least this long, or it may
    /// give up on a write the ledger went on to accept.
    pub fn call_budget(&self) -> Duration {
        self.retry_policy().worst_case(self.request_timeout())
    }

    /// Configuration pointing at a local mock server (for testing).
    pub fn local(url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            url: Some(Url::parse(url).map_err(|e| ConfigError::InvalidUrl(url.into(), e.to_string()))?),
            timeout_secs: 5,
            ..Self::default()
        })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("LEDGER_TIMEOUT_SECS must be a positive integer, got '{0}'")]
    InvalidTimeout(String),
    #[error("LEDGER_MAX_RETRIES must be a non-negative integer, got '{0}'")]
    InvalidRetries(String),
    #[error("LEDGER_API_TOKEN contains characters not allowed in a header")]
    InvalidToken,
}
