//! # tc-ledger: Ledger Client
//!
//! The distributed ledger is an external system. This crate is the only
//! path by which the rest of the workspace talks to it:
//!
//! - [`Ledger`]: the async trait every component depends on, shared as
//!   `Arc<dyn Ledger>`.
//! - [`HttpLedger`]: REST client with bounded timeout and transport-only
//!   retry.
//! - [`MockLedger`]: in-process ledger for development and tests.
//!
//! ## Error contract
//!
//! Callers distinguish three outcomes: a record exists, the ledger says it
//! does not ([`LedgerError::NotFound`]), or the ledger could not be asked
//! ([`LedgerError::is_transport`]). Verification treats the last one as
//! inconclusive, never as tampering.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub(crate) mod retry;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tc_core::{ChainId, ClaimId, Did, DidStatus, TxId};

pub use config::{ConfigError, LedgerConfig};
pub use error::LedgerError;
pub use http::HttpLedger;
pub use mock::MockLedger;
pub use retry::RetryPolicy;
pub use types::{
    ChainState, LedgerClaim, LedgerIdentity, LedgerTransaction, TransactionRequest, TxReceipt,
    TxType,
};

/// Operations the services need from the ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append a transaction to a chain.
    async fn submit_transaction(&self, req: &TransactionRequest) -> Result<TxReceipt, LedgerError>;

    async fn get_transaction(&self, tx_id: &TxId) -> Result<LedgerTransaction, LedgerError>;

    /// All transactions on `chain`, in acceptance order.
    async fn list_transactions(&self, chain: &ChainId) -> Result<Vec<LedgerTransaction>, LedgerError>;

    async fn chain_state(&self, chain: &ChainId) -> Result<ChainState, LedgerError>;

    async fn register_identity(&self, identity: &LedgerIdentity) -> Result<TxReceipt, LedgerError>;

    async fn resolve_identity(&self, did: &Did) -> Result<LedgerIdentity, LedgerError>;

    async fn set_identity_status(&self, did: &Did, status: DidStatus) -> Result<TxReceipt, LedgerError>;

    async fn register_claim(&self, claim: &LedgerClaim) -> Result<TxReceipt, LedgerError>;

    async fn claim_record(&self, id: &ClaimId) -> Result<LedgerClaim, LedgerError>;

    async fn revoke_claim(&self, id: &ClaimId) -> Result<TxReceipt, LedgerError>;
}

/// Build the process-wide ledger client from configuration.
///
/// Falls back to [`MockLedger`] when no URL is configured.
pub fn connect(config: &LedgerConfig) -> Result<Arc<dyn Ledger>, LedgerError> {
    match &config.url {
        Some(url) => {
            tracing::info!(url = %url, network = %config.network, "using HTTP ledger");
            Ok(Arc::new(HttpLedger::new(config)?))
        }
        None => {
            tracing::warn!("LEDGER_URL not set, using in-process mock ledger; anchors are not durable");
            Ok(Arc::new(MockLedger::new(config.actor.clone())))
        }
    }
}
