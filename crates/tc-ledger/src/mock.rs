//! In-process ledger.
//!
//! Used when no `LEDGER_URL` is configured and throughout the test suites.
//! Keeps a single global sequence, so acceptance order across all chains is
//! total. Can be switched into an unreachable mode to exercise outage paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tc_core::{sha256_hex, CanonicalBytes, ChainId, ClaimId, ClaimStatus, Did, DidStatus, TxId};

use crate::error::LedgerError;
use crate::types::{
    ChainState, LedgerClaim, LedgerIdentity, LedgerTransaction, TransactionRequest, TxReceipt,
    TxType,
};
use crate::Ledger;

#[derive(Debug, Default)]
struct State {
    sequence: u64,
    transactions: Vec<LedgerTransaction>,
    identities: HashMap<Did, LedgerIdentity>,
    claims: HashMap<ClaimId, LedgerClaim>,
}

/// Ledger held in memory.
#[derive(Debug)]
pub struct MockLedger {
    actor: String,
    state: Mutex<State>,
    unreachable: AtomicBool,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new("tracepost-api")
    }
}

impl MockLedger {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            state: Mutex::new(State::default()),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Make every call fail with [`LedgerError::Unreachable`] until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of accepted transactions across all chains.
    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }

    /// Overwrite the stored commitment of a transaction. Simulates a ledger
    /// record that disagrees with the relational anchor.
    pub fn overwrite_content_hash(&self, tx_id: &TxId, content_hash: &str) -> bool {
        let mut state = self.state.lock();
        match state.transactions.iter_mut().find(|t| &t.tx_id == tx_id) {
            Some(tx) => {
                tx.content_hash = content_hash.to_string();
                true
            }
            None => false,
        }
    }

    fn check_reachable(&self, endpoint: &str) -> Result<(), LedgerError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: "mock ledger is offline".to_string(),
            });
        }
        Ok(())
    }

    /// Append a transaction under the lock and return its receipt.
    fn append(
        &self,
        state: &mut State,
        chain: ChainId,
        tx_type: TxType,
        actor: String,
        payload: serde_json::Value,
        content_hash: String,
    ) -> TxReceipt {
        state.sequence += 1;
        let sequence = state.sequence;
        let tx_id = TxId::new(format!("0x{}", derive_tx_hash(sequence, &content_hash)));
        let now = Utc::now();
        state.transactions.push(LedgerTransaction {
            tx_id: tx_id.clone(),
            chain,
            tx_type,
            actor,
            content_hash,
            payload,
            sequence,
            timestamp: now,
        });
        TxReceipt {
            tx_id,
            sequence,
            accepted_at: now,
        }
    }
}

fn derive_tx_hash(sequence: u64, content_hash: &str) -> String {
    match CanonicalBytes::new(&(sequence, content_hash)) {
        Ok(bytes) => sha256_hex(&bytes),
        // A (u64, &str) tuple always serializes.
        Err(_) => format!("{sequence:064x}"),
    }
}

fn hash_of(value: &impl serde::Serialize) -> String {
    CanonicalBytes::new(value)
        .map(|b| sha256_hex(&b))
        .unwrap_or_default()
}

#[async_trait]
impl Ledger for MockLedger {
    async fn submit_transaction(&self, req: &TransactionRequest) -> Result<TxReceipt, LedgerError> {
        self.check_reachable("POST /transactions")?;
        let mut state = self.state.lock();
        Ok(self.append(
            &mut state,
            req.chain.clone(),
            req.tx_type,
            req.actor.clone(),
            req.payload.clone(),
            req.content_hash.clone(),
        ))
    }

    async fn get_transaction(&self, tx_id: &TxId) -> Result<LedgerTransaction, LedgerError> {
        let endpoint = format!("GET /transactions/{tx_id}");
        self.check_reachable(&endpoint)?;
        self.state
            .lock()
            .transactions
            .iter()
            .find(|t| &t.tx_id == tx_id)
            .cloned()
            .ok_or(LedgerError::NotFound { endpoint })
    }

    async fn list_transactions(&self, chain: &ChainId) -> Result<Vec<LedgerTransaction>, LedgerError> {
        self.check_reachable(&format!("GET /chains/{chain}/transactions"))?;
        Ok(self
            .state
            .lock()
            .transactions
            .iter()
            .filter(|t| &t.chain == chain)
            .cloned()
            .collect())
    }

    async fn chain_state(&self, chain: &ChainId) -> Result<ChainState, LedgerError> {
        self.check_reachable(&format!("GET /chains/{chain}/state"))?;
        let state = self.state.lock();
        let on_chain: Vec<&LedgerTransaction> =
            state.transactions.iter().filter(|t| &t.chain == chain).collect();
        let latest = on_chain.last();
        Ok(ChainState {
            chain: chain.clone(),
            tx_count: on_chain.len() as u64,
            latest_tx: latest.map(|t| t.tx_id.clone()),
            updated_at: latest.map(|t| t.timestamp),
        })
    }

    async fn register_identity(&self, identity: &LedgerIdentity) -> Result<TxReceipt, LedgerError> {
        self.check_reachable("POST /identities")?;
        let mut state = self.state.lock();
        if state.identities.contains_key(&identity.did) {
            return Err(LedgerError::Rejected {
                endpoint: "POST /identities".into(),
                status: 409,
                body: format!("{} already registered", identity.did),
            });
        }
        state.identities.insert(identity.did.clone(), identity.clone());
        let payload = serde_json::to_value(identity).unwrap_or_default();
        let content_hash = hash_of(&payload);
        Ok(self.append(
            &mut state,
            ChainId::identity_registry(),
            TxType::RegisterDid,
            self.actor.clone(),
            payload,
            content_hash,
        ))
    }

    async fn resolve_identity(&self, did: &Did) -> Result<LedgerIdentity, LedgerError> {
        let endpoint = format!("GET /identities/{did}");
        self.check_reachable(&endpoint)?;
        self.state
            .lock()
            .identities
            .get(did)
            .cloned()
            .ok_or(LedgerError::NotFound { endpoint })
    }

    async fn set_identity_status(&self, did: &Did, status: DidStatus) -> Result<TxReceipt, LedgerError> {
        let endpoint = format!("PUT /identities/{did}/status");
        self.check_reachable(&endpoint)?;
        let mut state = self.state.lock();
        let identity = state
            .identities
            .get_mut(did)
            .ok_or(LedgerError::NotFound { endpoint })?;
        identity.status = status;
        identity.updated = Utc::now();
        let payload = serde_json::json!({ "did": did, "status": status });
        let content_hash = hash_of(&payload);
        Ok(self.append(
            &mut state,
            ChainId::identity_registry(),
            TxType::UpdateDidStatus,
            self.actor.clone(),
            payload,
            content_hash,
        ))
    }

    async fn register_claim(&self, claim: &LedgerClaim) -> Result<TxReceipt, LedgerError> {
        self.check_reachable("POST /claims")?;
        let mut state = self.state.lock();
        state.claims.insert(claim.claim_id, claim.clone());
        let payload = serde_json::to_value(claim).unwrap_or_default();
        Ok(self.append(
            &mut state,
            ChainId::identity_registry(),
            TxType::RegisterClaim,
            self.actor.clone(),
            payload,
            claim.content_hash.clone(),
        ))
    }

    async fn claim_record(&self, id: &ClaimId) -> Result<LedgerClaim, LedgerError> {
        let endpoint = format!("GET /claims/{id}");
        self.check_reachable(&endpoint)?;
        self.state
            .lock()
            .claims
            .get(id)
            .cloned()
            .ok_or(LedgerError::NotFound { endpoint })
    }

    async fn revoke_claim(&self, id: &ClaimId) -> Result<TxReceipt, LedgerError> {
        let endpoint = format!("PUT /claims/{id}/revoke");
        self.check_reachable(&endpoint)?;
        let mut state = self.state.lock();
        let claim = state
            .claims
            .get_mut(id)
            .ok_or(LedgerError::NotFound { endpoint })?;
        claim.status = ClaimStatus::Revoked;
        let payload = serde_json::json!({ "claimId": id, "status": ClaimStatus::Revoked });
        let content_hash = hash_of(&payload);
        Ok(self.append(
            &mut state,
            ChainId::identity_registry(),
            TxType::RevokeClaim,
            self.actor.clone(),
            payload,
            content_hash,
        ))
    }
}
