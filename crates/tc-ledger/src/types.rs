//! Wire types exchanged with the ledger.
//!
//! Field names are camelCase on the wire. Response types use
//! `#[serde(default)]` on optional fields so an older or newer ledger node
//! that adds or omits metadata still decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tc_core::{ChainId, ClaimId, ClaimStatus, Did, DidStatus, TxId};

/// Transaction type tag recorded with every ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxType {
    CreateBatch,
    UpdateBatchStatus,
    RetireBatch,
    RecordEvent,
    RecordEnvironment,
    RegisterDid,
    UpdateDidStatus,
    RegisterClaim,
    RevokeClaim,
    /// Types written by other producers on the same ledger.
    #[serde(other)]
    Unknown,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateBatch => "CREATE_BATCH",
            Self::UpdateBatchStatus => "UPDATE_BATCH_STATUS",
            Self::RetireBatch => "RETIRE_BATCH",
            Self::RecordEvent => "RECORD_EVENT",
            Self::RecordEnvironment => "RECORD_ENVIRONMENT",
            Self::RegisterDid => "REGISTER_DID",
            Self::UpdateDidStatus => "UPDATE_DID_STATUS",
            Self::RegisterClaim => "REGISTER_CLAIM",
            Self::RevokeClaim => "REVOKE_CLAIM",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction to append to a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub chain: ChainId,
    pub tx_type: TxType,
    pub actor: String,
    pub payload: serde_json::Value,
    /// Canonical SHA-256 of `payload`, bare hex.
    pub content_hash: String,
}

/// Acknowledgement of an accepted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_id: TxId,
    /// Position in the ledger's global acceptance order.
    pub sequence: u64,
    pub accepted_at: DateTime<Utc>,
}

/// A committed ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTransaction {
    pub tx_id: TxId,
    pub chain: ChainId,
    pub tx_type: TxType,
    #[serde(default)]
    pub actor: String,
    pub content_hash: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// Summary of one chain as the ledger sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    pub chain: ChainId,
    pub tx_count: u64,
    #[serde(default)]
    pub latest_tx: Option<TxId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Identity document as registered on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerIdentity {
    pub did: Did,
    #[serde(default)]
    pub controller: Option<Did>,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub status: DidStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub proof: Option<serde_json::Value>,
}

/// Claim commitment as registered on the ledger. Carries the content hash,
/// not the claim body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerClaim {
    pub claim_id: ClaimId,
    pub claim_type: String,
    pub issuer: Did,
    pub subject: Did,
    pub content_hash: String,
    pub status: ClaimStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Body of a status change request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct StatusUpdate {
    pub status: DidStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&TxType::UpdateBatchStatus).unwrap(),
            "\"UPDATE_BATCH_STATUS\""
        );
        let parsed: TxType = serde_json::from_str("\"MINT_TOKEN\"").unwrap();
        assert_eq!(parsed, TxType::Unknown);
    }

    #[test]
    fn transaction_tolerates_missing_optional_fields() {
        let tx: LedgerTransaction = serde_json::from_value(serde_json::json!({
            "txId": "0xabc",
            "chain": "batch:1",
            "txType": "CREATE_BATCH",
            "contentHash": "00",
            "sequence": 4,
            "timestamp": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(tx.tx_id.as_str(), "0xabc");
        assert!(tx.actor.is_empty());
        assert!(tx.payload.is_null());
    }
}
