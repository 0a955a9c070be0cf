//! Identity and claim documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tc_core::{sha256_hex, CanonicalBytes, CanonicalizationError, ClaimId, ClaimStatus, Did, DidStatus};
use tc_ledger::{LedgerClaim, LedgerIdentity};
use zeroize::Zeroizing;

pub const PROOF_TYPE: &str = "Ed25519Signature2020";
pub const PROOF_PURPOSE: &str = "assertionMethod";

/// Self-signed proof binding a DID to its public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidProof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    pub verification_method: String,
    pub proof_purpose: String,
    /// Hex signature over `SHA-256(did || public_key_hex)`.
    pub proof_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecentralizedIdentity {
    pub did: Did,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Did>,
    pub public_key: String,
    pub metadata: serde_json::Value,
    pub status: DidStatus,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<DidProof>,
}

impl DecentralizedIdentity {
    /// Entity type recorded in metadata, falling back to the DID segment.
    pub fn entity_type(&self) -> Option<&str> {
        self.metadata
            .get("type")
            .and_then(|v| v.as_str())
            .or_else(|| self.did.entity_type())
    }

    pub fn to_ledger(&self) -> LedgerIdentity {
        LedgerIdentity {
            did: self.did.clone(),
            controller: self.controller.clone(),
            public_key: self.public_key.clone(),
            metadata: self.metadata.clone(),
            status: self.status,
            created: self.created,
            updated: self.updated,
            proof: self
                .proof
                .as_ref()
                .and_then(|p| serde_json::to_value(p).ok()),
        }
    }

    /// Rebuild from the ledger's document. A proof the ledger returns in an
    /// unexpected shape is dropped.
    pub fn from_ledger(doc: LedgerIdentity) -> Self {
        Self {
            did: doc.did,
            controller: doc.controller,
            public_key: doc.public_key,
            metadata: doc.metadata,
            status: doc.status,
            created: doc.created,
            updated: doc.updated,
            proof: doc.proof.and_then(|p| serde_json::from_value(p).ok()),
        }
    }
}

/// A freshly provisioned DID and its private key.
///
/// The key exists only in this value. It is never stored, and the buffer is
/// wiped on drop.
pub struct CreatedDid {
    pub identity: DecentralizedIdentity,
    pub private_key: Zeroizing<String>,
}

impl std::fmt::Debug for CreatedDid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedDid")
            .field("identity", &self.identity)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DidProofVerification {
    pub did: Did,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Query over the identity cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityQuery {
    pub entity_type: Option<String>,
    pub status: Option<DidStatus>,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityPage {
    pub identities: Vec<DecentralizedIdentity>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableClaim {
    pub id: ClaimId,
    #[serde(rename = "type")]
    pub claim_type: String,
    pub issuer: Did,
    pub subject: Did,
    pub claims: serde_json::Value,
    pub issuance_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ClaimStatus,
}

impl VerifiableClaim {
    /// Canonical hash of the claim's immutable content. Status is excluded,
    /// so revocation does not change the commitment.
    pub fn content_hash(&self) -> Result<String, CanonicalizationError> {
        let content = serde_json::json!({
            "id": self.id,
            "type": self.claim_type,
            "issuer": self.issuer,
            "subject": self.subject,
            "claims": self.claims,
            "issuanceDate": self.issuance_date,
            "expiryDate": self.expiry_date,
        });
        Ok(sha256_hex(&CanonicalBytes::new(&content)?))
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at > self.expiry_date
    }

    pub fn to_ledger(&self) -> Result<LedgerClaim, CanonicalizationError> {
        Ok(LedgerClaim {
            claim_id: self.id,
            claim_type: self.claim_type.clone(),
            issuer: self.issuer.clone(),
            subject: self.subject.clone(),
            content_hash: self.content_hash()?,
            status: self.status,
            issued_at: self.issuance_date,
            expires_at: self.expiry_date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimVerification {
    pub claim_id: ClaimId,
    pub is_valid: bool,
    pub validation_time: DateTime<Utc>,
    pub errors: Vec<String>,
}
