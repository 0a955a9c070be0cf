//! # Identity Registry
//!
//! Provisions `did:tracepost` identifiers and answers questions about them.
//!
//! The ledger is authoritative. Creation and status changes go to the
//! ledger first and fail if it does; the relational cache is written after
//! and only ever serves listings. Resolution reads the ledger alone, so a
//! DID present in the cache but absent on the ledger does not resolve.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tc_core::{now_micros, Did, DidStatus, ValidationError};
use tc_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use tc_ledger::{Ledger, LedgerError};

use crate::error::IdentityError;
use crate::store::IdentityStore;
use crate::types::{
    CreatedDid, DecentralizedIdentity, DidProof, DidProofVerification, IdentityPage,
    IdentityQuery, VerifiableClaim, PROOF_PURPOSE, PROOF_TYPE,
};

/// Hex chars of the public key used in the DID.
const KEY_FRAGMENT_LEN: usize = 16;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Message signed by a DID's self-proof: `SHA-256(did || public_key_hex)`.
pub fn proof_message(did: &Did, public_key_hex: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(did.as_str().as_bytes());
    hasher.update(public_key_hex.as_bytes());
    hasher.finalize().into()
}

/// Check an identity's embedded self-proof against its public key.
pub fn verify_self_proof(identity: &DecentralizedIdentity) -> bool {
    let Some(proof) = &identity.proof else {
        return false;
    };
    let (Ok(key), Ok(sig)) = (
        Ed25519PublicKey::from_hex(&identity.public_key),
        Ed25519Signature::from_hex(&proof.proof_value),
    ) else {
        return false;
    };
    key.verify(&proof_message(&identity.did, &identity.public_key), &sig)
        .is_ok()
}

#[derive(Clone)]
pub struct IdentityRegistry {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn IdentityStore>,
}

impl IdentityRegistry {
    pub fn new(ledger: Arc<dyn Ledger>, store: Arc<dyn IdentityStore>) -> Self {
        Self { ledger, store }
    }

    /// Provision a new DID.
    ///
    /// `metadata` must be a JSON object or null. Its `name` and `type` keys
    /// are always set from `entity_name` and `entity_type`.
    pub async fn create_did(
        &self,
        entity_type: &str,
        entity_name: &str,
        metadata: serde_json::Value,
        controller: Option<Did>,
    ) -> Result<CreatedDid, IdentityError> {
        let entity_type = entity_type.trim();
        let entity_name = entity_name.trim();
        if entity_name.is_empty() {
            return Err(ValidationError::field("entity_name", "must not be empty").into());
        }
        let mut merged = match metadata {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            _ => return Err(ValidationError::field("metadata", "must be a JSON object").into()),
        };
        merged.insert("name".into(), entity_name.into());
        merged.insert("type".into(), entity_type.into());

        let key_pair = Ed25519KeyPair::generate();
        let public_key = key_pair.public_key().to_hex();
        let did = Did::tracepost(entity_type, &public_key[..KEY_FRAGMENT_LEN])?;

        let now = now_micros();
        let signature = key_pair.sign(&proof_message(&did, &public_key));
        let identity = DecentralizedIdentity {
            proof: Some(DidProof {
                proof_type: PROOF_TYPE.into(),
                created: now,
                verification_method: did.key_id(),
                proof_purpose: PROOF_PURPOSE.into(),
                proof_value: signature.to_hex(),
            }),
            did,
            controller,
            public_key,
            metadata: serde_json::Value::Object(merged),
            status: DidStatus::Active,
            created: now,
            updated: now,
        };

        let receipt = self.ledger.register_identity(&identity.to_ledger()).await?;
        tracing::info!(did = %identity.did, tx_id = %receipt.tx_id, "DID registered on ledger");

        if let Err(e) = self.store.insert_identity(&identity).await {
            tracing::error!(did = %identity.did, error = %e, "DID registered on ledger but not cached");
            return Err(e.into());
        }

        Ok(CreatedDid {
            identity,
            private_key: key_pair.secret_hex(),
        })
    }

    /// Resolve a DID from the ledger.
    pub async fn resolve(&self, did: &Did) -> Result<DecentralizedIdentity, IdentityError> {
        match self.ledger.resolve_identity(did).await {
            Ok(doc) => Ok(DecentralizedIdentity::from_ledger(doc)),
            Err(LedgerError::NotFound { .. }) => Err(IdentityError::NotFound(format!("DID {did}"))),
            Err(e) => Err(e.into()),
        }
    }

    /// List cached identities. `limit` must be 1-100; `page` starts at 1.
    pub async fn list(
        &self,
        entity_type: Option<String>,
        status: Option<DidStatus>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<IdentityPage, IdentityError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ValidationError::field("limit", "must be between 1 and 100").into());
        }
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(ValidationError::field("page", "must be at least 1").into());
        }
        let query = IdentityQuery {
            entity_type: entity_type.filter(|t| !t.is_empty()),
            status,
            page,
            limit,
        };
        Ok(self.store.list_identities(&query).await?)
    }

    /// Change a DID's status: ledger first, then cache.
    pub async fn update_status(
        &self,
        did: &Did,
        status: DidStatus,
    ) -> Result<DecentralizedIdentity, IdentityError> {
        let receipt = match self.ledger.set_identity_status(did, status).await {
            Ok(r) => r,
            Err(LedgerError::NotFound { .. }) => {
                return Err(IdentityError::NotFound(format!("DID {did}")))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(did = %did, status = %status, tx_id = %receipt.tx_id, "DID status updated on ledger");

        let updated = now_micros();
        if !self.store.update_identity_status(did, status, updated).await? {
            tracing::warn!(did = %did, "DID status changed on ledger but DID is not cached");
        }
        self.resolve(did).await
    }

    /// Verify a signature by `did`'s key over `challenge`.
    ///
    /// An unknown DID is `NotFound`. A malformed or wrong signature, or a
    /// DID that is not active, yields `valid: false` with a reason.
    pub async fn verify_did_proof(
        &self,
        did: &Did,
        challenge: &str,
        proof_hex: &str,
    ) -> Result<DidProofVerification, IdentityError> {
        let identity = self.resolve(did).await?;
        let rejected = |reason: String| DidProofVerification {
            did: did.clone(),
            valid: false,
            reason: Some(reason),
        };

        if !identity.status.is_active() {
            return Ok(rejected(format!("DID is {}", identity.status)));
        }
        let key = match Ed25519PublicKey::from_hex(&identity.public_key) {
            Ok(k) => k,
            Err(e) => return Ok(rejected(format!("registered key is unusable: {e}"))),
        };
        let signature = match Ed25519Signature::from_hex(proof_hex) {
            Ok(s) => s,
            Err(e) => return Ok(rejected(format!("malformed proof: {e}"))),
        };
        Ok(match key.verify(challenge.as_bytes(), &signature) {
            Ok(()) => DidProofVerification {
                did: did.clone(),
                valid: true,
                reason: None,
            },
            Err(e) => rejected(e.to_string()),
        })
    }

    /// Ledger-side checks for a claim. Returns the failed checks; empty
    /// means the ledger agrees with the claim.
    ///
    /// Missing records are reported as failures. Transport errors propagate.
    pub async fn verify_claim_on_ledger(
        &self,
        claim: &VerifiableClaim,
    ) -> Result<Vec<String>, IdentityError> {
        let mut errors = Vec::new();

        match self.ledger.claim_record(&claim.id).await {
            Ok(record) => {
                if record.status != tc_core::ClaimStatus::Active {
                    errors.push(format!("claim is {} on ledger", record.status));
                }
                if record.content_hash != claim.content_hash()? {
                    errors.push("claim content does not match ledger commitment".to_string());
                }
            }
            Err(LedgerError::NotFound { .. }) => {
                errors.push("claim is not registered on ledger".to_string());
            }
            Err(e) => return Err(e.into()),
        }

        match self.resolve(&claim.issuer).await {
            Ok(issuer) if issuer.status.is_active() => {}
            Ok(issuer) => errors.push(format!("issuer DID is {}", issuer.status)),
            Err(IdentityError::NotFound(_)) => {
                errors.push("issuer DID not found on ledger".to_string())
            }
            Err(e) => return Err(e),
        }

        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIdentityStore;
    use tc_ledger::MockLedger;

    fn registry() -> (Arc<MockLedger>, Arc<MemoryIdentityStore>, IdentityRegistry) {
        let ledger = Arc::new(MockLedger::default());
        let store = Arc::new(MemoryIdentityStore::new());
        let reg = IdentityRegistry::new(ledger.clone(), store.clone());
        (ledger, store, reg)
    }

    #[tokio::test]
    async fn create_did_shape_and_proof() {
        let (_l, _s, reg) = registry();
        let created = reg
            .create_did("hatchery", "Blue Lagoon", serde_json::json!({"name": "ignored", "region": "Ca Mau"}), None)
            .await
            .unwrap();
        let id = &created.identity;
        assert!(id.did.as_str().starts_with("did:tracepost:hatchery:"));
        assert_eq!(id.did.as_str().rsplit(':').next().unwrap(), &id.public_key[..16]);
        assert_eq!(id.metadata["name"], "Blue Lagoon");
        assert_eq!(id.metadata["type"], "hatchery");
        assert_eq!(id.metadata["region"], "Ca Mau");
        assert_eq!(id.status, DidStatus::Active);

        let proof = id.proof.as_ref().unwrap();
        assert_eq!(proof.proof_type, "Ed25519Signature2020");
        assert_eq!(proof.verification_method, format!("{}#keys-1", id.did));
        assert!(verify_self_proof(id));

        let restored = Ed25519KeyPair::from_secret_hex(&created.private_key).unwrap();
        assert_eq!(restored.public_key().to_hex(), id.public_key);
    }

    #[tokio::test]
    async fn same_name_twice_gives_two_dids() {
        let (_l, _s, reg) = registry();
        let a = reg.create_did("farm", "Same", serde_json::Value::Null, None).await.unwrap();
        let b = reg.create_did("farm", "Same", serde_json::Value::Null, None).await.unwrap();
        assert_ne!(a.identity.did, b.identity.did);
    }

    #[tokio::test]
    async fn ledger_failure_on_create_is_fatal_and_not_cached() {
        let (ledger, _s, reg) = registry();
        ledger.set_unreachable(true);
        let err = reg.create_did("farm", "X", serde_json::Value::Null, None).await.unwrap_err();
        assert!(matches!(err, IdentityError::Ledger(_)));
        ledger.set_unreachable(false);
        let page = reg.list(None, None, None, None).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn cache_failure_on_create_is_storage_error() {
        let (_l, store, reg) = registry();
        store.set_failing(true);
        let err = reg.create_did("farm", "X", serde_json::Value::Null, None).await.unwrap_err();
        assert!(matches!(err, IdentityError::Storage(_)));
    }

    #[tokio::test]
    async fn resolve_ignores_cache() {
        let (_l, store, reg) = registry();
        let other_ledger = Arc::new(MockLedger::default());
        let other = IdentityRegistry::new(other_ledger, store.clone());
        let created = other.create_did("farm", "Cached only", serde_json::Value::Null, None).await.unwrap();
        let err = reg.resolve(&created.identity.did).await.unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)));
    }

    #[tokio::test]
    async fn status_update_round_trip() {
        let (_l, _s, reg) = registry();
        let created = reg.create_did("farm", "F", serde_json::Value::Null, None).await.unwrap();
        let did = created.identity.did.clone();
        let updated = reg.update_status(&did, DidStatus::Suspended).await.unwrap();
        assert_eq!(updated.status, DidStatus::Suspended);
        let page = reg.list(None, Some(DidStatus::Suspended), None, None).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn list_validates_limit_and_filters_type() {
        let (_l, _s, reg) = registry();
        reg.create_did("farm", "A", serde_json::Value::Null, None).await.unwrap();
        reg.create_did("processor", "B", serde_json::Value::Null, None).await.unwrap();
        assert!(reg.list(None, None, None, Some(0)).await.is_err());
        assert!(reg.list(None, None, None, Some(101)).await.is_err());
        assert!(reg.list(None, None, Some(0), None).await.is_err());
        let farms = reg.list(Some("farm".into()), None, None, None).await.unwrap();
        assert_eq!(farms.total, 1);
        assert_eq!(farms.limit, 20);
    }

    #[tokio::test]
    async fn did_proof_verification() {
        let (_l, _s, reg) = registry();
        let created = reg.create_did("farm", "F", serde_json::Value::Null, None).await.unwrap();
        let did = created.identity.did.clone();
        let key = Ed25519KeyPair::from_secret_hex(&created.private_key).unwrap();
        let sig = key.sign(b"nonce-123").to_hex();

        assert!(reg.verify_did_proof(&did, "nonce-123", &sig).await.unwrap().valid);
        assert!(!reg.verify_did_proof(&did, "nonce-124", &sig).await.unwrap().valid);
        assert!(!reg.verify_did_proof(&did, "nonce-123", "zz").await.unwrap().valid);

        reg.update_status(&did, DidStatus::Revoked).await.unwrap();
        let v = reg.verify_did_proof(&did, "nonce-123", &sig).await.unwrap();
        assert!(!v.valid);
        assert_eq!(v.reason.as_deref(), Some("DID is revoked"));
    }

    #[tokio::test]
    async fn rejects_non_object_metadata_and_bad_type() {
        let (_l, _s, reg) = registry();
        assert!(matches!(
            reg.create_did("farm", "F", serde_json::json!([1]), None).await,
            Err(IdentityError::Validation(_))
        ));
        assert!(matches!(
            reg.create_did("a:b", "F", serde_json::Value::Null, None).await,
            Err(IdentityError::Validation(_))
        ));
        assert!(matches!(
            reg.create_did("farm", "  ", serde_json::Value::Null, None).await,
            Err(IdentityError::Validation(_))
        ));
    }
}
