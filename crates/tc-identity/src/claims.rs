//! # Verifiable Claims
//!
//! Claims are issued by one DID about another. The ledger holds a record
//! with the canonical content hash; the relational store holds the full
//! document. A claim is valid only while the ledger record is active,
//! matches the stored content, names an active issuer, and has not
//! expired.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tc_core::{now_micros, ClaimId, ClaimStatus, Did, ValidationError};
use tc_ledger::{Ledger, LedgerError};

use crate::error::IdentityError;
use crate::registry::IdentityRegistry;
use crate::store::ClaimStore;
use crate::types::{ClaimVerification, VerifiableClaim};

#[derive(Clone)]
pub struct ClaimRegistry {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ClaimStore>,
    identities: IdentityRegistry,
}

impl ClaimRegistry {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ClaimStore>,
        identities: IdentityRegistry,
    ) -> Self {
        Self {
            ledger,
            store,
            identities,
        }
    }

    /// Issue a claim from `issuer` about `subject`, valid for `expiry_days`.
    ///
    /// Both DIDs must resolve on the ledger and the issuer must be active.
    pub async fn issue(
        &self,
        issuer: &Did,
        subject: &Did,
        claim_type: &str,
        claims: serde_json::Value,
        expiry_days: i64,
    ) -> Result<VerifiableClaim, IdentityError> {
        let claim_type = claim_type.trim();
        if claim_type.is_empty() {
            return Err(ValidationError::field("claim_type", "must not be empty").into());
        }
        if !claims.is_object() {
            return Err(ValidationError::field("claims", "must be a JSON object").into());
        }
        if expiry_days < 1 {
            return Err(ValidationError::field("expiry_days", "must be at least 1").into());
        }

        let issuer_doc = self.require_did(issuer, "issuer_did").await?;
        if !issuer_doc.status.is_active() {
            return Err(ValidationError::field(
                "issuer_did",
                format!("issuer is {}", issuer_doc.status),
            )
            .into());
        }
        self.require_did(subject, "subject_did").await?;

        let issuance_date = now_micros();
        let expiry_date = Duration::try_days(expiry_days)
            .and_then(|d| issuance_date.checked_add_signed(d))
            .ok_or_else(|| ValidationError::field("expiry_days", "is out of range"))?;

        let claim = VerifiableClaim {
            id: ClaimId::new(),
            claim_type: claim_type.to_string(),
            issuer: issuer.clone(),
            subject: subject.clone(),
            claims,
            issuance_date,
            expiry_date,
            status: ClaimStatus::Active,
        };

        let receipt = self.ledger.register_claim(&claim.to_ledger()?).await?;
        tracing::info!(claim_id = %claim.id, issuer = %issuer, tx_id = %receipt.tx_id, "claim registered on ledger");

        if let Err(e) = self.store.insert_claim(&claim).await {
            tracing::error!(claim_id = %claim.id, error = %e, "claim registered on ledger but not stored");
            return Err(e.into());
        }
        Ok(claim)
    }

    pub async fn get(&self, id: &ClaimId) -> Result<VerifiableClaim, IdentityError> {
        self.store
            .claim(id)
            .await?
            .ok_or_else(|| IdentityError::NotFound(format!("claim {id}")))
    }

    /// Check a stored claim against the ledger and its expiry.
    pub async fn verify(&self, id: &ClaimId) -> Result<ClaimVerification, IdentityError> {
        self.verify_at(id, now_micros()).await
    }

    /// [`verify`](Self::verify) with expiry judged at `validation_time`.
    pub async fn verify_at(
        &self,
        id: &ClaimId,
        validation_time: DateTime<Utc>,
    ) -> Result<ClaimVerification, IdentityError> {
        let claim = self.get(id).await?;
        let mut errors = self.identities.verify_claim_on_ledger(&claim).await?;
        if claim.is_expired_at(validation_time) {
            errors.push(format!("claim expired at {}", claim.expiry_date.to_rfc3339()));
        }
        Ok(ClaimVerification {
            claim_id: *id,
            is_valid: errors.is_empty(),
            validation_time,
            errors,
        })
    }

    /// Revoke a claim. Only its issuer may do so.
    pub async fn revoke(
        &self,
        id: &ClaimId,
        requester: &Did,
    ) -> Result<VerifiableClaim, IdentityError> {
        let mut claim = self.get(id).await?;
        if &claim.issuer != requester {
            return Err(IdentityError::Forbidden(format!(
                "only the issuer may revoke claim {id}"
            )));
        }
        if claim.status == ClaimStatus::Revoked {
            return Err(ValidationError::field("claim_id", "claim is already revoked").into());
        }

        let receipt = match self.ledger.revoke_claim(id).await {
            Ok(r) => r,
            Err(LedgerError::NotFound { .. }) => {
                return Err(IdentityError::NotFound(format!("claim {id} on ledger")))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(claim_id = %id, tx_id = %receipt.tx_id, "claim revoked on ledger");

        self.store.set_claim_status(id, ClaimStatus::Revoked).await?;
        claim.status = ClaimStatus::Revoked;
        Ok(claim)
    }

    async fn require_did(
        &self,
        did: &Did,
        field: &'static str,
    ) -> Result<crate::types::DecentralizedIdentity, IdentityError> {
        match self.identities.resolve(did).await {
            Ok(doc) => Ok(doc),
            Err(IdentityError::NotFound(_)) => {
                Err(ValidationError::field(field, format!("{did} is not registered")).into())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryClaimStore, MemoryIdentityStore};
    use tc_core::DidStatus;
    use tc_ledger::MockLedger;

    struct Fixture {
        ledger: Arc<MockLedger>,
        store: Arc<MemoryClaimStore>,
        identities: IdentityRegistry,
        claims: ClaimRegistry,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MockLedger::default());
        let store = Arc::new(MemoryClaimStore::new());
        let identities =
            IdentityRegistry::new(ledger.clone(), Arc::new(MemoryIdentityStore::new()));
        let claims = ClaimRegistry::new(ledger.clone(), store.clone(), identities.clone());
        Fixture {
            ledger,
            store,
            identities,
            claims,
        }
    }

    async fn did(f: &Fixture, kind: &str) -> Did {
        f.identities
            .create_did(kind, kind, serde_json::Value::Null, None)
            .await
            .unwrap()
            .identity
            .did
    }

    #[tokio::test]
    async fn issue_then_verify() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let subject = did(&f, "farm").await;
        let claim = f
            .claims
            .issue(&issuer, &subject, "OrganicCertification", serde_json::json!({"standard": "ASC"}), 365)
            .await
            .unwrap();
        assert_eq!(claim.status, ClaimStatus::Active);
        assert_eq!(claim.expiry_date - claim.issuance_date, Duration::days(365));

        let v = f.claims.verify(&claim.id).await.unwrap();
        assert!(v.is_valid, "{:?}", v.errors);
        assert!(v.errors.is_empty());
    }

    #[tokio::test]
    async fn issue_requires_registered_dids_and_active_issuer() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let ghost = Did::parse("did:tracepost:farm:0000000000000000").unwrap();
        let err = f
            .claims
            .issue(&issuer, &ghost, "X", serde_json::json!({}), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));

        let subject = did(&f, "farm").await;
        f.identities.update_status(&issuer, DidStatus::Suspended).await.unwrap();
        let err = f
            .claims
            .issue(&issuer, &subject, "X", serde_json::json!({}), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));
    }

    #[tokio::test]
    async fn issue_rejects_bad_input() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let subject = did(&f, "farm").await;
        for (ty, claims, days) in [
            ("", serde_json::json!({}), 1),
            ("X", serde_json::json!("text"), 1),
            ("X", serde_json::json!({}), 0),
            ("X", serde_json::json!({}), i64::MAX),
        ] {
            let err = f.claims.issue(&issuer, &subject, ty, claims, days).await.unwrap_err();
            assert!(matches!(err, IdentityError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn expiry_alone_invalidates_an_untouched_claim() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let subject = did(&f, "farm").await;
        let claim = f
            .claims
            .issue(&issuer, &subject, "X", serde_json::json!({}), 1)
            .await
            .unwrap();

        let at_expiry = f.claims.verify_at(&claim.id, claim.expiry_date).await.unwrap();
        assert!(at_expiry.is_valid, "{:?}", at_expiry.errors);

        let after = claim.expiry_date + Duration::seconds(1);
        let v = f.claims.verify_at(&claim.id, after).await.unwrap();
        assert!(!v.is_valid);
        assert_eq!(v.validation_time, after);
        assert_eq!(
            v.errors,
            vec![format!("claim expired at {}", claim.expiry_date.to_rfc3339())]
        );
    }

    #[tokio::test]
    async fn tampered_content_is_detected() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let subject = did(&f, "farm").await;
        let claim = f
            .claims
            .issue(&issuer, &subject, "X", serde_json::json!({"grade": "A"}), 30)
            .await
            .unwrap();
        f.store.tamper(&claim.id, |c| c.claims = serde_json::json!({"grade": "A+"}));
        let v = f.claims.verify(&claim.id).await.unwrap();
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("does not match")));
    }

    #[tokio::test]
    async fn revoke_by_issuer_only() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let subject = did(&f, "farm").await;
        let claim = f
            .claims
            .issue(&issuer, &subject, "X", serde_json::json!({}), 30)
            .await
            .unwrap();

        let err = f.claims.revoke(&claim.id, &subject).await.unwrap_err();
        assert!(matches!(err, IdentityError::Forbidden(_)));
        assert_eq!(f.claims.get(&claim.id).await.unwrap().status, ClaimStatus::Active);

        let revoked = f.claims.revoke(&claim.id, &issuer).await.unwrap();
        assert_eq!(revoked.status, ClaimStatus::Revoked);
        assert_eq!(f.claims.get(&claim.id).await.unwrap().status, ClaimStatus::Revoked);

        let v = f.claims.verify(&claim.id).await.unwrap();
        assert!(!v.is_valid);
        assert!(v.errors.iter().any(|e| e.contains("revoked")));

        let again = f.claims.revoke(&claim.id, &issuer).await.unwrap_err();
        assert!(matches!(again, IdentityError::Validation(_)));
    }

    #[tokio::test]
    async fn revoke_ledger_failure_leaves_claim_active() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let subject = did(&f, "farm").await;
        let claim = f
            .claims
            .issue(&issuer, &subject, "X", serde_json::json!({}), 30)
            .await
            .unwrap();
        f.ledger.set_unreachable(true);
        let err = f.claims.revoke(&claim.id, &issuer).await.unwrap_err();
        assert!(matches!(err, IdentityError::Ledger(_)));
        assert_eq!(f.claims.get(&claim.id).await.unwrap().status, ClaimStatus::Active);
    }

    #[tokio::test]
    async fn verify_with_ledger_down_is_an_error() {
        let f = fixture();
        let issuer = did(&f, "certifier").await;
        let subject = did(&f, "farm").await;
        let claim = f
            .claims
            .issue(&issuer, &subject, "X", serde_json::json!({}), 30)
            .await
            .unwrap();
        f.ledger.set_unreachable(true);
        assert!(matches!(
            f.claims.verify(&claim.id).await,
            Err(IdentityError::Ledger(_))
        ));
    }

    #[tokio::test]
    async fn unknown_claim_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.claims.get(&ClaimId::new()).await,
            Err(IdentityError::NotFound(_))
        ));
    }
}
