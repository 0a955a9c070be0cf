//! Relational persistence for identities and claims.
//!
//! The identity table is a listing cache. Resolution never reads it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tc_core::{ClaimId, ClaimStatus, Did, DidStatus, StoreError};

use crate::types::{DecentralizedIdentity, IdentityPage, IdentityQuery, VerifiableClaim};

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn insert_identity(&self, identity: &DecentralizedIdentity) -> Result<(), StoreError>;

    /// Returns false when the DID is not cached.
    async fn update_identity_status(
        &self,
        did: &Did,
        status: DidStatus,
        updated: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Page of cached identities, newest first.
    async fn list_identities(&self, query: &IdentityQuery) -> Result<IdentityPage, StoreError>;
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn insert_claim(&self, claim: &VerifiableClaim) -> Result<(), StoreError>;

    async fn claim(&self, id: &ClaimId) -> Result<Option<VerifiableClaim>, StoreError>;

    /// Returns false when the claim does not exist.
    async fn set_claim_status(&self, id: &ClaimId, status: ClaimStatus) -> Result<bool, StoreError>;
}
