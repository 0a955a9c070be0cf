//! In-memory identity and claim stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tc_core::{ClaimId, ClaimStatus, Did, DidStatus, StoreError};

use crate::store::{ClaimStore, IdentityStore};
use crate::types::{DecentralizedIdentity, IdentityPage, IdentityQuery, VerifiableClaim};

#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identities: RwLock<Vec<DecentralizedIdentity>>,
    failing: AtomicBool,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database("in-memory identity store is failing".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn insert_identity(&self, identity: &DecentralizedIdentity) -> Result<(), StoreError> {
        self.check()?;
        let mut identities = self.identities.write();
        if identities.iter().any(|i| i.did == identity.did) {
            return Err(StoreError::Duplicate(identity.did.to_string()));
        }
        identities.push(identity.clone());
        Ok(())
    }

    async fn update_identity_status(
        &self,
        did: &Did,
        status: DidStatus,
        updated: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.check()?;
        match self.identities.write().iter_mut().find(|i| &i.did == did) {
            Some(identity) => {
                identity.status = status;
                identity.updated = updated;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_identities(&self, query: &IdentityQuery) -> Result<IdentityPage, StoreError> {
        self.check()?;
        let mut matching: Vec<DecentralizedIdentity> = self
            .identities
            .read()
            .iter()
            .filter(|i| {
                query
                    .entity_type
                    .as_deref()
                    .map_or(true, |t| i.entity_type() == Some(t))
                    && query.status.map_or(true, |s| i.status == s)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created.cmp(&a.created));

        let total = matching.len() as u64;
        let offset = (query.page.saturating_sub(1) as usize).saturating_mul(query.limit as usize);
        let identities = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();
        Ok(IdentityPage {
            identities,
            total,
            page: query.page,
            limit: query.limit,
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    claims: RwLock<HashMap<ClaimId, VerifiableClaim>>,
    failing: AtomicBool,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Overwrite a stored claim without touching the ledger.
    pub fn tamper(&self, id: &ClaimId, f: impl FnOnce(&mut VerifiableClaim)) -> bool {
        match self.claims.write().get_mut(id) {
            Some(c) => {
                f(c);
                true
            }
            None => false,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database("in-memory claim store is failing".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn insert_claim(&self, claim: &VerifiableClaim) -> Result<(), StoreError> {
        self.check()?;
        let mut claims = self.claims.write();
        if claims.contains_key(&claim.id) {
            return Err(StoreError::Duplicate(claim.id.to_string()));
        }
        claims.insert(claim.id, claim.clone());
        Ok(())
    }

    async fn claim(&self, id: &ClaimId) -> Result<Option<VerifiableClaim>, StoreError> {
        self.check()?;
        Ok(self.claims.read().get(id).cloned())
    }

    async fn set_claim_status(&self, id: &ClaimId, status: ClaimStatus) -> Result<bool, StoreError> {
        self.check()?;
        match self.claims.write().get_mut(id) {
            Some(c) => {
                c.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
