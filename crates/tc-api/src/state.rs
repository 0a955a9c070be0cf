//! # Application State
//!
//! One ledger client and one set of stores, shared by every handler. The
//! services are cheap clones over `Arc`s.

use std::sync::Arc;

use sqlx::PgPool;
use tc_anchor::{
    AnchorSearch, AnchorStore, AnchorWriter, AuditTrailBuilder, DomainStore, MemoryAnchorStore,
    MemoryDomainStore, RecordService, Verifier,
};
use tc_identity::{
    ClaimRegistry, ClaimStore, IdentityRegistry, IdentityStore, MemoryClaimStore,
    MemoryIdentityStore,
};
use tc_ledger::{Ledger, LedgerConfig};
use tc_proof::ProofService;

use crate::db;

/// Backing stores for the services.
#[derive(Clone)]
pub struct Stores {
    pub domain: Arc<dyn DomainStore>,
    pub anchors: Arc<dyn AnchorStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub claims: Arc<dyn ClaimStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            domain: Arc::new(MemoryDomainStore::new()),
            anchors: Arc::new(MemoryAnchorStore::new()),
            identities: Arc::new(MemoryIdentityStore::new()),
            claims: Arc::new(MemoryClaimStore::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            domain: Arc::new(db::domain::PgDomainStore::new(pool.clone())),
            anchors: Arc::new(db::anchors::PgAnchorStore::new(pool.clone())),
            identities: Arc::new(db::identities::PgIdentityStore::new(pool.clone())),
            claims: Arc::new(db::identities::PgClaimStore::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub domain: Arc<dyn DomainStore>,
    pub records: RecordService,
    pub verifier: Verifier,
    pub audit: AuditTrailBuilder,
    pub search: AnchorSearch,
    pub identities: IdentityRegistry,
    pub claims: ClaimRegistry,
    pub proofs: ProofService,
    /// Present when running on Postgres; readiness pings it.
    pub pool: Option<PgPool>,
}

impl AppState {
    /// State for a ledger client on the default configuration.
    pub fn new(ledger: Arc<dyn Ledger>, stores: Stores, actor: impl Into<String>) -> Self {
        let writer = AnchorWriter::new(ledger.clone(), stores.anchors.clone());
        Self::build(ledger, stores, writer, actor.into())
    }

    /// State for a ledger client built from `config`. The anchor writer
    /// waits out the client's full retry budget and writes as
    /// `config.actor`.
    pub fn from_ledger_config(ledger: Arc<dyn Ledger>, stores: Stores, config: &LedgerConfig) -> Self {
        let writer = AnchorWriter::for_config(ledger.clone(), stores.anchors.clone(), config);
        Self::build(ledger, stores, writer, config.actor.clone())
    }

    fn build(ledger: Arc<dyn Ledger>, stores: Stores, writer: AnchorWriter, actor: String) -> Self {
        let identities = IdentityRegistry::new(ledger.clone(), stores.identities.clone());
        Self {
            records: RecordService::new(stores.domain.clone(), writer, actor),
            verifier: Verifier::new(ledger.clone(), stores.anchors.clone()),
            audit: AuditTrailBuilder::new(
                ledger.clone(),
                stores.domain.clone(),
                stores.anchors.clone(),
            ),
            search: AnchorSearch::new(stores.anchors.clone(), stores.domain.clone()),
            claims: ClaimRegistry::new(ledger.clone(), stores.claims, identities.clone()),
            identities,
            proofs: ProofService::new(),
            domain: stores.domain,
            ledger,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tc_ledger::MockLedger;

    #[test]
    fn writer_timeout_follows_ledger_config() {
        let config = LedgerConfig {
            timeout_secs: 3,
            max_retries: 0,
            ..LedgerConfig::default()
        };
        let state =
            AppState::from_ledger_config(Arc::new(MockLedger::default()), Stores::in_memory(), &config);
        assert_eq!(
            state.records.writer().submit_timeout(),
            Duration::from_secs(3) + tc_anchor::SUBMIT_GRACE
        );

        let defaults = AppState::new(Arc::new(MockLedger::default()), Stores::in_memory(), "api");
        assert_eq!(
            defaults.records.writer().submit_timeout(),
            tc_anchor::submit_timeout_for(&LedgerConfig::default())
        );
    }
}
