//! # Audit Trail Builder
//!
//! Assembles the full history of a batch from both stores:
//!
//! 1. the batch's active events, ascending by timestamp;
//! 2. each event's anchors, ascending by `created_at`;
//! 3. the ledger's transaction list for the batch chain (required);
//! 4. the ledger's chain snapshot (best-effort, a warning on failure).
//!
//! The two stores are not reconciled. A transaction with no anchor row, or
//! an event with no anchor, is reported as-is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tc_ledger::{ChainState, Ledger, LedgerTransaction};

use crate::domain::{Batch, DomainStore, Event};
use crate::error::AnchorError;
use crate::store::{AnchorRecord, AnchorStore};

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    #[serde(flatten)]
    pub event: Event,
    pub anchors: Vec<AnchorRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub batch: Batch,
    pub events: Vec<AuditEvent>,
    pub ledger_transactions: Vec<LedgerTransaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_state: Option<ChainState>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuditTrailBuilder {
    ledger: Arc<dyn Ledger>,
    domain: Arc<dyn DomainStore>,
    anchors: Arc<dyn AnchorStore>,
}

impl AuditTrailBuilder {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        domain: Arc<dyn DomainStore>,
        anchors: Arc<dyn AnchorStore>,
    ) -> Self {
        Self {
            ledger,
            domain,
            anchors,
        }
    }

    pub async fn build(&self, batch_id: i64) -> Result<AuditTrail, AnchorError> {
        let batch = self
            .domain
            .batch(batch_id)
            .await?
            .ok_or_else(|| AnchorError::batch_not_found(batch_id))?;

        let mut events = self.domain.events_for_batch(batch_id).await?;
        events.sort_by_key(|e| (e.timestamp, e.id));

        let mut audit_events = Vec::with_capacity(events.len());
        for event in events {
            let mut anchors = self.anchors.anchors_for(&event.entity()).await?;
            anchors.sort_by_key(|a| a.created_at);
            audit_events.push(AuditEvent { event, anchors });
        }

        let chain = batch.chain();
        let ledger_transactions = self.ledger.list_transactions(&chain).await?;

        let mut warnings = Vec::new();
        let chain_state = match self.ledger.chain_state(&chain).await {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(batch_id, chain = %chain, error = %e, "chain snapshot unavailable for audit");
                warnings.push(format!("chain state unavailable: {e}"));
                None
            }
        };

        Ok(AuditTrail {
            batch,
            events: audit_events,
            ledger_transactions,
            chain_state,
            warnings,
            generated_at: Utc::now(),
        })
    }
}
