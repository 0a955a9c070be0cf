//! # Verifier
//!
//! Decides whether a record's current content is what was anchored.
//!
//! The current payload is re-hashed with the same canonicalization the
//! writer used and compared against the subject's anchors, then each
//! matching anchor is checked against the ledger's own commitment.
//!
//! | Condition | Discrepancy | Effect |
//! |---|---|---|
//! | no anchors | `NoAnchorFound` | invalid |
//! | no stored hash equals current | `HashMismatch` (latest stored vs current) | invalid |
//! | ledger commitment differs | `HashMismatch` with `tx_id` | that anchor unconfirmed |
//! | ledger has no such tx | `TxNotFound` | that anchor unconfirmed |
//! | ledger unreachable | `LedgerUnreachable` | result inconclusive |
//!
//! Storage failures abort with an error. Ledger failures never do.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tc_core::{sha256_hex, CanonicalBytes, EntityRef, TxId};
use tc_ledger::{Ledger, LedgerError, LedgerTransaction, TxType};

use crate::domain::DomainStore;
use crate::error::AnchorError;
use crate::store::{AnchorRecord, AnchorStore};

/// A reason a verification did not come back clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    NoAnchorFound,
    HashMismatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        tx_id: Option<TxId>,
        expected: String,
        got: String,
    },
    TxNotFound {
        tx_id: TxId,
    },
    LedgerUnreachable {
        tx_id: TxId,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub subject: EntityRef,
    pub is_valid: bool,
    pub discrepancies: Vec<Discrepancy>,
    pub recomputed_hash: String,
    pub anchors_checked: usize,
    /// False when the ledger could not be asked and no anchor was confirmed.
    pub conclusive: bool,
    /// Anchor whose transaction confirmed the current content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_tx: Option<TxId>,
}

/// Aggregate view of a batch's ledger chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainSummary {
    pub tx_count: usize,
    pub first_tx: Option<TxId>,
    pub latest_tx: Option<TxId>,
    pub first_at: Option<DateTime<Utc>>,
    pub latest_at: Option<DateTime<Utc>>,
    pub has_create: bool,
    pub status_changes: usize,
}

impl ChainSummary {
    /// Summarize transactions given in acceptance order.
    pub fn from_transactions(txs: &[LedgerTransaction]) -> Self {
        let first = txs.first();
        let latest = txs.last();
        Self {
            tx_count: txs.len(),
            first_tx: first.map(|t| t.tx_id.clone()),
            latest_tx: latest.map(|t| t.tx_id.clone()),
            first_at: first.map(|t| t.timestamp),
            latest_at: latest.map(|t| t.timestamp),
            has_create: txs.iter().any(|t| t.tx_type == TxType::CreateBatch),
            status_changes: txs
                .iter()
                .filter(|t| t.tx_type == TxType::UpdateBatchStatus)
                .count(),
        }
    }
}

/// Verification of a batch's current row plus its chain context.
#[derive(Debug, Clone, Serialize)]
pub struct BatchVerification {
    pub batch_id: i64,
    pub verification: VerificationResult,
    pub anchors: Vec<AnchorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_summary: Option<ChainSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct Verifier {
    ledger: Arc<dyn Ledger>,
    anchors: Arc<dyn AnchorStore>,
}

impl Verifier {
    pub fn new(ledger: Arc<dyn Ledger>, anchors: Arc<dyn AnchorStore>) -> Self {
        Self { ledger, anchors }
    }

    /// Verify `current_payload` for `subject` against its anchors.
    pub async fn verify(
        &self,
        subject: EntityRef,
        current_payload: &serde_json::Value,
    ) -> Result<VerificationResult, AnchorError> {
        let recomputed_hash = sha256_hex(&CanonicalBytes::new(current_payload)?);
        let anchors = self.anchors.anchors_for(&subject).await?;
        Ok(self.check(subject, recomputed_hash, &anchors).await)
    }

    async fn check(
        &self,
        subject: EntityRef,
        recomputed_hash: String,
        anchors: &[AnchorRecord],
    ) -> VerificationResult {
        let mut result = VerificationResult {
            subject,
            is_valid: false,
            discrepancies: Vec::new(),
            recomputed_hash,
            anchors_checked: anchors.len(),
            conclusive: true,
            confirmed_tx: None,
        };

        let Some(latest) = anchors.last() else {
            result.discrepancies.push(Discrepancy::NoAnchorFound);
            return result;
        };

        let matching: Vec<&AnchorRecord> = anchors
            .iter()
            .filter(|a| a.metadata_hash == result.recomputed_hash)
            .collect();
        if matching.is_empty() {
            result.discrepancies.push(Discrepancy::HashMismatch {
                tx_id: Some(latest.tx_id.clone()),
                expected: latest.metadata_hash.clone(),
                got: result.recomputed_hash.clone(),
            });
            return result;
        }

        let mut unreachable = false;
        // Newest first: the latest matching anchor is the likeliest to confirm.
        for anchor in matching.iter().rev() {
            match self.ledger.get_transaction(&anchor.tx_id).await {
                Ok(tx) if tx.content_hash == result.recomputed_hash => {
                    result.is_valid = true;
                    result.confirmed_tx = Some(anchor.tx_id.clone());
                    break;
                }
                Ok(tx) => result.discrepancies.push(Discrepancy::HashMismatch {
                    tx_id: Some(anchor.tx_id.clone()),
                    expected: tx.content_hash,
                    got: result.recomputed_hash.clone(),
                }),
                Err(LedgerError::NotFound { .. }) => {
                    result.discrepancies.push(Discrepancy::TxNotFound {
                        tx_id: anchor.tx_id.clone(),
                    })
                }
                Err(e) => {
                    tracing::warn!(subject = %subject, tx_id = %anchor.tx_id, error = %e, "ledger lookup failed during verification");
                    unreachable = true;
                    result.discrepancies.push(Discrepancy::LedgerUnreachable {
                        tx_id: anchor.tx_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        result.conclusive = result.is_valid || !unreachable;
        result
    }

    /// Verify the current row of a batch and attach its chain summary.
    ///
    /// A missing or retired batch is `NotFound`. The chain summary is
    /// best-effort.
    pub async fn verify_batch(
        &self,
        domain: &dyn DomainStore,
        batch_id: i64,
    ) -> Result<BatchVerification, AnchorError> {
        let batch = domain
            .batch(batch_id)
            .await?
            .ok_or_else(|| AnchorError::batch_not_found(batch_id))?;

        let subject = batch.entity();
        let recomputed_hash = sha256_hex(&CanonicalBytes::new(&batch.anchor_payload())?);
        let anchors = self.anchors.anchors_for(&subject).await?;
        let verification = self.check(subject, recomputed_hash, &anchors).await;

        let mut warnings = Vec::new();
        let chain_summary = match self.ledger.list_transactions(&batch.chain()).await {
            Ok(txs) => Some(ChainSummary::from_transactions(&txs)),
            Err(e) => {
                tracing::warn!(batch_id, error = %e, "chain summary unavailable");
                warnings.push(format!("chain summary unavailable: {e}"));
                None
            }
        };

        Ok(BatchVerification {
            batch_id,
            verification,
            anchors,
            chain_summary,
            warnings,
        })
    }
}
