//! # Anchor Writer
//!
//! Commits the canonical hash of a domain mutation to the ledger and records
//! the resulting transaction as an [`AnchorRecord`].
//!
//! ## Outbox
//!
//! A mutation hands the writer an [`AnchorIntent`] after its own row is
//! committed. [`AnchorWriter::enqueue`] spawns the submission onto the tokio
//! runtime and returns a [`PendingAnchor`]. The caller may await the
//! outcome or drop the handle; either way the submission and the anchor
//! insert run to completion.
//!
//! ## Ordering
//!
//! Each subject `(table, id)` has its own async lock, held from ledger
//! submission through the anchor insert. `created_at` is assigned under that
//! lock and is strictly greater than the subject's previous anchor, so
//! ordering a subject's anchors by `created_at` reproduces ledger acceptance
//! order. Different subjects never contend.
//!
//! ## Failure
//!
//! Nothing here returns an error to the mutation. A ledger failure leaves the
//! domain row committed and unanchored; an anchor-insert failure after the
//! ledger accepted leaves a transaction with no relational link. Both are
//! logged and reported in [`AnchorOutcome`]. Failed anchors are not retried.
//!
//! The submission bound is the ledger client's own worst case plus
//! [`SUBMIT_GRACE`]. The client then always gives its answer first and the
//! writer never abandons a write that is still in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tc_core::{now_micros, sha256_hex, CanonicalBytes, ChainId, EntityRef, TxId};
use tc_ledger::{Ledger, LedgerConfig, LedgerError, TransactionRequest, TxType};
use tokio::task::JoinHandle;

use crate::store::{AnchorRecord, AnchorStore};

/// Slack on top of the ledger client's worst case.
pub const SUBMIT_GRACE: Duration = Duration::from_secs(2);

/// Bound on one submission made through a client built from `config`.
pub fn submit_timeout_for(config: &LedgerConfig) -> Duration {
    config.call_budget().saturating_add(SUBMIT_GRACE)
}

/// A request to anchor one mutation.
#[derive(Debug, Clone)]
pub struct AnchorIntent {
    pub subject: EntityRef,
    pub chain: ChainId,
    pub actor: String,
    pub tx_type: TxType,
    pub payload: serde_json::Value,
}

/// What happened to an [`AnchorIntent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnchorOutcome {
    Anchored { anchor: AnchorRecord },
    /// The ledger did not accept the transaction.
    LedgerFailed { warning: String },
    /// The ledger accepted but the anchor row could not be written.
    StoreFailed { tx_id: TxId, warning: String },
    /// The payload could not be hashed or the task did not finish.
    Aborted { warning: String },
}

impl AnchorOutcome {
    pub fn anchor(&self) -> Option<&AnchorRecord> {
        match self {
            Self::Anchored { anchor } => Some(anchor),
            _ => None,
        }
    }

    pub fn tx_id(&self) -> Option<&TxId> {
        match self {
            Self::Anchored { anchor } => Some(&anchor.tx_id),
            Self::StoreFailed { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Anchored { .. } => None,
            Self::LedgerFailed { warning }
            | Self::StoreFailed { warning, .. }
            | Self::Aborted { warning } => Some(warning),
        }
    }
}

/// Handle to a submission running on the runtime.
#[derive(Debug)]
pub struct PendingAnchor {
    subject: EntityRef,
    handle: JoinHandle<AnchorOutcome>,
}

impl PendingAnchor {
    pub fn subject(&self) -> EntityRef {
        self.subject
    }

    /// Wait for the outcome. Dropping the handle instead detaches the task.
    pub async fn outcome(self) -> AnchorOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(subject = %self.subject, error = %e, "anchor task did not complete");
                AnchorOutcome::Aborted {
                    warning: format!("anchor task did not complete: {e}"),
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct SubjectClock {
    last: Option<DateTime<Utc>>,
    loaded: bool,
}

impl SubjectClock {
    /// A timestamp strictly after the previous one.
    fn next_after(&self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        match self.last {
            Some(last) if candidate <= last => last + chrono::Duration::microseconds(1),
            _ => candidate,
        }
    }
}

type SubjectLock = Arc<tokio::sync::Mutex<SubjectClock>>;

struct Inner {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn AnchorStore>,
    locks: Mutex<HashMap<EntityRef, SubjectLock>>,
    submit_timeout: Duration,
}

/// Cloneable handle to the anchoring outbox.
#[derive(Clone)]
pub struct AnchorWriter {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AnchorWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorWriter")
            .field("subjects_in_flight", &self.inner.locks.lock().len())
            .field("submit_timeout", &self.inner.submit_timeout)
            .finish()
    }
}

impl AnchorWriter {
    /// Writer for a client on the default ledger configuration.
    pub fn new(ledger: Arc<dyn Ledger>, store: Arc<dyn AnchorStore>) -> Self {
        Self::for_config(ledger, store, &LedgerConfig::default())
    }

    pub fn for_config(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn AnchorStore>,
        config: &LedgerConfig,
    ) -> Self {
        Self::with_submit_timeout(ledger, store, submit_timeout_for(config))
    }

    pub fn with_submit_timeout(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn AnchorStore>,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger,
                store,
                locks: Mutex::new(HashMap::new()),
                submit_timeout,
            }),
        }
    }

    pub fn submit_timeout(&self) -> Duration {
        self.inner.submit_timeout
    }

    /// Start anchoring `intent` on the runtime.
    pub fn enqueue(&self, intent: AnchorIntent) -> PendingAnchor {
        let subject = intent.subject;
        let lock = self.inner.lock_for(subject);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.run(lock, intent).await });
        PendingAnchor { subject, handle }
    }

    /// Enqueue and wait for the outcome.
    pub async fn anchor(&self, intent: AnchorIntent) -> AnchorOutcome {
        self.enqueue(intent).outcome().await
    }
}

impl Inner {
    fn lock_for(&self, subject: EntityRef) -> SubjectLock {
        Arc::clone(self.locks.lock().entry(subject).or_default())
    }

    /// Drop the subject's lock entry when no other task holds it.
    fn release(&self, subject: EntityRef, lock: &SubjectLock) {
        let mut locks = self.locks.lock();
        // One reference in the map, one held by the caller.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(&subject);
        }
    }

    async fn run(&self, lock: SubjectLock, intent: AnchorIntent) -> AnchorOutcome {
        let subject = intent.subject;
        let metadata_hash = match CanonicalBytes::new(&intent.payload) {
            Ok(bytes) => sha256_hex(&bytes),
            Err(e) => {
                tracing::error!(subject = %subject, error = %e, "cannot canonicalize anchor payload");
                return AnchorOutcome::Aborted {
                    warning: format!("payload could not be canonicalized: {e}"),
                };
            }
        };

        let outcome = {
            let mut clock = lock.lock().await;
            if !clock.loaded {
                match self.store.latest_created_at(&subject).await {
                    Ok(last) => {
                        clock.last = last;
                        clock.loaded = true;
                    }
                    Err(e) => {
                        tracing::warn!(subject = %subject, error = %e, "could not load previous anchor time");
                    }
                }
            }
            self.submit_and_record(&mut clock, intent, metadata_hash).await
        };

        self.release(subject, &lock);
        outcome
    }

    async fn submit_and_record(
        &self,
        clock: &mut SubjectClock,
        intent: AnchorIntent,
        metadata_hash: String,
    ) -> AnchorOutcome {
        let subject = intent.subject;
        let request = TransactionRequest {
            chain: intent.chain,
            tx_type: intent.tx_type,
            actor: intent.actor,
            payload: intent.payload,
            content_hash: metadata_hash.clone(),
        };

        let submitted =
            tokio::time::timeout(self.submit_timeout, self.ledger.submit_transaction(&request)).await;
        let receipt = match submitted {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e @ LedgerError::Timeout { .. })) => {
                tracing::warn!(
                    subject = %subject,
                    tx_type = %request.tx_type,
                    content_hash = %request.content_hash,
                    error = %e,
                    "ledger submission timed out; the ledger may still hold the transaction"
                );
                return AnchorOutcome::LedgerFailed {
                    warning: format!(
                        "blockchain anchoring timed out, outcome unknown (content hash {}): {e}",
                        request.content_hash
                    ),
                };
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    subject = %subject,
                    tx_type = %request.tx_type,
                    error = %e,
                    "ledger submission failed; mutation committed without anchor"
                );
                return AnchorOutcome::LedgerFailed {
                    warning: format!("blockchain anchoring failed: {e}"),
                };
            }
            Err(_) => {
                tracing::warn!(
                    subject = %subject,
                    tx_type = %request.tx_type,
                    timeout = ?self.submit_timeout,
                    "ledger submission timed out; mutation committed without anchor"
                );
                return AnchorOutcome::LedgerFailed {
                    warning: format!(
                        "blockchain anchoring timed out after {:?}",
                        self.submit_timeout
                    ),
                };
            }
        };

        let created_at = clock.next_after(now_micros());
        let record = AnchorRecord::new(subject, receipt.tx_id.clone(), metadata_hash, created_at);
        match self.store.insert_anchor(&record).await {
            Ok(()) => {
                clock.last = Some(created_at);
                tracing::info!(
                    subject = %subject,
                    tx_id = %record.tx_id,
                    sequence = receipt.sequence,
                    "anchored"
                );
                AnchorOutcome::Anchored { anchor: record }
            }
            Err(e) => {
                tracing::error!(
                    subject = %subject,
                    tx_id = %receipt.tx_id,
                    error = %e,
                    "ledger accepted but anchor row was not written"
                );
                AnchorOutcome::StoreFailed {
                    tx_id: receipt.tx_id,
                    warning: format!("anchor record could not be stored: {e}"),
                }
            }
        }
    }
}
