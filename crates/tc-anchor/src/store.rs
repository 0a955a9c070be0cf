//! Anchor records and their persistence contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tc_core::{EntityRef, Lifecycle, RelatedTable, StoreError, TxId, ValidationError};
use uuid::Uuid;

/// Link between one domain mutation and the ledger transaction that
/// committed its content hash. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub id: Uuid,
    pub related_table: RelatedTable,
    pub related_id: i64,
    pub tx_id: TxId,
    /// Canonical SHA-256 of the payload at anchoring time, bare hex.
    pub metadata_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl AnchorRecord {
    pub fn new(subject: EntityRef, tx_id: TxId, metadata_hash: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            related_table: subject.table,
            related_id: subject.id,
            tx_id,
            metadata_hash,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn subject(&self) -> EntityRef {
        EntityRef::new(self.related_table, self.related_id)
    }
}

/// Search criteria. All fields optional; absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorFilter {
    #[serde(default)]
    pub related_table: Option<RelatedTable>,
    #[serde(default)]
    pub related_id: Option<i64>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl AnchorFilter {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.related_id, Some(id) if id <= 0) {
            return Err(ValidationError::field("related_id", "must be greater than 0"));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::field("from", "must not be after 'to'"));
            }
        }
        Ok(())
    }

    pub fn matches(&self, anchor: &AnchorRecord) -> bool {
        self.related_table.map_or(true, |t| t == anchor.related_table)
            && self.related_id.map_or(true, |id| id == anchor.related_id)
            && self.from.map_or(true, |f| anchor.created_at >= f)
            && self.to.map_or(true, |t| anchor.created_at <= t)
    }
}

/// Persistence for anchor records. Reads return active anchors only.
#[async_trait]
pub trait AnchorStore: Send + Sync {
    async fn insert_anchor(&self, anchor: &AnchorRecord) -> Result<(), StoreError>;

    /// Anchors of one subject, ascending by `created_at`.
    async fn anchors_for(&self, subject: &EntityRef) -> Result<Vec<AnchorRecord>, StoreError>;

    /// Greatest `created_at` recorded for a subject.
    async fn latest_created_at(&self, subject: &EntityRef) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Filtered anchors, newest first, at most `limit`.
    async fn search_anchors(&self, filter: &AnchorFilter, limit: usize) -> Result<Vec<AnchorRecord>, StoreError>;
}
