//! # Domain Records
//!
//! The traceability rows whose content gets anchored: batches, events on a
//! batch, and environmental readings. The anchoring core only reads them to
//! build a payload and hash it; ownership of the rows sits with
//! [`DomainStore`].
//!
//! ## Anchor payloads
//!
//! Each record exposes `anchor_payload()`, the exact JSON whose canonical
//! hash is stored on the anchor. It is a pure function of persisted
//! columns, so verifying a row re-derives the same bytes after a reload.
//! Timestamps are truncated to microseconds on creation because that is
//! the precision Postgres keeps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tc_core::{ChainId, EntityRef, Lifecycle, RelatedTable, StoreError, ValidationError};

/// A production batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    /// External batch code, unique.
    pub batch_code: String,
    pub hatchery_id: i64,
    pub species: String,
    pub quantity: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl Batch {
    pub fn entity(&self) -> EntityRef {
        EntityRef::batch(self.id)
    }

    pub fn chain(&self) -> ChainId {
        ChainId::for_batch(self.id)
    }

    /// Content committed to the ledger for this batch.
    pub fn anchor_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "batch_code": self.batch_code,
            "hatchery_id": self.hatchery_id,
            "species": self.species,
            "quantity": self.quantity,
            "status": self.status,
            "created_at": self.created_at,
        })
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            id: self.id,
            batch_code: self.batch_code.clone(),
            species: self.species.clone(),
            status: self.status.clone(),
            quantity: self.quantity,
        }
    }
}

/// Short batch summary attached to search hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub id: i64,
    pub batch_code: String,
    pub species: String,
    pub status: String,
    pub quantity: i64,
}

/// Input for a new batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatch {
    pub batch_code: String,
    pub hatchery_id: i64,
    pub species: String,
    pub quantity: i64,
    #[serde(default = "default_batch_status")]
    pub status: String,
}

fn default_batch_status() -> String {
    "created".to_string()
}

impl NewBatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_code.trim().is_empty() {
            return Err(ValidationError::field("batch_code", "must not be empty"));
        }
        if self.species.trim().is_empty() {
            return Err(ValidationError::field("species", "must not be empty"));
        }
        if self.hatchery_id <= 0 {
            return Err(ValidationError::field("hatchery_id", "must be positive"));
        }
        if self.quantity <= 0 {
            return Err(ValidationError::field("quantity", "must be positive"));
        }
        validate_status(&self.status)
    }
}

pub fn validate_status(status: &str) -> Result<(), ValidationError> {
    if status.trim().is_empty() || status.len() > 64 {
        return Err(ValidationError::field("status", "must be 1-64 characters"));
    }
    Ok(())
}

/// A traceability event on a batch (feeding, harvest, transfer, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub batch_id: i64,
    pub event_type: String,
    #[serde(default)]
    pub actor_id: Option<i64>,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl Event {
    pub fn entity(&self) -> EntityRef {
        EntityRef::event(self.id)
    }

    pub fn anchor_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "batch_id": self.batch_id,
            "event_type": self.event_type,
            "actor_id": self.actor_id,
            "location": self.location,
            "timestamp": self.timestamp,
            "metadata": self.metadata,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub batch_id: i64,
    pub event_type: String,
    #[serde(default)]
    pub actor_id: Option<i64>,
    #[serde(default)]
    pub location: String,
    /// Defaults to now.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_id <= 0 {
            return Err(ValidationError::field("batch_id", "must be positive"));
        }
        if self.event_type.trim().is_empty() {
            return Err(ValidationError::field("event_type", "must not be empty"));
        }
        Ok(())
    }
}

/// One environmental sensor reading for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub id: i64,
    pub batch_id: i64,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub ph: f64,
    pub salinity: f64,
    pub dissolved_oxygen: f64,
    #[serde(default)]
    pub other_params: serde_json::Value,
    #[serde(default)]
    pub lifecycle: Lifecycle,
}

impl EnvironmentReading {
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(RelatedTable::Environment, self.id)
    }

    pub fn anchor_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "batch_id": self.batch_id,
            "timestamp": self.timestamp,
            "temperature": self.temperature,
            "ph": self.ph,
            "salinity": self.salinity,
            "dissolved_oxygen": self.dissolved_oxygen,
            "other_params": self.other_params,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature: f64,
    pub ph: f64,
    pub salinity: f64,
    pub dissolved_oxygen: f64,
    #[serde(default)]
    pub other_params: serde_json::Value,
}

impl NewReading {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let finite = [
            ("temperature", self.temperature),
            ("ph", self.ph),
            ("salinity", self.salinity),
            ("dissolved_oxygen", self.dissolved_oxygen),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(ValidationError::field(field, "must be a finite number"));
            }
        }
        if !(0.0..=14.0).contains(&self.ph) {
            return Err(ValidationError::field("ph", "must be between 0 and 14"));
        }
        Ok(())
    }
}

/// Persistence for domain rows. Every read hides retired rows.
#[async_trait]
pub trait DomainStore: Send + Sync {
    async fn insert_batch(&self, new: &NewBatch) -> Result<Batch, StoreError>;

    /// Active batch by id.
    async fn batch(&self, id: i64) -> Result<Option<Batch>, StoreError>;

    /// Set the status of an active batch. `None` if absent or retired.
    async fn update_batch_status(&self, id: i64, status: &str) -> Result<Option<Batch>, StoreError>;

    /// Retire an active batch. Returns the batch as it was before retiring.
    async fn retire_batch(&self, id: i64) -> Result<Option<Batch>, StoreError>;

    async fn insert_event(&self, new: &NewEvent) -> Result<Event, StoreError>;

    /// Active events of a batch, ascending by `(timestamp, id)`.
    async fn events_for_batch(&self, batch_id: i64) -> Result<Vec<Event>, StoreError>;

    async fn insert_reading(&self, batch_id: i64, new: &NewReading) -> Result<EnvironmentReading, StoreError>;

    /// Active readings of a batch, ascending by `(timestamp, id)`.
    async fn readings_for_batch(&self, batch_id: i64) -> Result<Vec<EnvironmentReading>, StoreError>;
}
