//! In-memory stores.
//!
//! Back the service when no `DATABASE_URL` is configured, and the test
//! suites. Locks are `parking_lot` and never held across `.await`.
//! A store can be switched into a failing mode to exercise fatal storage
//! paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::RwLock;
use tc_core::{now_micros, EntityRef, Lifecycle, StoreError};

use crate::domain::{
    Batch, DomainStore, EnvironmentReading, Event, NewBatch, NewEvent, NewReading,
};
use crate::store::{AnchorFilter, AnchorRecord, AnchorStore};

#[derive(Debug, Default)]
struct FailSwitch(AtomicBool);

impl FailSwitch {
    fn check(&self) -> Result<(), StoreError> {
        if self.0.load(Ordering::SeqCst) {
            return Err(StoreError::Database("in-memory store is failing".into()));
        }
        Ok(())
    }
}

// -- Anchors ------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryAnchorStore {
    anchors: RwLock<Vec<AnchorRecord>>,
    failing: FailSwitch,
}

impl MemoryAnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.0.store(failing, Ordering::SeqCst);
    }

    /// Every anchor, including retired ones, in insertion order.
    pub fn all(&self) -> Vec<AnchorRecord> {
        self.anchors.read().clone()
    }

    /// Replace the stored hash of an anchor. Simulates a tampered
    /// relational row.
    pub fn overwrite_hash(&self, id: &uuid::Uuid, metadata_hash: &str) -> bool {
        match self.anchors.write().iter_mut().find(|a| &a.id == id) {
            Some(a) => {
                a.metadata_hash = metadata_hash.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AnchorStore for MemoryAnchorStore {
    async fn insert_anchor(&self, anchor: &AnchorRecord) -> Result<(), StoreError> {
        self.failing.check()?;
        let mut anchors = self.anchors.write();
        if anchors.iter().any(|a| a.id == anchor.id) {
            return Err(StoreError::Duplicate(anchor.id.to_string()));
        }
        anchors.push(anchor.clone());
        Ok(())
    }

    async fn anchors_for(&self, subject: &EntityRef) -> Result<Vec<AnchorRecord>, StoreError> {
        self.failing.check()?;
        let mut out: Vec<AnchorRecord> = self
            .anchors
            .read()
            .iter()
            .filter(|a| a.lifecycle.is_visible() && &a.subject() == subject)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.created_at);
        Ok(out)
    }

    async fn latest_created_at(&self, subject: &EntityRef) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.failing.check()?;
        Ok(self
            .anchors
            .read()
            .iter()
            .filter(|a| &a.subject() == subject)
            .map(|a| a.created_at)
            .max())
    }

    async fn search_anchors(&self, filter: &AnchorFilter, limit: usize) -> Result<Vec<AnchorRecord>, StoreError> {
        self.failing.check()?;
        let mut out: Vec<AnchorRecord> = self
            .anchors
            .read()
            .iter()
            .filter(|a| a.lifecycle.is_visible() && filter.matches(a))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }
}

// -- Domain rows --------------------------------------------------------------

#[derive(Debug)]
pub struct MemoryDomainStore {
    batches: RwLock<BTreeMap<i64, Batch>>,
    events: RwLock<BTreeMap<i64, Event>>,
    readings: RwLock<BTreeMap<i64, EnvironmentReading>>,
    next_id: AtomicI64,
    failing: FailSwitch,
}

impl Default for MemoryDomainStore {
    fn default() -> Self {
        Self {
            batches: RwLock::new(BTreeMap::new()),
            events: RwLock::new(BTreeMap::new()),
            readings: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            failing: FailSwitch::default(),
        }
    }
}

impl MemoryDomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.0.store(failing, Ordering::SeqCst);
    }

    /// Mutate a stored batch without anchoring. Simulates an out-of-band
    /// edit of the relational row.
    pub fn tamper_batch(&self, id: i64, f: impl FnOnce(&mut Batch)) -> bool {
        match self.batches.write().get_mut(&id) {
            Some(b) => {
                f(b);
                true
            }
            None => false,
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainStore for MemoryDomainStore {
    async fn insert_batch(&self, new: &NewBatch) -> Result<Batch, StoreError> {
        self.failing.check()?;
        let mut batches = self.batches.write();
        if batches.values().any(|b| b.batch_code == new.batch_code) {
            return Err(StoreError::Duplicate(format!("batch_code {}", new.batch_code)));
        }
        let now = now_micros();
        let batch = Batch {
            id: self.allocate_id(),
            batch_code: new.batch_code.clone(),
            hatchery_id: new.hatchery_id,
            species: new.species.clone(),
            quantity: new.quantity,
            status: new.status.clone(),
            created_at: now,
            updated_at: now,
            lifecycle: Lifecycle::Active,
        };
        batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn batch(&self, id: i64) -> Result<Option<Batch>, StoreError> {
        self.failing.check()?;
        Ok(self
            .batches
            .read()
            .get(&id)
            .filter(|b| b.lifecycle.is_visible())
            .cloned())
    }

    async fn update_batch_status(&self, id: i64, status: &str) -> Result<Option<Batch>, StoreError> {
        self.failing.check()?;
        let mut batches = self.batches.write();
        Ok(batches
            .get_mut(&id)
            .filter(|b| b.lifecycle.is_visible())
            .map(|b| {
                b.status = status.to_string();
                b.updated_at = now_micros();
                b.clone()
            }))
    }

    async fn retire_batch(&self, id: i64) -> Result<Option<Batch>, StoreError> {
        self.failing.check()?;
        let mut batches = self.batches.write();
        Ok(batches
            .get_mut(&id)
            .filter(|b| b.lifecycle.is_visible())
            .map(|b| {
                let before = b.clone();
                b.lifecycle = Lifecycle::Retired;
                b.updated_at = now_micros();
                before
            }))
    }

    async fn insert_event(&self, new: &NewEvent) -> Result<Event, StoreError> {
        self.failing.check()?;
        let event = Event {
            id: self.allocate_id(),
            batch_id: new.batch_id,
            event_type: new.event_type.clone(),
            actor_id: new.actor_id,
            location: new.location.clone(),
            timestamp: new.timestamp.map(|t| t.trunc_subsecs(6)).unwrap_or_else(now_micros),
            metadata: new.metadata.clone(),
            lifecycle: Lifecycle::Active,
        };
        self.events.write().insert(event.id, event.clone());
        Ok(event)
    }

    async fn events_for_batch(&self, batch_id: i64) -> Result<Vec<Event>, StoreError> {
        self.failing.check()?;
        let mut out: Vec<Event> = self
            .events
            .read()
            .values()
            .filter(|e| e.batch_id == batch_id && e.lifecycle.is_visible())
            .cloned()
            .collect();
        out.sort_by_key(|e| (e.timestamp, e.id));
        Ok(out)
    }

    async fn insert_reading(&self, batch_id: i64, new: &NewReading) -> Result<EnvironmentReading, StoreError> {
        self.failing.check()?;
        let reading = EnvironmentReading {
            id: self.allocate_id(),
            batch_id,
            timestamp: new.timestamp.map(|t| t.trunc_subsecs(6)).unwrap_or_else(now_micros),
            temperature: new.temperature,
            ph: new.ph,
            salinity: new.salinity,
            dissolved_oxygen: new.dissolved_oxygen,
            other_params: new.other_params.clone(),
            lifecycle: Lifecycle::Active,
        };
        self.readings.write().insert(reading.id, reading.clone());
        Ok(reading)
    }

    async fn readings_for_batch(&self, batch_id: i64) -> Result<Vec<EnvironmentReading>, StoreError> {
        self.failing.check()?;
        let mut out: Vec<EnvironmentReading> = self
            .readings
            .read()
            .values()
            .filter(|r| r.batch_id == batch_id && r.lifecycle.is_visible())
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.timestamp, r.id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::TxId;

    fn new_batch(code: &str) -> NewBatch {
        NewBatch {
            batch_code: code.into(),
            hatchery_id: 1,
            species: "vannamei".into(),
            quantity: 100,
            status: "created".into(),
        }
    }

    #[tokio::test]
    async fn retired_batch_is_hidden() {
        let store = MemoryDomainStore::new();
        let b = store.insert_batch(&new_batch("B-1")).await.unwrap();
        assert!(store.retire_batch(b.id).await.unwrap().is_some());
        assert!(store.batch(b.id).await.unwrap().is_none());
        assert!(store.retire_batch(b.id).await.unwrap().is_none());
        assert!(store.update_batch_status(b.id, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_batch_code_rejected() {
        let store = MemoryDomainStore::new();
        store.insert_batch(&new_batch("B-1")).await.unwrap();
        let err = store.insert_batch(&new_batch("B-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn events_sorted_by_timestamp() {
        let store = MemoryDomainStore::new();
        let late = Utc::now();
        let early = late - chrono::Duration::hours(2);
        for (kind, at) in [("harvest", late), ("stocking", early)] {
            store
                .insert_event(&NewEvent {
                    batch_id: 1,
                    event_type: kind.into(),
                    actor_id: None,
                    location: "pond 3".into(),
                    timestamp: Some(at),
                    metadata: serde_json::Value::Null,
                })
                .await
                .unwrap();
        }
        let events = store.events_for_batch(1).await.unwrap();
        assert_eq!(events[0].event_type, "stocking");
        assert_eq!(events[1].event_type, "harvest");
    }

    #[tokio::test]
    async fn search_is_newest_first_and_limited() {
        let store = MemoryAnchorStore::new();
        let base = now_micros();
        for i in 0..5 {
            let a = AnchorRecord::new(
                EntityRef::batch(1),
                TxId::new(format!("0x{i}")),
                "aa".into(),
                base + chrono::Duration::seconds(i),
            );
            store.insert_anchor(&a).await.unwrap();
        }
        let hits = store.search_anchors(&AnchorFilter::default(), 3).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|a| a.tx_id.as_str()).collect();
        assert_eq!(ids, vec!["0x4", "0x3", "0x2"]);
    }

    #[tokio::test]
    async fn failing_mode_surfaces_database_error() {
        let store = MemoryAnchorStore::new();
        store.set_failing(true);
        let err = store.anchors_for(&EntityRef::batch(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
