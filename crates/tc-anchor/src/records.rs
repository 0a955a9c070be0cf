//! Domain mutations followed by anchoring.
//!
//! Every operation commits its row first and then anchors the row's
//! payload. The returned [`AnchorOutcome`] tells the caller whether the
//! anchor landed; a failed anchor never fails the mutation. Events and
//! readings go onto their parent batch's chain.

use std::sync::Arc;

use tc_core::{EntityRef, ValidationError};
use tc_ledger::TxType;

use crate::domain::{
    validate_status, Batch, DomainStore, EnvironmentReading, Event, NewBatch, NewEvent, NewReading,
};
use crate::error::AnchorError;
use crate::writer::{AnchorIntent, AnchorOutcome, AnchorWriter};

#[derive(Clone)]
pub struct RecordService {
    domain: Arc<dyn DomainStore>,
    writer: AnchorWriter,
    actor: String,
}

impl RecordService {
    pub fn new(domain: Arc<dyn DomainStore>, writer: AnchorWriter, actor: impl Into<String>) -> Self {
        Self {
            domain,
            writer,
            actor: actor.into(),
        }
    }

    pub fn domain(&self) -> &Arc<dyn DomainStore> {
        &self.domain
    }

    pub fn writer(&self) -> &AnchorWriter {
        &self.writer
    }

    async fn anchor(&self, subject: EntityRef, batch: &Batch, tx_type: TxType, payload: serde_json::Value) -> AnchorOutcome {
        self.writer
            .anchor(AnchorIntent {
                subject,
                chain: batch.chain(),
                actor: self.actor.clone(),
                tx_type,
                payload,
            })
            .await
    }

    async fn active_batch(&self, id: i64) -> Result<Batch, AnchorError> {
        self.domain
            .batch(id)
            .await?
            .ok_or_else(|| AnchorError::batch_not_found(id))
    }

    pub async fn create_batch(&self, new: &NewBatch) -> Result<(Batch, AnchorOutcome), AnchorError> {
        new.validate()?;
        let batch = self.domain.insert_batch(new).await?;
        let outcome = self
            .anchor(batch.entity(), &batch, TxType::CreateBatch, batch.anchor_payload())
            .await;
        Ok((batch, outcome))
    }

    pub async fn update_batch_status(&self, id: i64, status: &str) -> Result<(Batch, AnchorOutcome), AnchorError> {
        validate_status(status)?;
        let batch = self
            .domain
            .update_batch_status(id, status)
            .await?
            .ok_or_else(|| AnchorError::batch_not_found(id))?;
        let outcome = self
            .anchor(batch.entity(), &batch, TxType::UpdateBatchStatus, batch.anchor_payload())
            .await;
        Ok((batch, outcome))
    }

    /// Retire a batch. The anchored payload is the final content plus a
    /// retirement marker.
    pub async fn retire_batch(&self, id: i64) -> Result<(Batch, AnchorOutcome), AnchorError> {
        let batch = self
            .domain
            .retire_batch(id)
            .await?
            .ok_or_else(|| AnchorError::batch_not_found(id))?;
        let mut payload = batch.anchor_payload();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("retired".into(), serde_json::Value::Bool(true));
        }
        let outcome = self
            .anchor(batch.entity(), &batch, TxType::RetireBatch, payload)
            .await;
        Ok((batch, outcome))
    }

    pub async fn record_event(&self, new: &NewEvent) -> Result<(Event, AnchorOutcome), AnchorError> {
        new.validate()?;
        let batch = self.active_batch(new.batch_id).await?;
        let event = self.domain.insert_event(new).await?;
        let outcome = self
            .anchor(event.entity(), &batch, TxType::RecordEvent, event.anchor_payload())
            .await;
        Ok((event, outcome))
    }

    pub async fn events(&self, batch_id: i64) -> Result<Vec<Event>, AnchorError> {
        self.active_batch(batch_id).await?;
        Ok(self.domain.events_for_batch(batch_id).await?)
    }

    pub async fn record_reading(
        &self,
        batch_id: i64,
        new: &NewReading,
    ) -> Result<(EnvironmentReading, AnchorOutcome), AnchorError> {
        if batch_id <= 0 {
            return Err(ValidationError::field("batch_id", "must be positive").into());
        }
        new.validate()?;
        let batch = self.active_batch(batch_id).await?;
        let reading = self.domain.insert_reading(batch_id, new).await?;
        let outcome = self
            .anchor(reading.entity(), &batch, TxType::RecordEnvironment, reading.anchor_payload())
            .await;
        Ok((reading, outcome))
    }

    pub async fn readings(&self, batch_id: i64) -> Result<Vec<EnvironmentReading>, AnchorError> {
        self.active_batch(batch_id).await?;
        Ok(self.domain.readings_for_batch(batch_id).await?)
    }
}
