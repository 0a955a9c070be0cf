//! Batch, event and environment reading persistence.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::PgPool;
use tc_anchor::{Batch, DomainStore, EnvironmentReading, Event, NewBatch, NewEvent, NewReading};
use tc_core::{now_micros, Lifecycle, StoreError};

use super::{active, store_err};

const BATCH_COLUMNS: &str =
    "id, batch_code, hatchery_id, species, quantity, status, created_at, updated_at, is_active";
const EVENT_COLUMNS: &str =
    "id, batch_id, event_type, actor_id, location, occurred_at, metadata, is_active";
const READING_COLUMNS: &str = "id, batch_id, measured_at, temperature, ph, salinity, \
     dissolved_oxygen, other_params, is_active";

#[derive(sqlx::FromRow)]
struct BatchRow {
    id: i64,
    batch_code: String,
    hatchery_id: i64,
    species: String,
    quantity: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_active: bool,
}

impl From<BatchRow> for Batch {
    fn from(r: BatchRow) -> Self {
        Self {
            id: r.id,
            batch_code: r.batch_code,
            hatchery_id: r.hatchery_id,
            species: r.species,
            quantity: r.quantity,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            lifecycle: Lifecycle::from_active_flag(r.is_active),
        }
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    batch_id: i64,
    event_type: String,
    actor_id: Option<i64>,
    location: String,
    occurred_at: DateTime<Utc>,
    metadata: serde_json::Value,
    is_active: bool,
}

impl From<EventRow> for Event {
    fn from(r: EventRow) -> Self {
        Self {
            id: r.id,
            batch_id: r.batch_id,
            event_type: r.event_type,
            actor_id: r.actor_id,
            location: r.location,
            timestamp: r.occurred_at,
            metadata: r.metadata,
            lifecycle: Lifecycle::from_active_flag(r.is_active),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    batch_id: i64,
    measured_at: DateTime<Utc>,
    temperature: f64,
    ph: f64,
    salinity: f64,
    dissolved_oxygen: f64,
    other_params: serde_json::Value,
    is_active: bool,
}

impl From<ReadingRow> for EnvironmentReading {
    fn from(r: ReadingRow) -> Self {
        Self {
            id: r.id,
            batch_id: r.batch_id,
            timestamp: r.measured_at,
            temperature: r.temperature,
            ph: r.ph,
            salinity: r.salinity,
            dissolved_oxygen: r.dissolved_oxygen,
            other_params: r.other_params,
            lifecycle: Lifecycle::from_active_flag(r.is_active),
        }
    }
}

#[derive(Clone)]
pub struct PgDomainStore {
    pool: PgPool,
}

impl PgDomainStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainStore for PgDomainStore {
    async fn insert_batch(&self, new: &NewBatch) -> Result<Batch, StoreError> {
        let now = now_micros();
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "INSERT INTO batch (batch_code, hatchery_id, species, quantity, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {BATCH_COLUMNS}"
        ))
        .bind(&new.batch_code)
        .bind(new.hatchery_id)
        .bind(&new.species)
        .bind(new.quantity)
        .bind(&new.status)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.into())
    }

    async fn batch(&self, id: i64) -> Result<Option<Batch>, StoreError> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batch WHERE id = $1 AND {}",
            active(None)
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn update_batch_status(&self, id: i64, status: &str) -> Result<Option<Batch>, StoreError> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "UPDATE batch SET status = $1, updated_at = $2
             WHERE id = $3 AND {}
             RETURNING {BATCH_COLUMNS}",
            active(None)
        ))
        .bind(status)
        .bind(now_micros())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn retire_batch(&self, id: i64) -> Result<Option<Batch>, StoreError> {
        // RETURNING from the CTE yields the row as it was before retiring.
        let row = sqlx::query_as::<_, BatchRow>(
            &format!(
                "WITH prior AS (
                     SELECT {BATCH_COLUMNS} FROM batch WHERE id = $1 AND {} FOR UPDATE
                 )
                 UPDATE batch b SET is_active = FALSE, updated_at = $2
                 FROM prior WHERE b.id = prior.id
                 RETURNING prior.id, prior.batch_code, prior.hatchery_id, prior.species,
                           prior.quantity, prior.status, prior.created_at, prior.updated_at,
                           prior.is_active",
                active(None)
            ),
        )
        .bind(id)
        .bind(now_micros())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(Into::into))
    }

    async fn insert_event(&self, new: &NewEvent) -> Result<Event, StoreError> {
        let occurred_at = new
            .timestamp
            .map(|t| t.trunc_subsecs(6))
            .unwrap_or_else(now_micros);
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO event (batch_id, event_type, actor_id, location, occurred_at, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(new.batch_id)
        .bind(&new.event_type)
        .bind(new.actor_id)
        .bind(&new.location)
        .bind(occurred_at)
        .bind(&new.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.into())
    }

    async fn events_for_batch(&self, batch_id: i64) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM event
             WHERE batch_id = $1 AND {}
             ORDER BY occurred_at ASC, id ASC",
            active(None)
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_reading(&self, batch_id: i64, new: &NewReading) -> Result<EnvironmentReading, StoreError> {
        let measured_at = new
            .timestamp
            .map(|t| t.trunc_subsecs(6))
            .unwrap_or_else(now_micros);
        let row = sqlx::query_as::<_, ReadingRow>(&format!(
            "INSERT INTO environment_reading
                 (batch_id, measured_at, temperature, ph, salinity, dissolved_oxygen, other_params)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {READING_COLUMNS}"
        ))
        .bind(batch_id)
        .bind(measured_at)
        .bind(new.temperature)
        .bind(new.ph)
        .bind(new.salinity)
        .bind(new.dissolved_oxygen)
        .bind(&new.other_params)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.into())
    }

    async fn readings_for_batch(&self, batch_id: i64) -> Result<Vec<EnvironmentReading>, StoreError> {
        let rows = sqlx::query_as::<_, ReadingRow>(&format!(
            "SELECT {READING_COLUMNS} FROM environment_reading
             WHERE batch_id = $1 AND {}
             ORDER BY measured_at ASC, id ASC",
            active(None)
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
