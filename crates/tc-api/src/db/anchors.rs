//! `blockchain_record` persistence. Append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tc_anchor::{AnchorFilter, AnchorRecord, AnchorStore};
use tc_core::{EntityRef, Lifecycle, RelatedTable, StoreError, TxId};
use uuid::Uuid;

use super::{active, store_err};

const COLUMNS: &str = "id, related_table, related_id, tx_id, metadata_hash, created_at, is_active";

#[derive(sqlx::FromRow)]
struct AnchorRow {
    id: Uuid,
    related_table: String,
    related_id: i64,
    tx_id: String,
    metadata_hash: String,
    created_at: DateTime<Utc>,
    is_active: bool,
}

impl TryFrom<AnchorRow> for AnchorRecord {
    type Error = StoreError;

    fn try_from(r: AnchorRow) -> Result<Self, Self::Error> {
        let related_table: RelatedTable =
            r.related_table.parse().map_err(|e: tc_core::ValidationError| {
                StoreError::Corrupt {
                    column: "related_table",
                    reason: e.to_string(),
                }
            })?;
        Ok(Self {
            id: r.id,
            related_table,
            related_id: r.related_id,
            tx_id: TxId::new(r.tx_id),
            metadata_hash: r.metadata_hash,
            created_at: r.created_at,
            lifecycle: Lifecycle::from_active_flag(r.is_active),
        })
    }
}

fn into_records(rows: Vec<AnchorRow>) -> Result<Vec<AnchorRecord>, StoreError> {
    rows.into_iter().map(AnchorRecord::try_from).collect()
}

#[derive(Clone)]
pub struct PgAnchorStore {
    pool: PgPool,
}

impl PgAnchorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnchorStore for PgAnchorStore {
    async fn insert_anchor(&self, anchor: &AnchorRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO blockchain_record
                 (id, related_table, related_id, tx_id, metadata_hash, created_at, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(anchor.id)
        .bind(anchor.related_table.as_str())
        .bind(anchor.related_id)
        .bind(anchor.tx_id.as_str())
        .bind(&anchor.metadata_hash)
        .bind(anchor.created_at)
        .bind(anchor.lifecycle.as_active_flag())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn anchors_for(&self, subject: &EntityRef) -> Result<Vec<AnchorRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AnchorRow>(&format!(
            "SELECT {COLUMNS} FROM blockchain_record
             WHERE related_table = $1 AND related_id = $2 AND {}
             ORDER BY created_at ASC",
            active(None)
        ))
        .bind(subject.table.as_str())
        .bind(subject.id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        into_records(rows)
    }

    async fn latest_created_at(&self, subject: &EntityRef) -> Result<Option<DateTime<Utc>>, StoreError> {
        sqlx::query_scalar::<_, Option<DateTime<Utc>>>(&format!(
            "SELECT MAX(created_at) FROM blockchain_record
             WHERE related_table = $1 AND related_id = $2 AND {}",
            active(None)
        ))
        .bind(subject.table.as_str())
        .bind(subject.id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn search_anchors(&self, filter: &AnchorFilter, limit: usize) -> Result<Vec<AnchorRecord>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {COLUMNS} FROM blockchain_record WHERE {}",
            active(None)
        ));
        if let Some(table) = filter.related_table {
            qb.push(" AND related_table = ").push_bind(table.as_str());
        }
        if let Some(id) = filter.related_id {
            qb.push(" AND related_id = ").push_bind(id);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<AnchorRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        into_records(rows)
    }
}
