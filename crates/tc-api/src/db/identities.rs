//! Identity cache and verifiable claim persistence.
//!
//! The `identities` table only serves listings; resolution goes to the
//! ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tc_core::{ClaimId, ClaimStatus, Did, DidStatus, StoreError};
use tc_identity::{
    ClaimStore, DecentralizedIdentity, IdentityPage, IdentityQuery, IdentityStore,
    VerifiableClaim,
};
use uuid::Uuid;

use super::{active, store_err};

const IDENTITY_COLUMNS: &str =
    "did, controller, public_key, metadata, status, proof, created, updated";
const CLAIM_COLUMNS: &str = "claim_id, claim_type, issuer_did, subject_did, claims, \
     issuance_date, expiry_date, status";

fn corrupt(column: &'static str) -> impl Fn(tc_core::ValidationError) -> StoreError {
    move |e| StoreError::Corrupt {
        column,
        reason: e.to_string(),
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    did: String,
    controller: Option<String>,
    public_key: String,
    metadata: serde_json::Value,
    status: String,
    proof: Option<serde_json::Value>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for DecentralizedIdentity {
    type Error = StoreError;

    fn try_from(r: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Self {
            did: Did::parse(&r.did).map_err(corrupt("did"))?,
            controller: r
                .controller
                .as_deref()
                .map(Did::parse)
                .transpose()
                .map_err(corrupt("controller"))?,
            public_key: r.public_key,
            metadata: r.metadata,
            status: r.status.parse::<DidStatus>().map_err(corrupt("status"))?,
            created: r.created,
            updated: r.updated,
            proof: r
                .proof
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| StoreError::Corrupt {
                    column: "proof",
                    reason: e.to_string(),
                })?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ClaimRow {
    claim_id: Uuid,
    claim_type: String,
    issuer_did: String,
    subject_did: String,
    claims: serde_json::Value,
    issuance_date: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    status: String,
}

impl TryFrom<ClaimRow> for VerifiableClaim {
    type Error = StoreError;

    fn try_from(r: ClaimRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ClaimId(r.claim_id),
            claim_type: r.claim_type,
            issuer: Did::parse(&r.issuer_did).map_err(corrupt("issuer_did"))?,
            subject: Did::parse(&r.subject_did).map_err(corrupt("subject_did"))?,
            claims: r.claims,
            issuance_date: r.issuance_date,
            expiry_date: r.expiry_date,
            status: r.status.parse::<ClaimStatus>().map_err(corrupt("status"))?,
        })
    }
}

/// Append the listing filters shared by the page and count queries.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &IdentityQuery) {
    if let Some(entity_type) = &query.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
}

#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn insert_identity(&self, identity: &DecentralizedIdentity) -> Result<(), StoreError> {
        let proof = identity
            .proof
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                column: "proof",
                reason: e.to_string(),
            })?;
        sqlx::query(
            "INSERT INTO identities
                 (did, controller, public_key, entity_type, metadata, status, proof, created, updated)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(identity.did.as_str())
        .bind(identity.controller.as_ref().map(|c| c.as_str().to_string()))
        .bind(&identity.public_key)
        .bind(identity.entity_type().map(str::to_string))
        .bind(&identity.metadata)
        .bind(identity.status.as_str())
        .bind(proof)
        .bind(identity.created)
        .bind(identity.updated)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_identity_status(
        &self,
        did: &Did,
        status: DidStatus,
        updated: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE identities SET status = $1, updated = $2 WHERE did = $3 AND {}",
            active(None)
        ))
        .bind(status.as_str())
        .bind(updated)
        .bind(did.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_identities(&self, query: &IdentityQuery) -> Result<IdentityPage, StoreError> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM identities WHERE {}",
            active(None)
        ));
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let offset = i64::from(query.page.saturating_sub(1)) * i64::from(query.limit);
        let mut page: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE {}",
            active(None)
        ));
        push_filters(&mut page, query);
        page.push(" ORDER BY created DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = page
            .build_query_as::<IdentityRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(IdentityPage {
            identities: rows
                .into_iter()
                .map(DecentralizedIdentity::try_from)
                .collect::<Result<_, _>>()?,
            total: u64::try_from(total).unwrap_or(0),
            page: query.page,
            limit: query.limit,
        })
    }
}

#[derive(Clone)]
pub struct PgClaimStore {
    pool: PgPool,
}

impl PgClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClaimStore for PgClaimStore {
    async fn insert_claim(&self, claim: &VerifiableClaim) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO verifiable_claims
                 (claim_id, claim_type, issuer_did, subject_did, claims,
                  issuance_date, expiry_date, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(claim.id.0)
        .bind(&claim.claim_type)
        .bind(claim.issuer.as_str())
        .bind(claim.subject.as_str())
        .bind(&claim.claims)
        .bind(claim.issuance_date)
        .bind(claim.expiry_date)
        .bind(claim.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn claim(&self, id: &ClaimId) -> Result<Option<VerifiableClaim>, StoreError> {
        let row = sqlx::query_as::<_, ClaimRow>(&format!(
            "SELECT {CLAIM_COLUMNS} FROM verifiable_claims WHERE claim_id = $1 AND {}",
            active(None)
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.map(VerifiableClaim::try_from).transpose()
    }

    async fn set_claim_status(&self, id: &ClaimId, status: ClaimStatus) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE verifiable_claims SET status = $1 WHERE claim_id = $2 AND {}",
            active(None)
        ))
        .bind(status.as_str())
        .bind(id.0)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() > 0)
    }
}
