//! # Anchor Queries
//!
//! - POST /blockchain/search: filtered anchor listing
//! - GET  /blockchain/verify/:batch_id: tamper check of the current batch row
//! - GET  /blockchain/audit/:batch_id: events, anchors and ledger chain

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tc_anchor::{AnchorFilter, AuditTrail, BatchVerification, SearchResults};
use tc_core::RelatedTable;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_path};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// One of `batch`, `batch_extended`, `batch_status_extended`, `event`,
    /// `environment`.
    #[serde(default)]
    pub related_table: Option<String>,
    #[serde(default)]
    pub related_id: Option<i64>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    /// Clamped to 1..=1000; absent or non-positive means 100.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl SearchRequest {
    fn into_filter(self) -> Result<(AnchorFilter, i64), AppError> {
        let related_table = self
            .related_table
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.trim().parse::<RelatedTable>())
            .transpose()?;
        Ok((
            AnchorFilter {
                related_table,
                related_id: self.related_id,
                from: self.from,
                to: self.to,
            },
            self.limit.unwrap_or(0),
        ))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct BatchPath {
    /// Batch id.
    pub batch_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blockchain/search", post(search_anchors))
        .route("/blockchain/verify/:batch_id", get(verify_batch))
        .route("/blockchain/audit/:batch_id", get(audit_batch))
}

#[utoipa::path(
    post,
    path = "/blockchain/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching anchors, newest first"),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorBody),
    ),
    tag = "blockchain"
)]
pub(crate) async fn search_anchors(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SearchResults>>, AppError> {
    let (filter, limit) = extract_json(body)?.into_filter()?;
    let results = state.search.search(&filter, limit).await?;
    Ok(ApiResponse::ok(
        format!("Found {} anchor records", results.count),
        results,
    ))
}

#[utoipa::path(
    get,
    path = "/blockchain/verify/{batch_id}",
    params(BatchPath),
    responses(
        (status = 200, description = "Verification verdict with chain summary"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "blockchain"
)]
pub(crate) async fn verify_batch(
    State(state): State<AppState>,
    path: Result<Path<BatchPath>, PathRejection>,
) -> Result<Json<ApiResponse<BatchVerification>>, AppError> {
    let BatchPath { batch_id } = extract_path(path)?;
    let result = state
        .verifier
        .verify_batch(state.domain.as_ref(), batch_id)
        .await?;
    let message = match (result.verification.is_valid, result.verification.conclusive) {
        (true, _) => "Batch matches its ledger anchors",
        (false, true) => "Batch does not match its ledger anchors",
        (false, false) => "Verification inconclusive: ledger unavailable",
    };
    Ok(ApiResponse::ok(message, result))
}

#[utoipa::path(
    get,
    path = "/blockchain/audit/{batch_id}",
    params(BatchPath),
    responses(
        (status = 200, description = "Audit trail"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
        (status = 502, description = "Ledger unavailable", body = crate::error::ErrorBody),
    ),
    tag = "blockchain"
)]
pub(crate) async fn audit_batch(
    State(state): State<AppState>,
    path: Result<Path<BatchPath>, PathRejection>,
) -> Result<Json<ApiResponse<AuditTrail>>, AppError> {
    let BatchPath { batch_id } = extract_path(path)?;
    let trail = state.audit.build(batch_id).await?;
    Ok(ApiResponse::ok(
        format!("Audit trail with {} events", trail.events.len()),
        trail,
    ))
}
