//! # Batch Records
//!
//! Mutations commit the row and then anchor it. A failed anchor never fails
//! the request: the response carries the anchor outcome and the message
//! says the record is not yet anchored.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tc_anchor::{AnchorOutcome, Batch, EnvironmentReading, Event, NewBatch, NewEvent, NewReading};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_path};
use crate::response::ApiResponse;
use crate::state::AppState;

/// A mutated record and what happened to its anchor.
#[derive(Debug, Serialize)]
pub struct Anchored<T> {
    pub record: T,
    pub anchor: AnchorOutcome,
}

fn anchored<T>(what: &str, record: T, anchor: AnchorOutcome) -> (String, Anchored<T>) {
    let message = match anchor.warning() {
        None => format!("{what} and anchored"),
        Some(warning) => {
            tracing::warn!(%warning, "{what} without a ledger anchor");
            format!("{what}; not anchored: {warning}")
        }
    };
    (message, Anchored { record, anchor })
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBatchRequest {
    pub batch_code: String,
    pub hatchery_id: i64,
    pub species: String,
    pub quantity: i64,
    /// Defaults to `created`.
    #[serde(default)]
    pub status: Option<String>,
}

impl From<CreateBatchRequest> for NewBatch {
    fn from(r: CreateBatchRequest) -> Self {
        Self {
            batch_code: r.batch_code,
            hatchery_id: r.hatchery_id,
            species: r.species,
            quantity: r.quantity,
            status: r.status.unwrap_or_else(|| "created".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBatchStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub batch_id: i64,
    pub event_type: String,
    #[serde(default)]
    pub actor_id: Option<i64>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(r: CreateEventRequest) -> Self {
        Self {
            batch_id: r.batch_id,
            event_type: r.event_type,
            actor_id: r.actor_id,
            location: r.location,
            timestamp: r.timestamp,
            metadata: r.metadata,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReadingRequest {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature: f64,
    pub ph: f64,
    pub salinity: f64,
    pub dissolved_oxygen: f64,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub other_params: serde_json::Value,
}

impl From<CreateReadingRequest> for NewReading {
    fn from(r: CreateReadingRequest) -> Self {
        Self {
            timestamp: r.timestamp,
            temperature: r.temperature,
            ph: r.ph,
            salinity: r.salinity,
            dissolved_oxygen: r.dissolved_oxygen,
            other_params: r.other_params,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct IdPath {
    /// Batch id.
    pub id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/batches", post(create_batch))
        .route("/batches/:id", get(get_batch).delete(retire_batch))
        .route("/batches/:id/status", put(update_batch_status))
        .route("/batches/:id/events", get(list_events))
        .route(
            "/batches/:id/environment",
            get(list_readings).post(record_reading),
        )
        .route("/events", post(record_event))
}

type Created<T> = (StatusCode, Json<ApiResponse<Anchored<T>>>);

#[utoipa::path(
    post,
    path = "/batches",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created; anchor outcome attached"),
        (status = 400, description = "Invalid batch", body = crate::error::ErrorBody),
        (status = 409, description = "Duplicate batch code", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn create_batch(
    State(state): State<AppState>,
    body: Result<Json<CreateBatchRequest>, JsonRejection>,
) -> Result<Created<Batch>, AppError> {
    let new: NewBatch = extract_json(body)?.into();
    let (batch, outcome) = state.records.create_batch(&new).await?;
    let (message, data) = anchored("Batch created", batch, outcome);
    Ok(ApiResponse::created(message, data))
}

#[utoipa::path(
    get,
    path = "/batches/{id}",
    params(IdPath),
    responses(
        (status = 200, description = "Active batch"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn get_batch(
    State(state): State<AppState>,
    path: Result<Path<IdPath>, PathRejection>,
) -> Result<Json<ApiResponse<Batch>>, AppError> {
    let IdPath { id } = extract_path(path)?;
    let batch = state
        .domain
        .batch(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("batch {id}")))?;
    Ok(ApiResponse::ok("Batch found", batch))
}

#[utoipa::path(
    put,
    path = "/batches/{id}/status",
    params(IdPath),
    request_body = UpdateBatchStatusRequest,
    responses(
        (status = 200, description = "Status updated; anchor outcome attached"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn update_batch_status(
    State(state): State<AppState>,
    path: Result<Path<IdPath>, PathRejection>,
    body: Result<Json<UpdateBatchStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Anchored<Batch>>>, AppError> {
    let IdPath { id } = extract_path(path)?;
    let req = extract_json(body)?;
    let (batch, outcome) = state
        .records
        .update_batch_status(id, req.status.trim())
        .await?;
    let (message, data) = anchored("Batch status updated", batch, outcome);
    Ok(ApiResponse::ok(message, data))
}

#[utoipa::path(
    delete,
    path = "/batches/{id}",
    params(IdPath),
    responses(
        (status = 200, description = "Batch retired; anchor outcome attached"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn retire_batch(
    State(state): State<AppState>,
    path: Result<Path<IdPath>, PathRejection>,
) -> Result<Json<ApiResponse<Anchored<Batch>>>, AppError> {
    let IdPath { id } = extract_path(path)?;
    let (batch, outcome) = state.records.retire_batch(id).await?;
    let (message, data) = anchored("Batch retired", batch, outcome);
    Ok(ApiResponse::ok(message, data))
}

#[utoipa::path(
    post,
    path = "/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event recorded; anchor outcome attached"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn record_event(
    State(state): State<AppState>,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<Created<Event>, AppError> {
    let new: NewEvent = extract_json(body)?.into();
    let (event, outcome) = state.records.record_event(&new).await?;
    let (message, data) = anchored("Event recorded", event, outcome);
    Ok(ApiResponse::created(message, data))
}

#[utoipa::path(
    get,
    path = "/batches/{id}/events",
    params(IdPath),
    responses(
        (status = 200, description = "Events in time order"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn list_events(
    State(state): State<AppState>,
    path: Result<Path<IdPath>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<Event>>>, AppError> {
    let IdPath { id } = extract_path(path)?;
    let events = state.records.events(id).await?;
    Ok(ApiResponse::ok(format!("{} events", events.len()), events))
}

#[utoipa::path(
    post,
    path = "/batches/{id}/environment",
    params(IdPath),
    request_body = CreateReadingRequest,
    responses(
        (status = 201, description = "Reading recorded; anchor outcome attached"),
        (status = 400, description = "Invalid reading", body = crate::error::ErrorBody),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn record_reading(
    State(state): State<AppState>,
    path: Result<Path<IdPath>, PathRejection>,
    body: Result<Json<CreateReadingRequest>, JsonRejection>,
) -> Result<Created<EnvironmentReading>, AppError> {
    let IdPath { id } = extract_path(path)?;
    let new: NewReading = extract_json(body)?.into();
    let (reading, outcome) = state.records.record_reading(id, &new).await?;
    let (message, data) = anchored("Reading recorded", reading, outcome);
    Ok(ApiResponse::created(message, data))
}

#[utoipa::path(
    get,
    path = "/batches/{id}/environment",
    params(IdPath),
    responses(
        (status = 200, description = "Readings in time order"),
        (status = 404, description = "Batch not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
pub(crate) async fn list_readings(
    State(state): State<AppState>,
    path: Result<Path<IdPath>, PathRejection>,
) -> Result<Json<ApiResponse<Vec<EnvironmentReading>>>, AppError> {
    let IdPath { id } = extract_path(path)?;
    let readings = state.records.readings(id).await?;
    Ok(ApiResponse::ok(format!("{} readings", readings.len()), readings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_request_defaults_status() {
        let req: CreateBatchRequest = serde_json::from_value(serde_json::json!({
            "batch_code": "B-1", "hatchery_id": 1, "species": "vannamei", "quantity": 10
        }))
        .unwrap();
        let new: NewBatch = req.into();
        assert_eq!(new.status, "created");
    }

    #[test]
    fn anchored_message_carries_warning() {
        let (msg, _) = anchored(
            "Batch created",
            1,
            AnchorOutcome::LedgerFailed {
                warning: "ledger down".into(),
            },
        );
        assert!(msg.contains("not anchored"));
        assert!(msg.contains("ledger down"));
    }
}
