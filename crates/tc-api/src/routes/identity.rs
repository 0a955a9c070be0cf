//! # Identity and Claims
//!
//! DIDs are created and resolved against the ledger; the relational cache
//! only answers `/identity/list`. Claims are stored relationally with their
//! content hash and status committed on the ledger.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tc_core::{ClaimId, Did, DidStatus};
use tc_identity::{
    ClaimVerification, DecentralizedIdentity, DidProofVerification, IdentityPage, VerifiableClaim,
};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_path, extract_query, extract_validated_json, Validate,
};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Default claim validity when the request does not say.
pub const DEFAULT_EXPIRY_DAYS: i64 = 365;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDidRequest {
    /// DID type segment, e.g. `hatchery`, `farm`, `processor`.
    pub entity_type: String,
    pub entity_name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub controller: Option<String>,
}

impl Validate for CreateDidRequest {
    fn validate(&self) -> Result<(), String> {
        if self.entity_type.trim().is_empty() {
            return Err("entity_type must not be empty".into());
        }
        if self.entity_name.trim().is_empty() {
            return Err("entity_name must not be empty".into());
        }
        Ok(())
    }
}

/// Body of a successful DID creation. The private key is shown only here.
#[derive(Debug, Serialize)]
pub struct CreatedDidBody<'a> {
    pub did: &'a Did,
    pub did_document: &'a DecentralizedIdentity,
    pub private_key: &'a str,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDidStatusRequest {
    /// `active`, `suspended` or `revoked`.
    pub status: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    pub entity_type: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    /// 1-100, default 20.
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyDidProofRequest {
    pub did: String,
    pub challenge: String,
    /// Hex Ed25519 signature over the challenge bytes.
    pub proof: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueClaimRequest {
    pub issuer_did: String,
    pub subject_did: String,
    pub claim_type: String,
    #[schema(value_type = Object)]
    pub claims: serde_json::Value,
    /// Days until expiry, at least 1. Defaults to 365.
    #[serde(default)]
    pub expiry_days: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyClaimRequest {
    pub claim_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeClaimRequest {
    pub requester_did: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct DidPath {
    pub did: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct ClaimPath {
    pub claim_id: String,
}

fn parse_did(raw: &str) -> Result<Did, AppError> {
    Ok(Did::parse(raw.trim())?)
}

fn parse_claim_id(raw: &str) -> Result<ClaimId, AppError> {
    Ok(raw.trim().parse::<ClaimId>()?)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/identity/did", post(create_did))
        .route("/identity/did/:did", get(resolve_did))
        .route("/identity/did/:did/status", put(update_did_status))
        .route("/identity/list", get(list_dids))
        .route("/identity/verify", post(verify_did_proof))
        .route("/identity/claim", post(issue_claim))
        .route("/identity/claim/verify", post(verify_claim))
        .route("/identity/claim/:claim_id", get(get_claim))
        .route("/identity/claim/:claim_id/revoke", put(revoke_claim))
}

#[utoipa::path(
    post,
    path = "/identity/did",
    request_body = CreateDidRequest,
    responses(
        (status = 201, description = "DID registered; the private key is returned once"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 502, description = "Ledger rejected or unavailable", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn create_did(
    State(state): State<AppState>,
    body: Result<Json<CreateDidRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let req = extract_validated_json(body)?;
    let controller = req.controller.as_deref().map(parse_did).transpose()?;
    let created = state
        .identities
        .create_did(&req.entity_type, &req.entity_name, req.metadata, controller)
        .await?;

    let data = serde_json::to_value(CreatedDidBody {
        did: &created.identity.did,
        did_document: &created.identity,
        private_key: &created.private_key,
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::created(
        "DID created. Store the private key now; it cannot be retrieved again",
        data,
    ))
}

#[utoipa::path(
    get,
    path = "/identity/did/{did}",
    params(DidPath),
    responses(
        (status = 200, description = "DID document from the ledger"),
        (status = 404, description = "Unknown DID", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn resolve_did(
    State(state): State<AppState>,
    path: Result<Path<DidPath>, PathRejection>,
) -> Result<Json<ApiResponse<DecentralizedIdentity>>, AppError> {
    let did = parse_did(&extract_path(path)?.did)?;
    let document = state.identities.resolve(&did).await?;
    Ok(ApiResponse::ok("DID resolved", document))
}

#[utoipa::path(
    put,
    path = "/identity/did/{did}/status",
    params(DidPath),
    request_body = UpdateDidStatusRequest,
    responses(
        (status = 200, description = "Status updated on the ledger"),
        (status = 404, description = "Unknown DID", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn update_did_status(
    State(state): State<AppState>,
    path: Result<Path<DidPath>, PathRejection>,
    body: Result<Json<UpdateDidStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DecentralizedIdentity>>, AppError> {
    let did = parse_did(&extract_path(path)?.did)?;
    let status: DidStatus = extract_json(body)?.status.trim().parse()?;
    let document = state.identities.update_status(&did, status).await?;
    Ok(ApiResponse::ok(format!("DID status set to {status}"), document))
}

#[utoipa::path(
    get,
    path = "/identity/list",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of cached DIDs, newest first"),
        (status = 400, description = "Invalid paging", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn list_dids(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<IdentityPage>>, AppError> {
    let q = extract_query(query)?;
    let status = q
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<DidStatus>)
        .transpose()?;
    let page = state
        .identities
        .list(q.entity_type, status, q.page, q.limit)
        .await?;
    Ok(ApiResponse::ok(format!("{} identities", page.total), page))
}

#[utoipa::path(
    post,
    path = "/identity/verify",
    request_body = VerifyDidProofRequest,
    responses(
        (status = 200, description = "Signature verdict"),
        (status = 404, description = "Unknown DID", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn verify_did_proof(
    State(state): State<AppState>,
    body: Result<Json<VerifyDidProofRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<DidProofVerification>>, AppError> {
    let req = extract_json(body)?;
    let did = parse_did(&req.did)?;
    let verdict = state
        .identities
        .verify_did_proof(&did, &req.challenge, req.proof.trim())
        .await?;
    let message = if verdict.valid {
        "Proof is valid"
    } else {
        "Proof is not valid"
    };
    Ok(ApiResponse::ok(message, verdict))
}

#[utoipa::path(
    post,
    path = "/identity/claim",
    request_body = IssueClaimRequest,
    responses(
        (status = 201, description = "Claim issued and registered on the ledger"),
        (status = 400, description = "Invalid request or unknown DID", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn issue_claim(
    State(state): State<AppState>,
    body: Result<Json<IssueClaimRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<VerifiableClaim>>), AppError> {
    let req = extract_json(body)?;
    let issuer = parse_did(&req.issuer_did)?;
    let subject = parse_did(&req.subject_did)?;
    let claim = state
        .claims
        .issue(
            &issuer,
            &subject,
            &req.claim_type,
            req.claims,
            req.expiry_days.unwrap_or(DEFAULT_EXPIRY_DAYS),
        )
        .await?;
    Ok(ApiResponse::created("Claim issued", claim))
}

#[utoipa::path(
    get,
    path = "/identity/claim/{claim_id}",
    params(ClaimPath),
    responses(
        (status = 200, description = "Stored claim"),
        (status = 404, description = "Unknown claim", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn get_claim(
    State(state): State<AppState>,
    path: Result<Path<ClaimPath>, PathRejection>,
) -> Result<Json<ApiResponse<VerifiableClaim>>, AppError> {
    let id = parse_claim_id(&extract_path(path)?.claim_id)?;
    let claim = state.claims.get(&id).await?;
    Ok(ApiResponse::ok("Claim found", claim))
}

#[utoipa::path(
    post,
    path = "/identity/claim/verify",
    request_body = VerifyClaimRequest,
    responses(
        (status = 200, description = "Claim verdict with reasons"),
        (status = 404, description = "Unknown claim", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn verify_claim(
    State(state): State<AppState>,
    body: Result<Json<VerifyClaimRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ClaimVerification>>, AppError> {
    let id = parse_claim_id(&extract_json(body)?.claim_id)?;
    let verdict = state.claims.verify(&id).await?;
    let message = if verdict.is_valid {
        "Claim is valid"
    } else {
        "Claim is not valid"
    };
    Ok(ApiResponse::ok(message, verdict))
}

#[utoipa::path(
    put,
    path = "/identity/claim/{claim_id}/revoke",
    params(ClaimPath),
    request_body = RevokeClaimRequest,
    responses(
        (status = 200, description = "Claim revoked"),
        (status = 403, description = "Requester is not the issuer", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown claim", body = crate::error::ErrorBody),
    ),
    tag = "identity"
)]
pub(crate) async fn revoke_claim(
    State(state): State<AppState>,
    path: Result<Path<ClaimPath>, PathRejection>,
    body: Result<Json<RevokeClaimRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<VerifiableClaim>>, AppError> {
    let id = parse_claim_id(&extract_path(path)?.claim_id)?;
    let requester = parse_did(&extract_json(body)?.requester_did)?;
    let claim = state.claims.revoke(&id, &requester).await?;
    Ok(ApiResponse::ok("Claim revoked", claim))
}
