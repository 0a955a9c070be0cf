//! # Commitment Proofs
//!
//! Salted Merkle commitments over JSON documents with per-field selective
//! disclosure. Proofs travel as JSON text; an object in the `proof` field is
//! accepted too.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tc_proof::{parse_input, Disclosure, ProofType};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::response::ApiResponse;
use crate::state::AppState;

/// A document given as a JSON string is parsed first, so `"{\"a\":1}"` and
/// `{"a":1}` commit to the same thing.
fn document(data: serde_json::Value) -> serde_json::Value {
    match data {
        serde_json::Value::String(text) => parse_input(&text),
        other => other,
    }
}

fn proof_text(proof: &serde_json::Value) -> Result<String, AppError> {
    match proof {
        serde_json::Value::String(text) => Ok(text.clone()),
        serde_json::Value::Object(_) => Ok(proof.to_string()),
        _ => Err(AppError::Serialization(
            "proof must be a JSON string or object".into(),
        )),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateProofRequest {
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    /// Only `merkle` is supported.
    #[serde(default, rename = "type")]
    pub proof_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedProof {
    /// Proof as JSON text.
    pub proof: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyProofRequest {
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    #[schema(value_type = Object)]
    pub proof: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Validity {
    pub valid: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DiscloseRequest {
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    #[schema(value_type = Object)]
    pub proof: serde_json::Value,
    pub field: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyDisclosureRequest {
    #[schema(value_type = Object)]
    pub disclosure: Disclosure,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/zkp/generate", post(generate_proof))
        .route("/zkp/verify", post(verify_proof))
        .route("/zkp/disclose", post(disclose_field))
        .route("/zkp/verify-disclosure", post(verify_disclosure))
}

#[utoipa::path(
    post,
    path = "/zkp/generate",
    request_body = GenerateProofRequest,
    responses(
        (status = 200, description = "Proof generated", body = GeneratedProof),
        (status = 400, description = "Unknown proof type", body = crate::error::ErrorBody),
    ),
    tag = "zkp"
)]
pub(crate) async fn generate_proof(
    State(state): State<AppState>,
    body: Result<Json<GenerateProofRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<GeneratedProof>>, AppError> {
    let req = extract_json(body)?;
    let proof_type = match req.proof_type.as_deref() {
        Some(t) => t.parse::<ProofType>()?,
        None => ProofType::default(),
    };
    let proof = state.proofs.generate(&document(req.data), proof_type)?;
    Ok(ApiResponse::ok(
        format!("Generated {proof_type} proof over {} leaves", proof.leaf_count),
        GeneratedProof {
            proof: proof.to_json()?,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/zkp/verify",
    request_body = VerifyProofRequest,
    responses(
        (status = 200, description = "Verdict", body = Validity),
        (status = 400, description = "Proof could not be decoded", body = crate::error::ErrorBody),
    ),
    tag = "zkp"
)]
pub(crate) async fn verify_proof(
    State(state): State<AppState>,
    body: Result<Json<VerifyProofRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Validity>>, AppError> {
    let req = extract_json(body)?;
    let text = proof_text(&req.proof)?;
    let valid = state.proofs.verify(&document(req.data), &text)?;
    let message = if valid {
        "Proof matches the data"
    } else {
        "Proof does not match the data"
    };
    Ok(ApiResponse::ok(message, Validity { valid }))
}

#[utoipa::path(
    post,
    path = "/zkp/disclose",
    request_body = DiscloseRequest,
    responses(
        (status = 200, description = "Disclosure for one field"),
        (status = 400, description = "Proof mismatch or unknown field", body = crate::error::ErrorBody),
    ),
    tag = "zkp"
)]
pub(crate) async fn disclose_field(
    State(state): State<AppState>,
    body: Result<Json<DiscloseRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Disclosure>>, AppError> {
    let req = extract_json(body)?;
    let text = proof_text(&req.proof)?;
    let disclosure = state
        .proofs
        .disclose(&document(req.data), &text, req.field.trim())?;
    Ok(ApiResponse::ok(
        format!("Disclosed field '{}'", disclosure.field),
        disclosure,
    ))
}

#[utoipa::path(
    post,
    path = "/zkp/verify-disclosure",
    request_body = VerifyDisclosureRequest,
    responses(
        (status = 200, description = "Verdict", body = Validity),
    ),
    tag = "zkp"
)]
pub(crate) async fn verify_disclosure(
    State(state): State<AppState>,
    body: Result<Json<VerifyDisclosureRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Validity>>, AppError> {
    let req = extract_json(body)?;
    let valid = state.proofs.verify_disclosure(&req.disclosure);
    Ok(ApiResponse::ok(
        if valid {
            "Disclosure is valid"
        } else {
            "Disclosure is not valid"
        },
        Validity { valid },
    ))
}
