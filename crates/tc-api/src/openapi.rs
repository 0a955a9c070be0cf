//! OpenAPI document for every documented route, served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TraceChain API",
        version = "0.1.0",
        description = "Aquaculture traceability records anchored on a permissioned ledger, with DIDs, verifiable claims and field-level commitment proofs.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Records
        crate::routes::records::create_batch,
        crate::routes::records::get_batch,
        crate::routes::records::update_batch_status,
        crate::routes::records::retire_batch,
        crate::routes::records::record_event,
        crate::routes::records::list_events,
        crate::routes::records::record_reading,
        crate::routes::records::list_readings,
        // Blockchain
        crate::routes::blockchain::search_anchors,
        crate::routes::blockchain::verify_batch,
        crate::routes::blockchain::audit_batch,
        // Identity
        crate::routes::identity::create_did,
        crate::routes::identity::resolve_did,
        crate::routes::identity::update_did_status,
        crate::routes::identity::list_dids,
        crate::routes::identity::verify_did_proof,
        crate::routes::identity::issue_claim,
        crate::routes::identity::get_claim,
        crate::routes::identity::verify_claim,
        crate::routes::identity::revoke_claim,
        // Proofs
        crate::routes::zkp::generate_proof,
        crate::routes::zkp::verify_proof,
        crate::routes::zkp::disclose_field,
        crate::routes::zkp::verify_disclosure,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::records::CreateBatchRequest,
        crate::routes::records::UpdateBatchStatusRequest,
        crate::routes::records::CreateEventRequest,
        crate::routes::records::CreateReadingRequest,
        crate::routes::blockchain::SearchRequest,
        crate::routes::identity::CreateDidRequest,
        crate::routes::identity::UpdateDidStatusRequest,
        crate::routes::identity::VerifyDidProofRequest,
        crate::routes::identity::IssueClaimRequest,
        crate::routes::identity::VerifyClaimRequest,
        crate::routes::identity::RevokeClaimRequest,
        crate::routes::zkp::GenerateProofRequest,
        crate::routes::zkp::GeneratedProof,
        crate::routes::zkp::VerifyProofRequest,
        crate::routes::zkp::Validity,
        crate::routes::zkp::DiscloseRequest,
        crate::routes::zkp::VerifyDisclosureRequest,
    )),
    tags(
        (name = "records", description = "Batches, events and environment readings"),
        (name = "blockchain", description = "Anchor search, verification and audit trails"),
        (name = "identity", description = "Decentralized identifiers and verifiable claims"),
        (name = "zkp", description = "Commitment proofs with selective disclosure"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
