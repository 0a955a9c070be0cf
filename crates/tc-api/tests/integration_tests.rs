//! End-to-end tests through the full router on in-memory stores and the
//! mock ledger.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tc_api::state::{AppState, Stores};
use tc_crypto::Ed25519KeyPair;
use tc_ledger::{Ledger, MockLedger};
use tower::ServiceExt;

fn test_app() -> (Router, Arc<MockLedger>) {
    let mock = Arc::new(MockLedger::default());
    let ledger: Arc<dyn Ledger> = mock.clone();
    let state = AppState::new(ledger, Stores::in_memory(), "tracepost-api");
    (tc_api::app(state), mock)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn create_batch(app: &Router, code: &str) -> i64 {
    let (status, body) = call(
        app,
        Method::POST,
        "/batches",
        Some(json!({
            "batch_code": code,
            "hatchery_id": 1,
            "species": "litopenaeus vannamei",
            "quantity": 50000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["record"]["id"].as_i64().unwrap()
}

async fn create_did(app: &Router, entity_type: &str, name: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/identity/did",
        Some(json!({ "entity_type": entity_type, "entity_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["data"]["did"].as_str().unwrap().to_string(),
        body["data"]["private_key"].as_str().unwrap().to_string(),
    )
}

// -- Health --------------------------------------------------------------

#[tokio::test]
async fn liveness_and_readiness_without_database() {
    let (app, _) = test_app();
    for uri in ["/health/liveness", "/health/readiness"] {
        let resp = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn openapi_lists_routes() {
    let (app, _) = test_app();
    let (status, body) = call(&app, Method::GET, "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/batches"));
    assert!(paths.contains_key("/blockchain/audit/{batch_id}"));
    assert!(paths.contains_key("/zkp/verify-disclosure"));
}

// -- Records and anchoring ----------------------------------------------

#[tokio::test]
async fn batch_creation_is_anchored() {
    let (app, mock) = test_app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/batches",
        Some(json!({
            "batch_code": "B-001",
            "hatchery_id": 7,
            "species": "penaeus monodon",
            "quantity": 1000
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["record"]["status"], "created");
    assert_eq!(body["data"]["anchor"]["status"], "anchored");
    assert_eq!(mock.transaction_count(), 1);
}

#[tokio::test]
async fn duplicate_batch_code_conflicts() {
    let (app, _) = test_app();
    create_batch(&app, "DUP").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/batches",
        Some(json!({ "batch_code": "DUP", "hatchery_id": 1, "species": "x", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn ledger_outage_does_not_fail_the_mutation() {
    let (app, mock) = test_app();
    mock.set_unreachable(true);
    let (status, body) = call(
        &app,
        Method::POST,
        "/batches",
        Some(json!({ "batch_code": "OUT-1", "hatchery_id": 1, "species": "x", "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["anchor"]["status"], "ledger_failed");
    assert!(body["message"].as_str().unwrap().contains("not anchored"));

    let id = body["data"]["record"]["id"].as_i64().unwrap();
    let (status, _) = call(&app, Method::GET, &format!("/batches/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_batch_is_rejected() {
    let (app, _) = test_app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/batches",
        Some(json!({ "batch_code": "", "hatchery_id": 1, "species": "x", "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn retired_batch_disappears() {
    let (app, _) = test_app();
    let id = create_batch(&app, "RET-1").await;
    let (status, body) = call(&app, Method::DELETE, &format!("/batches/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["anchor"]["status"], "anchored");
    let (status, _) = call(&app, Method::GET, &format!("/batches/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn event_on_unknown_batch_is_not_found() {
    let (app, _) = test_app();
    let (status, _) = call(
        &app,
        Method::POST,
        "/events",
        Some(json!({ "batch_id": 999, "event_type": "feeding" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn environment_readings_round_trip() {
    let (app, _) = test_app();
    let id = create_batch(&app, "ENV-1").await;
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/batches/{id}/environment"),
        Some(json!({ "temperature": 28.5, "ph": 7.9, "salinity": 15.0, "dissolved_oxygen": 5.6 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = call(&app, Method::GET, &format!("/batches/{id}/environment"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/batches/{id}/environment"),
        Some(json!({ "temperature": 28.5, "ph": 15.0, "salinity": 15.0, "dissolved_oxygen": 5.6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Blockchain queries --------------------------------------------------

#[tokio::test]
async fn audit_trail_joins_events_anchors_and_ledger() {
    let (app, _) = test_app();
    let id = create_batch(&app, "AUD-1").await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/events",
        Some(json!({ "batch_id": id, "event_type": "feeding", "location": "pond 3" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, Method::GET, &format!("/blockchain/audit/{id}"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let events = body["data"]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "feeding");
    let anchors = events[0]["anchors"].as_array().unwrap();
    assert_eq!(anchors.len(), 1);
    let txs = body["data"]["ledger_transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 2);
    assert!(txs.iter().any(|tx| tx["txId"] == anchors[0]["tx_id"]));
}

#[tokio::test]
async fn audit_with_ledger_down_is_bad_gateway() {
    let (app, mock) = test_app();
    let id = create_batch(&app, "AUD-2").await;
    mock.set_unreachable(true);
    let (status, body) = call(&app, Method::GET, &format!("/blockchain/audit/{id}"), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "LEDGER_ERROR");
}

#[tokio::test]
async fn verify_clean_batch() {
    let (app, _) = test_app();
    let id = create_batch(&app, "VER-1").await;
    let (status, body) = call(&app, Method::GET, &format!("/blockchain/verify/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["verification"]["is_valid"], true);
}

#[tokio::test]
async fn verify_with_ledger_down_is_inconclusive() {
    let (app, mock) = test_app();
    let id = create_batch(&app, "VER-2").await;
    mock.set_unreachable(true);
    let (status, body) = call(&app, Method::GET, &format!("/blockchain/verify/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let verification = &body["data"]["verification"];
    assert_eq!(verification["is_valid"], false);
    let kinds: Vec<&str> = verification["discrepancies"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"ledger_unreachable"), "{kinds:?}");
}

#[tokio::test]
async fn search_clamps_limit() {
    let (app, _) = test_app();
    create_batch(&app, "S-1").await;

    let (status, body) = call(&app, Method::POST, "/blockchain/search", Some(json!({ "limit": 5000 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["limit"], 1000);
    assert_eq!(body["data"]["count"], 1);

    let (_, body) = call(&app, Method::POST, "/blockchain/search", Some(json!({ "limit": 0 }))).await;
    assert_eq!(body["data"]["limit"], 100);

    let (status, _) = call(
        &app,
        Method::POST,
        "/blockchain/search",
        Some(json!({ "related_table": "nonsense" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/blockchain/search", Some(json!({ "related_id": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Identity -------------------------------------------------------------

#[tokio::test]
async fn did_create_resolve_and_prove() {
    let (app, _) = test_app();
    let (did, secret) = create_did(&app, "hatchery", "Coastal Hatchery").await;
    assert!(did.starts_with("did:tracepost:hatchery:"));

    let (status, body) = call(&app, Method::GET, &format!("/identity/did/{did}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["did"], did.as_str());
    assert_eq!(body["data"]["status"], "active");

    let key = Ed25519KeyPair::from_secret_hex(&secret).unwrap();
    let proof = key.sign(b"nonce-42").to_hex();
    let (status, body) = call(
        &app,
        Method::POST,
        "/identity/verify",
        Some(json!({ "did": did, "challenge": "nonce-42", "proof": proof })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);

    let (_, body) = call(
        &app,
        Method::POST,
        "/identity/verify",
        Some(json!({ "did": did, "challenge": "other", "proof": proof })),
    )
    .await;
    assert_eq!(body["data"]["valid"], false);
}

#[tokio::test]
async fn unknown_did_is_not_found() {
    let (app, _) = test_app();
    let (status, _) = call(&app, Method::GET, "/identity/did/did:tracepost:farm:0000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn did_list_filters_by_type() {
    let (app, _) = test_app();
    create_did(&app, "hatchery", "H1").await;
    create_did(&app, "farm", "F1").await;
    let (status, body) = call(&app, Method::GET, "/identity/list?entity_type=farm", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, _) = call(&app, Method::GET, "/identity/list?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn claim_lifecycle() {
    let (app, _) = test_app();
    let (issuer, _) = create_did(&app, "certifier", "ASC").await;
    let (subject, _) = create_did(&app, "farm", "Farm A").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/identity/claim",
        Some(json!({
            "issuer_did": issuer,
            "subject_did": subject,
            "claim_type": "organic",
            "claims": { "standard": "ASC", "grade": "A" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let claim_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = call(
        &app,
        Method::POST,
        "/identity/claim/verify",
        Some(json!({ "claim_id": claim_id })),
    )
    .await;
    assert_eq!(body["data"]["isValid"], true);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/identity/claim/{claim_id}/revoke"),
        Some(json!({ "requester_did": subject })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/identity/claim/{claim_id}/revoke"),
        Some(json!({ "requester_did": issuer })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(
        &app,
        Method::POST,
        "/identity/claim/verify",
        Some(json!({ "claim_id": claim_id })),
    )
    .await;
    assert_eq!(body["data"]["isValid"], false);
}

// -- Proofs ---------------------------------------------------------------

#[tokio::test]
async fn proof_generate_verify_and_disclose() {
    let (app, _) = test_app();
    let data = json!({ "batch_code": "B-9", "species": "vannamei", "quantity": 1200 });

    let (status, body) = call(&app, Method::POST, "/zkp/generate", Some(json!({ "data": data }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let proof = body["data"]["proof"].as_str().unwrap().to_string();

    let (_, body) = call(
        &app,
        Method::POST,
        "/zkp/verify",
        Some(json!({ "data": data, "proof": proof })),
    )
    .await;
    assert_eq!(body["data"]["valid"], true);

    let tampered = json!({ "batch_code": "B-9", "species": "vannamei", "quantity": 1 });
    let (_, body) = call(
        &app,
        Method::POST,
        "/zkp/verify",
        Some(json!({ "data": tampered, "proof": proof })),
    )
    .await;
    assert_eq!(body["data"]["valid"], false);

    let (status, body) = call(
        &app,
        Method::POST,
        "/zkp/disclose",
        Some(json!({ "data": data, "proof": proof, "field": "species" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let disclosure = body["data"].clone();
    assert_eq!(disclosure["value"], "vannamei");

    let (_, body) = call(
        &app,
        Method::POST,
        "/zkp/verify-disclosure",
        Some(json!({ "disclosure": disclosure })),
    )
    .await;
    assert_eq!(body["data"]["valid"], true);
}

#[tokio::test]
async fn undecodable_proof_is_bad_request() {
    let (app, _) = test_app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/zkp/verify",
        Some(json!({ "data": { "a": 1 }, "proof": "not a proof" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "SERIALIZATION_ERROR");
}
