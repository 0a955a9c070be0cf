//! Contract tests for HttpLedger against a mocked ledger node.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/api/v1/transactions` | `submit_*` |
//! | GET    | `/api/v1/transactions/{id}` | `get_transaction_*` |
//! | GET    | `/api/v1/chains/{chain}/transactions` | `list_transactions_*` |
//! | GET    | `/api/v1/identities/{did}` | `resolve_identity_*` |
//! | PUT    | `/api/v1/claims/{id}/revoke` | `revoke_claim_*`, `revoke_timeout_*` |

use std::time::Duration;

use tc_core::{ChainId, ClaimId, Did, DidStatus, TxId};
use tc_ledger::{HttpLedger, Ledger, LedgerConfig, LedgerError, RetryPolicy, TransactionRequest, TxType};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpLedger {
    let mut config = LedgerConfig::local(&server.uri()).unwrap();
    config.api_token = Some("test-token".into());
    HttpLedger::new(&config).unwrap().with_retry(RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(1),
    })
}

fn request() -> TransactionRequest {
    TransactionRequest {
        chain: ChainId::for_batch(7),
        tx_type: TxType::CreateBatch,
        actor: "tracepost-api".into(),
        payload: serde_json::json!({"species": "vannamei", "quantity": 1000}),
        content_hash: "ab".repeat(32),
    }
}

// ── POST /api/v1/transactions ────────────────────────────────────────

#[tokio::test]
async fn submit_sends_auth_and_body_and_returns_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-ledger-actor", "tracepost-api"))
        .and(body_partial_json(serde_json::json!({
            "chain": "batch:7",
            "txType": "CREATE_BATCH",
            "contentHash": "ab".repeat(32)
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "txId": "0xfeed",
            "sequence": 12,
            "acceptedAt": "2026-05-01T08:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client(&server).submit_transaction(&request()).await.unwrap();
    assert_eq!(receipt.tx_id, TxId::new("0xfeed"));
    assert_eq!(receipt.sequence, 12);
}

#[tokio::test]
async fn submit_maps_server_error_to_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("chain halted"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).submit_transaction(&request()).await.unwrap_err();
    match err {
        LedgerError::Rejected { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "chain halted");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_to_closed_port_is_transport_error() {
    let config = LedgerConfig::local("http://127.0.0.1:1").unwrap();
    let ledger = HttpLedger::new(&config).unwrap().with_retry(RetryPolicy::none());
    let err = ledger.submit_transaction(&request()).await.unwrap_err();
    assert!(err.is_transport(), "got {err:?}");
}

/// A client whose requests time out after one second, with three retries.
fn slow_client(server: &MockServer) -> HttpLedger {
    let mut config = LedgerConfig::local(&server.uri()).unwrap();
    config.timeout_secs = 1;
    HttpLedger::new(&config).unwrap().with_retry(RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
    })
}

#[tokio::test]
async fn submit_timeout_is_not_replayed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(1500))
                .set_body_json(serde_json::json!({
                    "txId": "0xlate",
                    "sequence": 1,
                    "acceptedAt": "2026-05-01T08:30:00Z"
                })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = slow_client(&server)
        .submit_transaction(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Timeout { .. }), "got {err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn revoke_timeout_is_not_replayed() {
    let server = MockServer::start().await;
    let id = ClaimId::new();
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/claims/{id}/revoke")))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
        .expect(1)
        .mount(&server)
        .await;

    let err = slow_client(&server).revoke_claim(&id).await.unwrap_err();
    assert!(err.is_transport(), "got {err:?}");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn read_timeout_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/0xslow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = LedgerConfig::local(&server.uri()).unwrap();
    config.timeout_secs = 1;
    let ledger = HttpLedger::new(&config).unwrap().with_retry(RetryPolicy {
        max_retries: 1,
        base_delay: Duration::from_millis(1),
    });
    let err = ledger
        .get_transaction(&TxId::new("0xslow"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Timeout { .. }), "got {err:?}");
}

// ── GET /api/v1/transactions/{id} ────────────────────────────────────

#[tokio::test]
async fn get_transaction_returns_content_hash() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/0xfeed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "txId": "0xfeed",
            "chain": "batch:7",
            "txType": "CREATE_BATCH",
            "actor": "tracepost-api",
            "contentHash": "cd".repeat(32),
            "payload": {"species": "vannamei"},
            "sequence": 12,
            "timestamp": "2026-05-01T08:30:00Z"
        })))
        .mount(&server)
        .await;

    let tx = client(&server).get_transaction(&TxId::new("0xfeed")).await.unwrap();
    assert_eq!(tx.content_hash, "cd".repeat(32));
    assert_eq!(tx.tx_type, TxType::CreateBatch);
}

#[tokio::test]
async fn get_transaction_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/0xgone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).get_transaction(&TxId::new("0xgone")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn get_transaction_bad_body_is_deserialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/transactions/0xodd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).get_transaction(&TxId::new("0xodd")).await.unwrap_err();
    assert!(matches!(err, LedgerError::Deserialization { .. }));
}

// ── GET /api/v1/chains/{chain}/transactions ──────────────────────────

#[tokio::test]
async fn list_transactions_encodes_chain_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chains/batch%3A7/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let txs = client(&server)
        .list_transactions(&ChainId::for_batch(7))
        .await
        .unwrap();
    assert!(txs.is_empty());
}

// ── GET /api/v1/identities/{did} ─────────────────────────────────────

#[tokio::test]
async fn resolve_identity_decodes_document() {
    let server = MockServer::start().await;
    let did = Did::parse("did:tracepost:farm:0011223344556677").unwrap();
    Mock::given(method("GET"))
        .and(path("/api/v1/identities/did%3Atracepost%3Afarm%3A0011223344556677"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "did": did.as_str(),
            "publicKey": "00".repeat(32),
            "metadata": {"name": "Farm A", "type": "farm"},
            "status": "suspended",
            "created": "2026-01-01T00:00:00Z",
            "updated": "2026-02-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let identity = client(&server).resolve_identity(&did).await.unwrap();
    assert_eq!(identity.status, DidStatus::Suspended);
    assert!(identity.controller.is_none());
}

// ── PUT /api/v1/claims/{id}/revoke ───────────────────────────────────

#[tokio::test]
async fn revoke_claim_uses_put() {
    let server = MockServer::start().await;
    let id = ClaimId::new();
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/claims/{id}/revoke")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "txId": "0xrevoke",
            "sequence": 3,
            "acceptedAt": "2026-05-01T08:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client(&server).revoke_claim(&id).await.unwrap();
    assert_eq!(receipt.tx_id.as_str(), "0xrevoke");
}
