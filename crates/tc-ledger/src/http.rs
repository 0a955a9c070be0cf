//! REST client for the ledger node.
//!
//! ## Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/api/v1/transactions` | Submit transaction |
//! | GET    | `/api/v1/transactions/{txId}` | Get transaction |
//! | GET    | `/api/v1/chains/{chain}/transactions` | List chain transactions |
//! | GET    | `/api/v1/chains/{chain}/state` | Chain snapshot |
//! | POST   | `/api/v1/identities` | Register identity |
//! | GET    | `/api/v1/identities/{did}` | Resolve identity |
//! | PUT    | `/api/v1/identities/{did}/status` | Change identity status |
//! | POST   | `/api/v1/claims` | Register claim |
//! | GET    | `/api/v1/claims/{claimId}` | Claim record |
//! | PUT    | `/api/v1/claims/{claimId}/revoke` | Revoke claim |

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use tc_core::{ChainId, ClaimId, Did, DidStatus, TxId};
use url::Url;

use crate::config::{ConfigError, LedgerConfig};
use crate::error::LedgerError;
use crate::retry::{retry_send, Replay, RetryPolicy};
use crate::types::{
    ChainState, LedgerClaim, LedgerIdentity, LedgerTransaction, StatusUpdate, TransactionRequest,
    TxReceipt,
};
use crate::Ledger;

const API_PREFIX: &str = "api/v1";

/// Ledger reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl HttpLedger {
    /// Build a client from configuration. Requires `config.url`.
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| ConfigError::InvalidUrl("LEDGER_URL".into(), "not set".into()))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ConfigError::InvalidToken)?,
            );
        }
        headers.insert(
            "x-ledger-network",
            HeaderValue::from_str(config.network.as_str())
                .map_err(|e| ConfigError::InvalidUrl("LEDGER_CHAIN_ID".into(), e.to_string()))?,
        );
        headers.insert(
            "x-ledger-actor",
            HeaderValue::from_str(&config.actor)
                .map_err(|e| ConfigError::InvalidUrl("LEDGER_ACTOR".into(), e.to_string()))?,
        );

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| LedgerError::from_reqwest("client_init", e))?;

        Ok(Self {
            http,
            base_url,
            retry: config.retry_policy(),
        })
    }

    /// Override the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{API_PREFIX}/{path}")
    }

    /// Send, classify the status, and decode the body.
    async fn call<T, F>(&self, replay: Replay, endpoint: &str, build: F) -> Result<T, LedgerError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let resp = retry_send(self.retry, replay, endpoint, || build().send())
            .await
            .map_err(|e| LedgerError::from_reqwest(endpoint, e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LedgerError::NotFound {
                endpoint: endpoint.to_string(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| LedgerError::Deserialization {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    async fn read<T, F>(&self, endpoint: &str, build: F) -> Result<T, LedgerError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        self.call(Replay::AnyTransport, endpoint, build).await
    }

    /// A timed-out write may already be on the ledger, so it is only
    /// replayed when the connection never opened.
    async fn write<T, F>(&self, endpoint: &str, build: F) -> Result<T, LedgerError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        self.call(Replay::ConnectOnly, endpoint, build).await
    }
}

/// Percent-encode one path segment. DIDs contain `:` and chain ids may too.
fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn submit_transaction(&self, req: &TransactionRequest) -> Result<TxReceipt, LedgerError> {
        let url = self.url("transactions");
        self.write("POST /transactions", || self.http.post(&url).json(req))
            .await
    }

    async fn get_transaction(&self, tx_id: &TxId) -> Result<LedgerTransaction, LedgerError> {
        let endpoint = format!("GET /transactions/{tx_id}");
        let url = self.url(&format!("transactions/{}", segment(tx_id.as_str())));
        self.read(&endpoint, || self.http.get(&url)).await
    }

    async fn list_transactions(&self, chain: &ChainId) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let endpoint = format!("GET /chains/{chain}/transactions");
        let url = self.url(&format!("chains/{}/transactions", segment(chain.as_str())));
        self.read(&endpoint, || self.http.get(&url)).await
    }

    async fn chain_state(&self, chain: &ChainId) -> Result<ChainState, LedgerError> {
        let endpoint = format!("GET /chains/{chain}/state");
        let url = self.url(&format!("chains/{}/state", segment(chain.as_str())));
        self.read(&endpoint, || self.http.get(&url)).await
    }

    async fn register_identity(&self, identity: &LedgerIdentity) -> Result<TxReceipt, LedgerError> {
        let url = self.url("identities");
        self.write("POST /identities", || self.http.post(&url).json(identity))
            .await
    }

    async fn resolve_identity(&self, did: &Did) -> Result<LedgerIdentity, LedgerError> {
        let endpoint = format!("GET /identities/{did}");
        let url = self.url(&format!("identities/{}", segment(did.as_str())));
        self.read(&endpoint, || self.http.get(&url)).await
    }

    async fn set_identity_status(&self, did: &Did, status: DidStatus) -> Result<TxReceipt, LedgerError> {
        let endpoint = format!("PUT /identities/{did}/status");
        let url = self.url(&format!("identities/{}/status", segment(did.as_str())));
        let body = StatusUpdate { status };
        self.write(&endpoint, || self.http.put(&url).json(&body)).await
    }

    async fn register_claim(&self, claim: &LedgerClaim) -> Result<TxReceipt, LedgerError> {
        let url = self.url("claims");
        self.write("POST /claims", || self.http.post(&url).json(claim))
            .await
    }

    async fn claim_record(&self, id: &ClaimId) -> Result<LedgerClaim, LedgerError> {
        let endpoint = format!("GET /claims/{id}");
        let url = self.url(&format!("claims/{id}"));
        self.read(&endpoint, || self.http.get(&url)).await
    }

    async fn revoke_claim(&self, id: &ClaimId) -> Result<TxReceipt, LedgerError> {
        let endpoint = format!("PUT /claims/{id}/revoke");
        let url = self.url(&format!("claims/{id}/revoke"));
        self.write(&endpoint, || self.http.put(&url)).await
    }
}
