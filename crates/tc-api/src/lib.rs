//! # tc-api: TraceChain HTTP Service
//!
//! Axum service over the anchoring, identity and proof crates.
//!
//! ## API Surface
//!
//! | Prefix | Module | Domain |
//! |---|---|---|
//! | `/batches/*`, `/events` | [`routes::records`] | Batch mutations with anchoring |
//! | `/blockchain/*` | [`routes::blockchain`] | Anchor search, verification, audit |
//! | `/identity/*` | [`routes::identity`] | DIDs and verifiable claims |
//! | `/zkp/*` | [`routes::zkp`] | Commitment proofs |
//! | `/health/*` | [`routes::health`] | Probes |
//!
//! Responses use the `{"success", "message", "data"}` envelope; errors use
//! [`error::ErrorBody`]. The OpenAPI document is served at `/openapi.json`.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::records::router())
        .merge(routes::blockchain::router())
        .merge(routes::identity::router())
        .merge(routes::zkp::router())
        .merge(openapi::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
