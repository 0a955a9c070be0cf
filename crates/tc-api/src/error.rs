//! # API Error Types
//!
//! Maps the domain error taxonomy onto HTTP statuses. Every failure body is
//! `{"success": false, "error": {"code", "message"}}`. Storage and internal
//! messages are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tc_anchor::AnchorError;
use tc_core::{StoreError, ValidationError};
use tc_identity::IdentityError;
use tc_ledger::LedgerError;
use tc_proof::ProofError;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `NOT_FOUND`.
    pub code: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    /// A domain rule rejected the input (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// The request could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A transported document could not be decoded (400).
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness conflict (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The ledger failed on a path that depends on it (502).
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Storage or other server-side failure (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Serialization(_) => (StatusCode::BAD_REQUEST, "SERIALIZATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Ledger(_) => (StatusCode::BAD_GATEWAY, "LEDGER_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            Self::Ledger(_) => {
                tracing::error!(error = %self, "ledger dependency failed");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(key) => Self::Conflict(format!("{key} already exists")),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err.to_string())
    }
}

impl From<AnchorError> for AppError {
    fn from(err: AnchorError) -> Self {
        match err {
            AnchorError::Validation(e) => e.into(),
            AnchorError::NotFound(what) => Self::NotFound(what),
            AnchorError::Storage(e) => e.into(),
            AnchorError::Ledger(e) => e.into(),
            AnchorError::Canonicalization(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Validation(e) => e.into(),
            IdentityError::NotFound(what) => Self::NotFound(what),
            IdentityError::Forbidden(msg) => Self::Forbidden(msg),
            IdentityError::Storage(e) => e.into(),
            IdentityError::Ledger(e) => e.into(),
            IdentityError::Crypto(e) => Self::Internal(e.to_string()),
            IdentityError::Canonicalization(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ProofError> for AppError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::Serialization(msg) => Self::Serialization(msg),
            ProofError::UnknownField(_) | ProofError::ProofMismatch => {
                Self::Validation(err.to_string())
            }
            ProofError::Canonicalization(e) => Self::Internal(e.to_string()),
            ProofError::Crypto(e) => Self::Validation(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Serialization("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Ledger("x".into()), StatusCode::BAD_GATEWAY),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_and_code().0, status);
        }
    }

    #[test]
    fn duplicate_store_error_is_conflict() {
        let err: AppError = StoreError::Duplicate("batch_code B-1".into()).into();
        assert!(matches!(err, AppError::Conflict(_)));
        let err: AppError = StoreError::Database("down".into()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn identity_forbidden_maps_to_403() {
        let err: AppError = IdentityError::Forbidden("not issuer".into()).into();
        assert_eq!(err.status_and_code().0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let resp = AppError::Internal("password=hunter2".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("hunter2"));
    }
}
