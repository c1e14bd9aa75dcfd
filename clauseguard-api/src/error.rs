//! API error type and HTTP status mapping
//!
//! Every failure surfaced to a caller maps to a distinct `(status, code)`
//! pair with a short message. Internal detail (SQL text, backend payloads)
//! stays in the log, never in the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, invalid, or unresolvable bearer credential (401)
    #[error("Unauthorized")]
    Unauthenticated,

    /// Free-tier quota exhausted without an active subscription (402)
    #[error("Free tier used. Please upgrade or pay.")]
    EntitlementDenied,

    /// Malformed request body or missing field (400)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Uploaded binary could not be parsed as a document (400)
    #[error("Could not read the uploaded document")]
    UnreadableDocument,

    /// Analysis backend returned output violating the contract (500)
    #[error("Analysis response violated the output contract: {0}")]
    AnalysisFormat(String),

    /// Transient upstream failure, analysis backend or payment processor (502)
    #[error("Upstream service unavailable")]
    UpstreamUnavailable(String),

    /// Storage-layer failure (500)
    #[error("Storage failure")]
    Persistence(#[source] sqlx::Error),

    /// Webhook signature missing or invalid (400)
    #[error("Invalid webhook signature")]
    Signature,

    /// Absent record, or a record owned by another user (404)
    #[error("Not found")]
    NotFound,

    /// Anything else (500)
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", self.to_string())
            }
            ApiError::EntitlementDenied => (
                StatusCode::PAYMENT_REQUIRED,
                "ENTITLEMENT_DENIED",
                self.to_string(),
            ),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION", self.to_string()),
            ApiError::UnreadableDocument => (
                StatusCode::BAD_REQUEST,
                "UNREADABLE_DOCUMENT",
                self.to_string(),
            ),
            ApiError::AnalysisFormat(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ANALYSIS_FORMAT",
                self.to_string(),
            ),
            ApiError::UpstreamUnavailable(detail) => {
                tracing::warn!("Upstream failure: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNAVAILABLE",
                    "Upstream service unavailable".to_string(),
                )
            }
            ApiError::Persistence(err) => {
                tracing::error!("Storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE",
                    "Storage failure".to_string(),
                )
            }
            ApiError::Signature => (
                StatusCode::BAD_REQUEST,
                "INVALID_SIGNATURE",
                self.to_string(),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
