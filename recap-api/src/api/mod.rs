//! HTTP API surface

pub mod handlers;

use axum::http::StatusCode;
use axum::Json;
use recap_common::Error;
use serde::Serialize;
use tracing::error;

/// Error envelope returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_usage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl ErrorResponse {
    fn new(error: &'static str, message: String) -> Self {
        Self {
            error,
            message,
            current_usage: None,
            limit: None,
        }
    }
}

/// Map a domain error onto its HTTP status and envelope
pub fn error_response(err: Error) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        Error::Validation(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("VALIDATION_ERROR", message)),
        ),
        Error::QuotaExceeded {
            message,
            current_usage,
            limit,
        } => (
            StatusCode::PAYMENT_REQUIRED,
            Json(ErrorResponse {
                error: "QUOTA_EXCEEDED",
                message,
                current_usage: Some(current_usage),
                limit: Some(limit),
            }),
        ),
        Error::NotFound(message) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("NOT_FOUND", message)),
        ),
        Error::AlreadyClaimed(message) => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("ALREADY_CLAIMED", message)),
        ),
        Error::Database(e) => {
            // Transient from the caller's perspective; retried with backoff
            // on their side, not ours
            error!("Store error: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "TRANSIENT_STORE_ERROR",
                    "Storage temporarily unavailable, retry with backoff".to_string(),
                )),
            )
        }
        Error::InvariantViolation(message) => {
            // Already logged with owner detail at the detection site
            error!("Ledger invariant violation surfaced to API: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "INVARIANT_VIOLATION",
                    "Usage accounting inconsistency detected; operators notified".to_string(),
                )),
            )
        }
        other => {
            error!("Internal error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )),
            )
        }
    }
}
