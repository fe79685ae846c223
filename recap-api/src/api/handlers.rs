//! HTTP request handlers
//!
//! REST endpoints for summary creation, claims and usage reporting.

use crate::api::{error_response, ErrorResponse};
use crate::identity::ClientSignals;
use crate::quota::QuotaDecision;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use recap_common::db::models::Summary;
use recap_common::plan::ANONYMOUS_OWNER_ID;
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AnonymousCreateRequest {
    pub url: String,
    pub fingerprint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AutoClaimRequest {
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary_id: String,
    pub owner_id: String,
    pub video_id: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub claimed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Summary> for SummaryResponse {
    fn from(summary: Summary) -> Self {
        let mut metadata = serde_json::from_str(&summary.metadata)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
        // Sentinel-owned artifacts are shared across anonymous visitors;
        // the stored fingerprint/IP identify whoever created one and must
        // stay server-side (they are only for quota matching)
        if summary.owner_id == ANONYMOUS_OWNER_ID.to_string() {
            if let serde_json::Value::Object(ref mut doc) = metadata {
                doc.remove("fingerprint");
                doc.remove("client_ip");
            }
        }
        SummaryResponse {
            summary_id: summary.guid,
            owner_id: summary.owner_id,
            video_id: summary.video_id,
            content: summary.content,
            metadata,
            claimed_at: summary.claimed_at,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub current_usage: i64,
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_resets_at: Option<DateTime<Utc>>,
}

impl From<QuotaDecision> for UsageResponse {
    fn from(decision: QuotaDecision) -> Self {
        UsageResponse {
            current_usage: decision.current_usage,
            limit: decision.limit,
            remaining: decision.remaining,
            window_resets_at: decision.window_resets_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AutoClaimResponse {
    pub claimed: Vec<SummaryResponse>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Extract the authenticated owner id from the x-user-id header
fn require_owner(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "UNAUTHORIZED",
                message: "Missing x-user-id header".to_string(),
                current_usage: None,
                limit: None,
            }),
        ))
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "recap-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Summary Endpoints
// ============================================================================

/// POST /summaries - Create a summary for an authenticated owner
pub async fn create_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRequest>,
) -> Result<(StatusCode, Json<SummaryResponse>), ApiError> {
    let owner_id = require_owner(&headers)?;

    match state.guard.create(&owner_id, &req.url).await {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            Ok((status, Json(outcome.summary.into())))
        }
        Err(e) => Err(error_response(e)),
    }
}

/// POST /summaries/anonymous - Create a summary for an anonymous visitor
pub async fn create_anonymous_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AnonymousCreateRequest>,
) -> Result<(StatusCode, Json<SummaryResponse>), ApiError> {
    let signals = ClientSignals::resolve(&headers, req.fingerprint.as_deref());

    match state.guard.create_anonymous(&signals, &req.url).await {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            Ok((status, Json(outcome.summary.into())))
        }
        Err(e) => Err(error_response(e)),
    }
}

// ============================================================================
// Claim Endpoints
// ============================================================================

/// POST /summaries/:id/claim - Claim an anonymous summary
pub async fn claim_summary(
    State(state): State<AppState>,
    Path(summary_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SummaryResponse>, ApiError> {
    let owner_id = require_owner(&headers)?;

    match state.claims.claim(&owner_id, &summary_id).await {
        Ok(summary) => Ok(Json(summary.into())),
        Err(e) => Err(error_response(e)),
    }
}

/// POST /claims/auto - Claim all anonymous summaries for a fingerprint
pub async fn auto_claim(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AutoClaimRequest>,
) -> Result<Json<AutoClaimResponse>, ApiError> {
    let owner_id = require_owner(&headers)?;

    match state.claims.auto_claim(&owner_id, &req.fingerprint).await {
        Ok(summaries) => Ok(Json(AutoClaimResponse {
            claimed: summaries.into_iter().map(Into::into).collect(),
        })),
        Err(e) => Err(error_response(e)),
    }
}

// ============================================================================
// Usage Endpoint
// ============================================================================

/// GET /usage - Usage report for the requesting identity
///
/// Authenticated when x-user-id is present, otherwise evaluated against
/// the anonymous signal pair.
pub async fn get_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>, ApiError> {
    let result = if let Ok(owner_id) = require_owner(&headers) {
        state.guard.get_usage(&owner_id).await
    } else {
        let signals = ClientSignals::resolve(&headers, None);
        state.guard.get_anonymous_usage(&signals).await
    };

    match result {
        Ok(decision) => Ok(Json(decision.into())),
        Err(e) => Err(error_response(e)),
    }
}
