//! Handlers for the access decision endpoints.
//!
//! These are the hot-path endpoints called by the proxy/subscription layers
//! on every connection attempt. Denials are not errors: they come back as
//! `403` with the rejection code and full context so the caller can render
//! a useful message.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ipguard_core::decision::{AccessDecision, DenyReason};
use ipguard_core::types::DbId;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::guard::AccessRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/access/check
///
/// Run the full decision path for one connection attempt.
pub async fn check_access(
    State(state): State<AppState>,
    Json(req): Json<AccessRequest>,
) -> AppResult<Response> {
    let decision = state.guard.check_access(&req).await?;
    Ok(decision_response(decision))
}

/// Body for activity/release calls.
#[derive(Debug, Deserialize)]
pub struct SessionRef {
    pub user_id: DbId,
    pub ip: String,
}

/// POST /api/v1/access/activity
///
/// Refresh `last_active` for a live session so it survives the inactivity
/// sweep.
pub async fn record_activity(
    State(state): State<AppState>,
    Json(input): Json<SessionRef>,
) -> AppResult<impl IntoResponse> {
    let refreshed = state.guard.record_activity(input.user_id, &input.ip).await?;

    Ok(Json(DataResponse {
        data: json!({ "refreshed": refreshed }),
    }))
}

/// POST /api/v1/access/release
///
/// Voluntary disconnect; frees the concurrency slot immediately.
pub async fn release(
    State(state): State<AppState>,
    Json(input): Json<SessionRef>,
) -> AppResult<impl IntoResponse> {
    let released = state.guard.release(input.user_id, &input.ip).await?;

    Ok(Json(DataResponse {
        data: json!({ "released": released }),
    }))
}

/// Body for failure reports.
#[derive(Debug, Deserialize)]
pub struct FailedAttemptBody {
    pub ip: String,
}

/// POST /api/v1/access/failed-attempt
///
/// Report one failed authentication attempt; may escalate the IP to the
/// automatic blacklist.
pub async fn report_failed_attempt(
    State(state): State<AppState>,
    Json(input): Json<FailedAttemptBody>,
) -> AppResult<impl IntoResponse> {
    let report = state.guard.report_failed_attempt(&input.ip).await?;

    Ok(Json(DataResponse { data: report }))
}

/// Map a decision to its wire shape: `200 { data }` for admissions,
/// `403 { error, code, details }` for rejections.
fn decision_response(decision: AccessDecision) -> Response {
    match decision {
        AccessDecision::Allowed { .. } => {
            Json(DataResponse { data: decision }).into_response()
        }
        AccessDecision::Denied { reason } => {
            let body = json!({
                "error": deny_message(&reason),
                "code": reason.code(),
                "details": reason,
            });
            (StatusCode::FORBIDDEN, Json(body)).into_response()
        }
    }
}

fn deny_message(reason: &DenyReason) -> String {
    match reason {
        DenyReason::LimitExceeded { max_ips, .. } => {
            format!("Concurrent IP limit reached ({max_ips})")
        }
        DenyReason::Blacklisted { reason, .. } => format!("IP is blocked: {reason}"),
        DenyReason::GeoRestricted { country } => {
            format!("Access from {country} is not permitted")
        }
        DenyReason::SubscriptionIpLimit { limit, .. } => {
            format!("Subscription IP limit reached ({limit})")
        }
    }
}
