//! Handlers for subscription IP accounting.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/subscriptions/{id}/ips
///
/// Distinct-IP usage for a subscription token.
pub async fn get_usage(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let distinct_ips = state
        .store
        .subscription_distinct_ips(&subscription_id)
        .await?;

    Ok(Json(DataResponse {
        data: json!({
            "subscription_id": subscription_id,
            "distinct_ips": distinct_ips,
        }),
    }))
}

/// DELETE /api/v1/subscriptions/{id}/ips
///
/// Reset the accounting, typically after a token regeneration.
pub async fn reset_usage(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let cleared = state
        .store
        .reset_subscription_access(&subscription_id)
        .await?;

    tracing::info!(subscription_id = %subscription_id, cleared, "Subscription IP accounting reset");

    Ok(Json(DataResponse {
        data: json!({ "cleared": cleared }),
    }))
}
