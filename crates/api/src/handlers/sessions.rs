//! Handlers for per-user session visibility, kicks, and audit queries.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use ipguard_db::models::ip_history::HistoryFilter;
use ipguard_core::types::DbId;
use serde_json::json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users/{id}/sessions
///
/// List the user's online IPs, most recently active first.
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let sessions = state.store.online_sessions(user_id).await?;

    Ok(Json(DataResponse { data: sessions }))
}

/// DELETE /api/v1/users/{id}/sessions/{ip}
///
/// Kick one IP off the user's session set and temporarily block the pair.
pub async fn kick_session(
    State(state): State<AppState>,
    Path((user_id, ip)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let block = state.guard.kick_ip(user_id, &ip).await?;

    Ok(Json(DataResponse { data: block }))
}

/// DELETE /api/v1/users/{id}/sessions
///
/// Remove every active session for the user.
pub async fn kick_all_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let removed = state.guard.kick_all(user_id).await?;

    Ok(Json(DataResponse {
        data: json!({ "removed": removed }),
    }))
}

/// GET /api/v1/users/{id}/history
///
/// Filtered audit history, newest first. Query params: `from`, `to`,
/// `access_type`, `suspicious`, `limit`.
pub async fn list_history(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(filter): Query<HistoryFilter>,
) -> AppResult<impl IntoResponse> {
    let records = state.store.history_for_user(user_id, &filter).await?;

    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/users/{id}/ip-stats
///
/// Per-IP aggregates over the user's history, most recently seen first.
pub async fn ip_stats(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let stats = state.store.ip_stats_for_user(user_id).await?;

    Ok(Json(DataResponse { data: stats }))
}
