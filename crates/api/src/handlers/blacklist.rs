//! Handlers for blacklist administration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use ipguard_core::cidr;
use ipguard_core::error::CoreError;
use ipguard_core::types::DbId;
use ipguard_db::models::blacklist::CreateBlacklistEntry;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/blacklist
///
/// All entries, including expired ones. Expired entries never block but
/// stay visible for audit until deleted.
pub async fn list_blacklist(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let entries = state.store.list_blacklist().await?;

    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/blacklist
///
/// Create a manual entry. The rule must be a valid IP or CIDR range and
/// `expires_at`, when set, must be in the future.
pub async fn create_blacklist(
    State(state): State<AppState>,
    Json(mut input): Json<CreateBlacklistEntry>,
) -> AppResult<impl IntoResponse> {
    input.rule = input.rule.trim().to_string();
    cidr::validate_rule(&input.rule)?;

    if let Some(expires_at) = input.expires_at {
        if expires_at <= chrono::Utc::now() {
            return Err(AppError::BadRequest("expires_at must be in the future".into()));
        }
    }

    // Entries created through the API are manual by definition.
    input.is_automatic = false;

    let entry = state.store.insert_blacklist(&input).await?;

    tracing::info!(
        entry_id = entry.id,
        rule = %entry.rule,
        user_id = ?entry.user_id,
        expires_at = ?entry.expires_at,
        "Blacklist entry created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/blacklist/{id}
///
/// Works on manual and automatic entries alike; this is how an operator
/// lifts an automatic block early.
pub async fn delete_blacklist(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.store.delete_blacklist(id).await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "BlacklistEntry",
            id,
        }));
    }

    tracing::info!(entry_id = id, "Blacklist entry deleted");

    Ok(StatusCode::NO_CONTENT)
}
