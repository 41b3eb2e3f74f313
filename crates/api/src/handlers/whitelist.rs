//! Handlers for whitelist administration.
//!
//! Rule syntax is validated at this write boundary so the decision path can
//! trust every stored rule.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use ipguard_core::cidr;
use ipguard_core::error::CoreError;
use ipguard_core::types::DbId;
use ipguard_db::models::whitelist::CreateWhitelistEntry;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/whitelist
pub async fn list_whitelist(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let entries = state.store.list_whitelist().await?;

    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/whitelist
///
/// Create an entry. The rule must be a valid IP or CIDR range.
pub async fn create_whitelist(
    State(state): State<AppState>,
    Json(mut input): Json<CreateWhitelistEntry>,
) -> AppResult<impl IntoResponse> {
    input.rule = input.rule.trim().to_string();
    cidr::validate_rule(&input.rule)?;

    let entry = state.store.insert_whitelist(&input).await?;

    tracing::info!(entry_id = entry.id, rule = %entry.rule, user_id = ?entry.user_id, "Whitelist entry created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/whitelist/{id}
pub async fn delete_whitelist(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = state.store.delete_whitelist(id).await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "WhitelistEntry",
            id,
        }));
    }

    tracing::info!(entry_id = id, "Whitelist entry deleted");

    Ok(StatusCode::NO_CONTENT)
}
