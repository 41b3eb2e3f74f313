//! Handlers for the runtime settings endpoints.
//!
//! Settings live behind an `RwLock` in the application state; a PUT swaps
//! the whole document after validation, so a half-applied update is never
//! observable.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use ipguard_core::settings::IpRestrictionSettings;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let settings = state.settings.read().await.clone();

    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/settings
///
/// Replace the settings document. Partial documents are accepted; omitted
/// fields take their defaults, not the previous values.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(mut input): Json<IpRestrictionSettings>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    {
        let mut settings = state.settings.write().await;
        *settings = input.clone();
    }

    tracing::info!(
        enabled = input.enabled,
        default_max_concurrent_ips = input.default_max_concurrent_ips,
        geo_restriction_enabled = input.geo_restriction_enabled,
        "Settings updated"
    );

    Ok(Json(DataResponse { data: input }))
}
