//! Route definitions for the runtime settings endpoints.
//!
//! ```text
//! GET /    -> get_settings
//! PUT /    -> update_settings
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::settings;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(settings::get_settings).put(settings::update_settings))
}
