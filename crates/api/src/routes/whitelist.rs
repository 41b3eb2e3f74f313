//! Route definitions for whitelist administration.
//!
//! ```text
//! GET    /        -> list_whitelist
//! POST   /        -> create_whitelist
//! DELETE /{id}    -> delete_whitelist
//! ```

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::whitelist;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(whitelist::list_whitelist).post(whitelist::create_whitelist),
        )
        .route("/{id}", delete(whitelist::delete_whitelist))
}
