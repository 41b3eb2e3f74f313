//! Route definitions for blacklist administration.
//!
//! ```text
//! GET    /        -> list_blacklist
//! POST   /        -> create_blacklist
//! DELETE /{id}    -> delete_blacklist
//! ```

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::blacklist;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(blacklist::list_blacklist).post(blacklist::create_blacklist),
        )
        .route("/{id}", delete(blacklist::delete_blacklist))
}
