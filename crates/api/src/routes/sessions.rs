//! Route definitions for per-user session and audit endpoints, mounted at
//! `/users`.
//!
//! ```text
//! GET    /{id}/sessions        -> list_sessions
//! DELETE /{id}/sessions        -> kick_all_sessions
//! DELETE /{id}/sessions/{ip}   -> kick_session
//! GET    /{id}/history         -> list_history
//! GET    /{id}/ip-stats        -> ip_stats
//! ```

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}/sessions",
            get(sessions::list_sessions).delete(sessions::kick_all_sessions),
        )
        .route("/{id}/sessions/{ip}", delete(sessions::kick_session))
        .route("/{id}/history", get(sessions::list_history))
        .route("/{id}/ip-stats", get(sessions::ip_stats))
}
