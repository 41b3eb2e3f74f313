//! Route definitions for subscription IP accounting.
//!
//! ```text
//! GET    /{id}/ips    -> get_usage
//! DELETE /{id}/ips    -> reset_usage
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::subscriptions;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}/ips",
        get(subscriptions::get_usage).delete(subscriptions::reset_usage),
    )
}
