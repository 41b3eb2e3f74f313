//! Route definitions for the access decision endpoints.
//!
//! ```text
//! POST /check            -> check_access
//! POST /activity         -> record_activity
//! POST /release          -> release
//! POST /failed-attempt   -> report_failed_attempt
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::access;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check", post(access::check_access))
        .route("/activity", post(access::record_activity))
        .route("/release", post(access::release))
        .route("/failed-attempt", post(access::report_failed_attempt))
}
