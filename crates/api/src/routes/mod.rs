pub mod access;
pub mod blacklist;
pub mod health;
pub mod sessions;
pub mod settings;
pub mod subscriptions;
pub mod whitelist;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /access/check                       decide one connection attempt (POST)
/// /access/activity                    refresh a session (POST)
/// /access/release                     voluntary disconnect (POST)
/// /access/failed-attempt              report an auth failure (POST)
///
/// /users/{id}/sessions                list online IPs, kick all (GET, DELETE)
/// /users/{id}/sessions/{ip}           kick one IP (DELETE)
/// /users/{id}/history                 audit history (GET)
/// /users/{id}/ip-stats                per-IP aggregates (GET)
///
/// /whitelist                          list, create (GET, POST)
/// /whitelist/{id}                     delete (DELETE)
/// /blacklist                          list, create (GET, POST)
/// /blacklist/{id}                     delete (DELETE)
///
/// /subscriptions/{id}/ips             usage, reset (GET, DELETE)
///
/// /settings                           get, replace (GET, PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/access", access::router())
        .nest("/users", sessions::router())
        .nest("/whitelist", whitelist::router())
        .nest("/blacklist", blacklist::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/settings", settings::router())
}
