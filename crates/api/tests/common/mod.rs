//! Shared helpers for the HTTP-level integration tests.

#![allow(dead_code)] // each test binary uses a subset of these helpers

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::RwLock;
use tower::ServiceExt;

use ipguard_api::config::ServerConfig;
use ipguard_api::guard::{AccessGuard, NoopGeoProvider};
use ipguard_api::router::build_app_router;
use ipguard_api::state::AppState;
use ipguard_core::settings::IpRestrictionSettings;
use ipguard_db::store::{AccessStore, MemoryAccessStore};
use ipguard_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        event_webhook_url: None,
        geo_provider_url: "http://ip-api.com/json".to_string(),
    }
}

/// Build the full application router over an in-memory store.
///
/// Returns the store handle alongside the router so tests can seed data
/// behind the API. The router comes from [`build_app_router`], so these
/// tests exercise the same middleware stack production uses.
pub fn build_test_app() -> (Router, Arc<MemoryAccessStore>) {
    build_test_app_with(IpRestrictionSettings::default())
}

/// Same as [`build_test_app`] but with custom subsystem settings.
pub fn build_test_app_with(
    mut settings: IpRestrictionSettings,
) -> (Router, Arc<MemoryAccessStore>) {
    settings.validate().expect("test settings must be valid");

    let config = test_config();
    let store = Arc::new(MemoryAccessStore::new());
    let settings = Arc::new(RwLock::new(settings));
    let event_bus = Arc::new(EventBus::default());

    let guard = Arc::new(AccessGuard::new(
        Arc::clone(&store) as Arc<dyn AccessStore>,
        Arc::clone(&settings),
        Arc::clone(&event_bus),
        Arc::new(NoopGeoProvider),
    ));

    let state = AppState {
        store: Arc::clone(&store) as Arc<dyn AccessStore>,
        settings,
        config: Arc::new(config.clone()),
        event_bus,
        guard,
    };

    (build_app_router(state, &config), store)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
