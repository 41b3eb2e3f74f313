//! HTTP-level integration tests for the API surface and general behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use common::{body_json, delete, get, post_json, put_json};
use serde_json::json;
use tower::ServiceExt;

use ipguard_db::store::AccessStore;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let (app, _store) = common::build_test_app();
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store_healthy"], true);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let (app, _store) = common::build_test_app();
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let (app, _store) = common::build_test_app();
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight OPTIONS request returns correct headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_returns_correct_headers() {
    let (app, _store) = common::build_test_app();

    // CORS preflight requires custom headers, so we build the request manually.
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/settings")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();

    let allow_origin = headers
        .get("access-control-allow-origin")
        .expect("Missing Access-Control-Allow-Origin header")
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "http://localhost:5173");

    let allow_methods = headers
        .get("access-control-allow-methods")
        .expect("Missing Access-Control-Allow-Methods header")
        .to_str()
        .unwrap();
    assert!(
        allow_methods.contains("GET"),
        "Allow-Methods should contain GET, got: {allow_methods}"
    );
}

// ---------------------------------------------------------------------------
// Test: POST /api/v1/access/check admits and wraps the decision in data
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_check_admits_and_reports_remaining_slots() {
    let (app, _store) = common::build_test_app();

    let response = post_json(
        app,
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "203.0.113.1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["result"], "allowed");
    assert_eq!(json["data"]["remaining_slots"], 2);
    assert_eq!(json["data"]["refreshed"], false);
    assert_eq!(json["data"]["whitelisted"], false);
}

// ---------------------------------------------------------------------------
// Test: blacklisted IP is rejected with 403 and IP_BLACKLISTED code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_check_denies_blacklisted_ip() {
    let (app, store) = common::build_test_app();
    store
        .insert_blacklist(&ipguard_db::models::blacklist::CreateBlacklistEntry {
            rule: "203.0.113.7".into(),
            user_id: None,
            reason: "abuse".into(),
            expires_at: None,
            is_automatic: false,
        })
        .await
        .unwrap();

    let response = post_json(
        app,
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "203.0.113.7" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["code"], "IP_BLACKLISTED");
    assert_eq!(json["details"]["kind"], "blacklisted");
    assert_eq!(json["details"]["reason"], "abuse");
}

// ---------------------------------------------------------------------------
// Test: over-limit rejection carries the online IP list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_check_denies_over_limit_with_online_ips() {
    let (app, _store) = common::build_test_app();

    for n in 1..=3 {
        let response = post_json(
            app.clone(),
            "/api/v1/access/check",
            json!({ "user_id": 1, "ip": format!("203.0.113.{n}") }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = post_json(
        app,
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "203.0.113.4" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = body_json(response).await;
    assert_eq!(json["code"], "IP_LIMIT_EXCEEDED");
    assert_eq!(json["details"]["max_ips"], 3);
    assert_eq!(json["details"]["online_ips"].as_array().unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Test: malformed IP in the check body returns 400
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_check_rejects_malformed_ip() {
    let (app, _store) = common::build_test_app();

    let response = post_json(
        app,
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "not-an-ip" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: failed-attempt endpoint escalates at the threshold
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_attempt_endpoint_reports_escalation() {
    let (app, store) = common::build_test_app();

    for _ in 0..4 {
        let response = post_json(
            app.clone(),
            "/api/v1/access/failed-attempt",
            json!({ "ip": "203.0.113.9" }),
        )
        .await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["escalated"], false);
    }

    let response = post_json(
        app,
        "/api/v1/access/failed-attempt",
        json!({ "ip": "203.0.113.9" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 5);
    assert_eq!(json["data"]["escalated"], true);

    let entries = store.list_blacklist().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_automatic);
}

// ---------------------------------------------------------------------------
// Test: whitelist create validates the rule syntax
// ---------------------------------------------------------------------------

#[tokio::test]
async fn whitelist_rejects_malformed_rule() {
    let (app, _store) = common::build_test_app();

    let response = post_json(
        app,
        "/api/v1/whitelist",
        json!({ "rule": "300.1.2.3/8" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_CIDR");
}

// ---------------------------------------------------------------------------
// Test: whitelist create / list / delete round trip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn whitelist_create_and_delete_round_trip() {
    let (app, _store) = common::build_test_app();

    let response = post_json(
        app.clone(),
        "/api/v1/whitelist",
        json!({ "rule": " 10.0.0.0/8 ", "description": "office" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    // The rule is trimmed at the write boundary.
    assert_eq!(created["data"]["rule"], "10.0.0.0/8");
    let id = created["data"]["id"].as_i64().unwrap();

    let response = get(app.clone(), "/api/v1/whitelist").await;
    let listed = body_json(response).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let response = delete(app.clone(), &format!("/api/v1/whitelist/{id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Deleting again is a 404.
    let response = delete(app, &format!("/api/v1/whitelist/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: blacklist create rejects an expiry in the past
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blacklist_rejects_past_expiry() {
    let (app, _store) = common::build_test_app();

    let response = post_json(
        app,
        "/api/v1/blacklist",
        json!({
            "rule": "203.0.113.7",
            "reason": "test",
            "expires_at": Utc::now() - Duration::hours(1),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Test: API-created blacklist entries are always manual
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blacklist_create_forces_manual() {
    let (app, _store) = common::build_test_app();

    let response = post_json(
        app,
        "/api/v1/blacklist",
        json!({
            "rule": "203.0.113.7",
            "reason": "test",
            "is_automatic": true,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["is_automatic"], false);
}

// ---------------------------------------------------------------------------
// Test: settings GET / PUT round trip, and the new limit takes effect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn settings_round_trip_applies_new_limit() {
    let (app, _store) = common::build_test_app();

    let response = get(app.clone(), "/api/v1/settings").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["default_max_concurrent_ips"], 3);

    let response = put_json(
        app.clone(),
        "/api/v1/settings",
        json!({ "default_max_concurrent_ips": 1 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app.clone(), "/api/v1/settings").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["default_max_concurrent_ips"], 1);

    // The guard reads the live document: second IP is now over the limit.
    let response = post_json(
        app.clone(),
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "203.0.113.1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json(
        app,
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "203.0.113.2" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Test: settings PUT validates the document
// ---------------------------------------------------------------------------

#[tokio::test]
async fn settings_rejects_invalid_document() {
    let (app, _store) = common::build_test_app();

    let response = put_json(
        app,
        "/api/v1/settings",
        json!({ "allowed_countries": ["USA"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: kicking a session blocks the pair on subsequent checks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kick_endpoint_blocks_the_pair() {
    let (app, _store) = common::build_test_app();

    let response = post_json(
        app.clone(),
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "203.0.113.1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = delete(app.clone(), "/api/v1/users/1/sessions/203.0.113.1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["expires_at"].is_string());

    let response = post_json(
        app,
        "/api/v1/access/check",
        json!({ "user_id": 1, "ip": "203.0.113.1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Test: session list and kick-all
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_list_and_kick_all() {
    let (app, _store) = common::build_test_app();

    for n in 1..=2 {
        post_json(
            app.clone(),
            "/api/v1/access/check",
            json!({ "user_id": 1, "ip": format!("203.0.113.{n}") }),
        )
        .await;
    }

    let response = get(app.clone(), "/api/v1/users/1/sessions").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = delete(app.clone(), "/api/v1/users/1/sessions").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["removed"], 2);

    let response = get(app, "/api/v1/users/1/sessions").await;
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: subscription usage and reset endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscription_usage_and_reset() {
    let (app, store) = common::build_test_app();
    store
        .record_subscription_access("tok-1", "203.0.113.1", None, "US")
        .await
        .unwrap();
    store
        .record_subscription_access("tok-1", "203.0.113.2", None, "US")
        .await
        .unwrap();

    let response = get(app.clone(), "/api/v1/subscriptions/tok-1/ips").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["subscription_id"], "tok-1");
    assert_eq!(json["data"]["distinct_ips"], 2);

    let response = delete(app.clone(), "/api/v1/subscriptions/tok-1/ips").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["cleared"], 2);

    let response = get(app, "/api/v1/subscriptions/tok-1/ips").await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["distinct_ips"], 0);
}

// ---------------------------------------------------------------------------
// Test: audit history is visible through the API after admissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_endpoint_returns_recorded_accesses() {
    let (app, _store) = common::build_test_app();

    for n in 1..=2 {
        post_json(
            app.clone(),
            "/api/v1/access/check",
            json!({ "user_id": 1, "ip": format!("203.0.113.{n}") }),
        )
        .await;
    }

    let response = get(app.clone(), "/api/v1/users/1/history").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    // Limited query.
    let response = get(app, "/api/v1/users/1/history?limit=1").await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
