// tests/webhook_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /webhook/ghost validation and the not-published skip
// - selector edge cases (incomplete credentials, disabled channels)
// - GET /api/logs, /api/logs/{id}, /api/stats

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use ghost_notify::api::{create_router, AppState};
use ghost_notify::audit::{AuditStore, MemoryAuditStore};
use ghost_notify::config::StaticConfigSource;
use ghost_notify::registry::ChannelConfig;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, on in-memory collaborators.
fn test_app(configs: Vec<ChannelConfig>) -> (Router, Arc<MemoryAuditStore>) {
    let store = Arc::new(MemoryAuditStore::new());
    let state = AppState::new(Arc::new(StaticConfigSource::new(configs)), store.clone());
    (create_router(state), store)
}

fn creds(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn post_webhook(app: Router, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri("/webhook/ghost")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /webhook/ghost");

    let resp = app.oneshot(req).await.expect("oneshot /webhook/ghost");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = serde_json::from_slice(&bytes).expect("parse json body");
    (status, body)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_else(|e| panic!("build GET {uri}: {e}"));
    let resp = app.oneshot(req).await.expect("oneshot GET");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = serde_json::from_slice(&bytes).expect("parse json body");
    (status, body)
}

#[tokio::test]
async fn health_returns_ok_body() {
    let (app, _) = test_app(vec![]);
    let (status, body) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK, "health should be 200");
    assert_eq!(
        body,
        json!({ "status": "ok", "message": "Webhook handler is running" })
    );
}

#[tokio::test]
async fn missing_post_is_rejected_with_nothing_audited() {
    let (app, store) = test_app(vec![]);

    let (status, body) = post_webhook(app.clone(), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid webhook payload" }));

    let (status, body) = post_webhook(app, json!({ "post": {} })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing current is also 400");
    assert_eq!(body, json!({ "error": "Invalid webhook payload" }));

    let events = store.events(10, 0).await.expect("list events");
    assert!(events.is_empty(), "rejected payloads must not be audited");
}

#[tokio::test]
async fn unpublished_post_is_skipped_without_audit() {
    let (app, store) = test_app(vec![ChannelConfig::new(
        "telegram",
        creds(&[("botToken", "t"), ("chatId", "c")]),
    )]);

    let payload = json!({
        "post": { "current": { "id": "1", "title": "Draft", "status": "draft" } }
    });
    let (status, body) = post_webhook(app, payload).await;
    assert_eq!(status, StatusCode::OK, "skip is a success, not an error");
    assert_eq!(
        body,
        json!({ "success": true, "message": "Post is not published" })
    );

    let events = store.events(10, 0).await.expect("list events");
    assert!(events.is_empty(), "skipped events must not be audited");
    let stats = store.stats().await.expect("stats");
    assert!(stats.notifications.is_empty(), "no channel was invoked");
}

#[tokio::test]
async fn incomplete_credentials_mean_zero_dispatches() {
    // enabled=true but chatId missing: the selector must exclude the
    // channel, so the event settles with zero notifications and no
    // outbound call is ever attempted.
    let (app, store) = test_app(vec![ChannelConfig::new(
        "telegram",
        creds(&[("botToken", "t")]),
    )]);

    let payload = json!({
        "post": { "current": {
            "id": "1", "title": "Hi", "url": "https://x/1", "status": "published",
            "authors": [{ "name": "A" }],
        } }
    });
    let (status, body) = post_webhook(app, payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["notifications"], json!([]));

    let events = store.events(10, 0).await.expect("list events");
    assert_eq!(events.len(), 1, "the event itself is still audited");
    assert_eq!(events[0].status, "success");
    let detail = store
        .event(&events[0].id)
        .await
        .expect("lookup")
        .expect("present");
    assert!(
        detail.notifications.is_empty(),
        "no channel entry for an excluded platform"
    );
}

#[tokio::test]
async fn disabled_channel_is_not_dispatched() {
    let mut config = ChannelConfig::new("slack", creds(&[("webhookUrl", "https://hooks")]));
    config.enabled = false;
    let (app, store) = test_app(vec![config]);

    let payload = json!({
        "post": { "current": {
            "id": "1", "title": "Hi", "url": "https://x/1", "status": "published",
        } }
    });
    let (status, body) = post_webhook(app, payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications"], json!([]));

    let stats = store.stats().await.expect("stats");
    assert!(stats.notifications.is_empty());
}

#[tokio::test]
async fn webhook_response_echoes_the_normalized_post() {
    let (app, _) = test_app(vec![]);

    let payload = json!({
        "post": { "current": {
            "id": "1", "title": "Hi", "url": "https://x/1", "status": "published",
            "custom_excerpt": "Fallback text",
            "authors": [{ "name": "A" }],
        } }
    });
    let (status, body) = post_webhook(app, payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Notifications sent"));
    assert_eq!(body["post"]["id"], json!("1"));
    assert_eq!(body["post"]["excerpt"], json!("Fallback text"));
    assert_eq!(body["post"]["authors"], json!(["A"]));
    assert_eq!(body["post"]["feature_image"], Json::Null);
}

#[tokio::test]
async fn logs_endpoints_page_and_404() {
    let (app, _) = test_app(vec![]);

    // Two processed events.
    for n in 1..=2 {
        let payload = json!({
            "post": { "current": {
                "id": n.to_string(), "title": format!("Post {n}"),
                "url": format!("https://x/{n}"), "status": "published",
            } }
        });
        let (status, _) = post_webhook(app.clone(), payload).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = get_json(app.clone(), "/api/logs?limit=1&page=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], json!(1));
    let logs = body["logs"].as_array().expect("logs array");
    assert_eq!(logs.len(), 1, "limit honored");
    assert_eq!(logs[0]["post_title"], json!("Post 2"), "newest first");

    let (status, body) = get_json(app.clone(), "/api/logs?limit=1&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logs"][0]["post_title"], json!("Post 1"));

    let id = logs[0]["id"].as_str().expect("id").to_string();
    let (status, body) = get_json(app.clone(), &format!("/api/logs/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post_title"], json!("Post 2"));
    assert_eq!(body["status"], json!("success"));

    let (status, body) = get_json(app, "/api/logs/no-such-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Log not found" }));
}

#[tokio::test]
async fn stats_shape_matches_the_dashboard_contract() {
    let (app, _) = test_app(vec![]);

    let payload = json!({
        "post": { "current": {
            "id": "1", "title": "Hi", "url": "https://x/1", "status": "published",
        } }
    });
    let (status, _) = post_webhook(app.clone(), payload).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["webhookStats"]["total"], json!(1));
    assert_eq!(body["webhookStats"]["success"], json!(1));
    assert!(body["notificationStats"].is_array());
}
