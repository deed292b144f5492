// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /cycle/run
// - GET /articles/inbox
// - POST /articles/{id}/feedback

mod common;

use std::sync::Arc;

use common::{rss, FakeResponse, FakeTransport, TestEnv};
use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use rss_intel_monitor::api::{self, AppState};

const BODY_LIMIT: usize = 1024 * 1024;
const FEED: &str = "https://feed.test/rss";

/// Build the same Router the binary uses, minus the Prometheus recorder.
async fn test_app(env: &TestEnv) -> Router {
    env.add_source("Wire", FEED).await;
    env.store.add_keyword("critical", 50).await.unwrap();
    env.store.add_keyword("rce", 60).await.unwrap();

    let transport = Arc::new(FakeTransport::new().serve(
        FEED,
        FakeResponse::Body(rss(&[
            ("Critical RCE found", "https://feed.test/1", ""),
            ("Office party", "https://feed.test/2", ""),
        ])),
    ));
    let runner = Arc::new(env.runner(transport, 50.0, 4));
    api::router(AppState { runner }, None)
}

async fn json_body(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn manual_trigger_runs_one_cycle_and_reports_summary() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let req = Request::builder()
        .method("POST")
        .uri("/cycle/run")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let summary = json_body(resp).await;
    assert_eq!(summary["trigger"], "User Force");
    assert_eq!(summary["total_added"], 2);
    assert_eq!(summary["total_bubbled"], 1);
    assert_eq!(summary["scorer"], "keyword");

    let req = Request::get("/articles/inbox").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let inbox = json_body(resp).await;
    let items = inbox.as_array().expect("array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["link"], "https://feed.test/1");
    assert_eq!(items[0]["score"], 110.0);
    assert_eq!(items[0]["human_feedback"], "unreviewed");
}

#[tokio::test]
async fn feedback_removes_article_from_inbox() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let run = Request::post("/cycle/run").body(Body::empty()).unwrap();
    app.clone().oneshot(run).await.unwrap();
    let id = env
        .store
        .article_by_link("https://feed.test/1")
        .await
        .unwrap()
        .expect("stored")
        .id;

    let req = Request::builder()
        .method("POST")
        .uri(format!("/articles/{id}/feedback"))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "feedback": "confirmed" }).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::get("/articles/inbox?limit=5").body(Body::empty()).unwrap();
    let inbox = json_body(app.clone().oneshot(req).await.unwrap()).await;
    assert_eq!(inbox.as_array().unwrap().len(), 0);

    let req = Request::get("/articles/confirmed").body(Body::empty()).unwrap();
    let confirmed = json_body(app.oneshot(req).await.unwrap()).await;
    assert_eq!(confirmed[0]["id"], id);
}

#[tokio::test]
async fn feedback_for_unknown_article_is_404() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let req = Request::builder()
        .method("POST")
        .uri("/articles/424242/feedback")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "feedback": "dismissed" }).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn metrics_route_is_absent_without_recorder() {
    let env = TestEnv::new().await;
    let app = test_app(&env).await;

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
