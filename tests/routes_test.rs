//! Gateway HTTP surface, exercised in-process with `tower::ServiceExt`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use srt_travel_agent::app_state::AppState;
use srt_travel_agent::routes;
use srt_travel_agent::services::job_store::{JobStore, MemoryJobStore};

fn app() -> (Router, Arc<dyn JobStore>) {
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::default());
    let state = AppState::new(Arc::clone(&store));
    (routes::router(state, None), store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_submit_then_poll_pending() {
    let (app, _store) = app();

    let (status, body) = send(
        &app,
        post_json("/submit", json!({ "query": "내일 부산 가는 SRT 기차표" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get(&format!("/results/{}", job_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job_id"], job_id.as_str());
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["result"], "Agent is still working...");
}

#[tokio::test]
async fn test_invoke_alias_and_payload_field() {
    let (app, store) = app();

    let (status, body) = send(&app, post_json("/invoke", json!({ "payload": "부산 기차" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(store.queue_depth().await.unwrap(), 1);
}

#[tokio::test]
async fn test_blank_query_is_unprocessable() {
    let (app, store) = app();

    let (status, body) = send(&app, post_json("/submit", json!({ "query": "   " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Invalid submission"));
    assert_eq!(store.queue_depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_query_field_is_json_error() {
    let (app, store) = app();

    let response = app
        .clone()
        .oneshot(post_json("/submit", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.headers()["content-type"], "application/json");

    let (status, body) = send(&app, post_json("/submit", json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Invalid submission"));
    assert!(error.contains("query"));
    assert_eq!(store.queue_depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let (app, store) = app();

    let request = Request::builder()
        .method("POST")
        .uri("/invoke")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Invalid submission"));

    let request = Request::builder()
        .method("POST")
        .uri("/submit")
        .body(Body::from(r#"{"query": "부산"}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    assert_eq!(store.queue_depth().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let (app, _store) = app();

    let (status, body) = send(&app, get("/results/nonexistent-id")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nonexistent-id"));

    let (status, _) = send(&app, get(&format!("/results/{}", uuid::Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_terminal_result_is_returned() {
    let (app, store) = app();
    let job_id = store.enqueue("내일 부산 가는 SRT 기차표").await.unwrap();
    store.claim_next().await.unwrap();
    store.complete(job_id, "✅ 예매 가능").await.unwrap();

    let (status, body) = send(&app, get(&format!("/results/{}", job_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(body["result"], "✅ 예매 가능");
}

#[tokio::test]
async fn test_health_reports_queue_depth() {
    let (app, store) = app();
    store.enqueue("a").await.unwrap();
    store.enqueue("b").await.unwrap();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["queue_depth"], 2);
    assert_eq!(body["checks"]["running_jobs"], 0);
}
