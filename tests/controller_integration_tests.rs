//! Integration Tests for the Fetch Controller
//!
//! Runs the controller over `ReqwestTransport` against a local axum server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fetch_cache::{
    CacheBackend, CacheEntry, ErrorInfo, FetchConfig, FetchController, FetchRequest,
    MemoryCache, ReqwestTransport,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct User {
    id: u32,
    name: String,
}

// == Test Server ==

#[derive(Clone, Default)]
struct Hits {
    users: Arc<AtomicUsize>,
    flaky: Arc<AtomicUsize>,
    broken: Arc<AtomicUsize>,
    rejected: Arc<AtomicUsize>,
    slow: Arc<AtomicUsize>,
}

async fn user_handler(State(hits): State<Hits>, Path(id): Path<u32>) -> Json<Value> {
    hits.users.fetch_add(1, Ordering::SeqCst);
    Json(json!({"id": id, "name": format!("user-{}", id)}))
}

async fn flaky_handler(State(hits): State<Hits>) -> (StatusCode, Json<Value>) {
    let seen = hits.flaky.fetch_add(1, Ordering::SeqCst);
    if seen < 2 {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "statusCode": 503,
                "message": "warming up",
                "error": "Service Unavailable"
            })),
        )
    } else {
        (StatusCode::OK, Json(json!({"id": 7, "name": "flaky"})))
    }
}

async fn broken_handler(State(hits): State<Hits>) -> (StatusCode, Json<Value>) {
    hits.broken.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "statusCode": 500,
            "message": "database unavailable",
            "error": "Internal Server Error"
        })),
    )
}

// 200 on the wire, failure in the body
async fn rejected_handler(State(hits): State<Hits>) -> Json<Value> {
    hits.rejected.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "statusCode": 400,
        "message": "quota exceeded",
        "error": "Bad Request"
    }))
}

async fn slow_handler(State(hits): State<Hits>) -> Json<Value> {
    hits.slow.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    Json(json!({"id": 99, "name": "slow"}))
}

async fn echo_handler(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let name = headers
        .get("x-user-name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous");
    Json(json!({"id": body["id"], "name": name}))
}

async fn spawn_server() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/users/:id", get(user_handler))
        .route("/flaky", get(flaky_handler))
        .route("/broken", get(broken_handler))
        .route("/rejected", get(rejected_handler))
        .route("/slow", get(slow_handler))
        .route("/echo", post(echo_handler))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), hits)
}

// == Helper Functions ==

fn test_config() -> FetchConfig {
    FetchConfig::default().with_retry_interval(Duration::from_millis(20))
}

fn build(
    request: impl Into<FetchRequest>,
    config: FetchConfig,
    cache: Arc<MemoryCache>,
) -> FetchController<User> {
    FetchController::builder(request)
        .config(config)
        .cache(cache)
        .transport(Arc::new(ReqwestTransport::new()))
        .build()
        .unwrap()
}

// == Cache Behaviour ==

#[tokio::test]
async fn test_fresh_cache_answers_without_network() {
    let (base, hits) = spawn_server().await;
    let cache = Arc::new(MemoryCache::new(16));
    let url = format!("{}/users/1", base);

    let first = build(url.as_str(), test_config(), cache.clone());
    let state = first.settled().await;
    assert_eq!(state.data().unwrap().name, "user-1");

    // A second controller sharing the cache reuses the response
    let second = build(url.as_str(), test_config(), cache.clone());
    let cached = second.settled().await;
    assert_eq!(cached.response, state.response);

    // Repeated cache-aware refetches are identical and free
    for _ in 0..3 {
        second.refetch(true);
        assert_eq!(second.settled().await.response, state.response);
    }
    assert_eq!(hits.users.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_entry_triggers_network() {
    let (base, hits) = spawn_server().await;
    let cache = Arc::new(MemoryCache::new(16));
    let url = format!("{}/users/2", base);

    let old = Utc::now() - chrono::Duration::minutes(15);
    cache
        .write(
            &url,
            CacheEntry::with_stored_at(json!({"id": 2, "name": "outdated"}), old),
        )
        .await
        .unwrap();

    let ctrl = build(url.as_str(), test_config(), cache.clone());
    let state = ctrl.settled().await;

    assert_eq!(state.data().unwrap().name, "user-2");
    assert_eq!(hits.users.load(Ordering::SeqCst), 1);

    // Write-through replaced the stale entry
    let entry = cache.read(&url).await.unwrap().unwrap();
    assert_eq!(entry.body["name"], "user-2");
    assert!(entry.is_fresh(Duration::from_secs(60)));
}

#[tokio::test]
async fn test_refetch_without_cache_hits_network() {
    let (base, hits) = spawn_server().await;
    let cache = Arc::new(MemoryCache::new(16));
    let ctrl = build(format!("{}/users/3", base), test_config(), cache);
    ctrl.settled().await;

    ctrl.refetch(false);
    ctrl.settled().await;
    assert_eq!(hits.users.load(Ordering::SeqCst), 2);

    ctrl.refetch(true);
    ctrl.settled().await;
    assert_eq!(hits.users.load(Ordering::SeqCst), 2);
}

// == Retry Behaviour ==

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let (base, hits) = spawn_server().await;
    let ctrl = build(
        format!("{}/flaky", base),
        test_config(),
        Arc::new(MemoryCache::new(16)),
    );

    let state = ctrl.settled().await;
    assert_eq!(state.data().unwrap().name, "flaky");
    assert!(state.error.is_none());
    assert_eq!(hits.flaky.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_persistent_failure_stops_at_max_retries() {
    let (base, hits) = spawn_server().await;
    let cache = Arc::new(MemoryCache::new(16));
    let url = format!("{}/broken", base);
    let ctrl = build(url.as_str(), test_config(), cache.clone());

    let state = ctrl.settled().await;
    assert!(state.response.is_none());
    assert_eq!(
        state.error,
        Some(ErrorInfo::new(
            "database unavailable",
            500,
            "Internal Server Error"
        ))
    );
    assert_eq!(hits.broken.load(Ordering::SeqCst), 3);
    assert!(cache.read(&url).await.unwrap().is_none());
}

#[tokio::test]
async fn test_application_error_body_is_retried() {
    let (base, hits) = spawn_server().await;
    let config = test_config().with_max_retries(2);
    let ctrl = build(
        format!("{}/rejected", base),
        config,
        Arc::new(MemoryCache::new(16)),
    );

    let state = ctrl.settled().await;
    assert_eq!(
        state.error,
        Some(ErrorInfo::new("quota exceeded", 400, "Bad Request"))
    );
    assert_eq!(hits.rejected.load(Ordering::SeqCst), 2);
}

// == Cancellation & Supersession ==

#[tokio::test]
async fn test_abort_during_request() {
    let (base, _hits) = spawn_server().await;
    let ctrl = build(
        format!("{}/slow", base),
        test_config(),
        Arc::new(MemoryCache::new(16)),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    ctrl.abort();

    let state = ctrl.settled().await;
    assert_eq!(state.error, Some(ErrorInfo::aborted()));
    assert_eq!(state.error.unwrap().status_code, -1);
}

#[tokio::test]
async fn test_abort_during_retry_delay() {
    let (base, hits) = spawn_server().await;
    let config = test_config().with_retry_interval(Duration::from_secs(30));
    let ctrl = build(
        format!("{}/broken", base),
        config,
        Arc::new(MemoryCache::new(16)),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    ctrl.abort();

    let state = tokio::time::timeout(Duration::from_secs(5), ctrl.settled())
        .await
        .expect("abort should cut the retry delay short");
    assert_eq!(state.error, Some(ErrorInfo::aborted()));
    assert_eq!(hits.broken.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_identity_change_supersedes_slow_request() {
    let (base, _hits) = spawn_server().await;
    let cache = Arc::new(MemoryCache::new(16));
    let slow_url = format!("{}/slow", base);
    let ctrl = build(slow_url.as_str(), test_config(), cache.clone());

    tokio::time::sleep(Duration::from_millis(50)).await;
    ctrl.set_request(format!("{}/users/5", base));

    let state = ctrl.settled().await;
    assert_eq!(state.data().unwrap().name, "user-5");

    // Give the superseded request time to finish on the server
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(ctrl.state().data().unwrap().name, "user-5");
    assert!(cache.read(&slow_url).await.unwrap().is_none());
}

// == Request Passthrough ==

#[tokio::test]
async fn test_method_headers_and_body_pass_through() {
    let (base, _hits) = spawn_server().await;
    let mut request = FetchRequest::get(format!("{}/echo", base));
    request.method = Method::POST;
    request
        .headers
        .push(("x-user-name".to_string(), "grace".to_string()));
    request.body = Some(json!({"id": 12}));

    let ctrl = build(request, test_config(), Arc::new(MemoryCache::new(16)));

    let state = ctrl.settled().await;
    assert_eq!(
        state.data(),
        Some(&User {
            id: 12,
            name: "grace".to_string()
        })
    );
}

#[tokio::test]
async fn test_connection_refused_surfaces_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let ctrl = build(
        format!("http://{}/users/1", addr),
        test_config().with_max_retries(2),
        Arc::new(MemoryCache::new(16)),
    );

    let state = ctrl.settled().await;
    let error = state.error.unwrap();
    assert_eq!(error.status_code, 0);
    assert_eq!(error.error, "Network Error");
}
