//! End-to-end HTTP scenarios driven in-process via `tower::ServiceExt::oneshot`
//! — axum routers are `tower::Service`s, so no real socket is needed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::{json, Value};
use tower::ServiceExt;

use splus_cache::cache::CacheMap;
use splus_cache::config::Config;
use splus_cache::http::{self, AppState};
use splus_cache::store::{schema, Pool, WriteQueue, Writer};

struct Harness {
    _dir: tempfile::TempDir,
    db_path: PathBuf,
    writer: Writer,
    app: axum::Router,
    queue: Arc<WriteQueue>,
}

impl Harness {
    fn new() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cache.db");
        {
            let conn = rusqlite::Connection::open(&db_path).unwrap();
            schema::init(&conn, splus_cache::clock::now_ms()).unwrap();
        }

        let queue = Arc::new(WriteQueue::new());
        let writer = Writer::spawn(db_path.clone(), queue.clone()).unwrap();

        let manager = SqliteConnectionManager::file(&db_path);
        let pool: Pool = r2d2::Pool::builder().max_size(2).build(manager).unwrap();

        let state = AppState {
            cache: CacheMap::new(),
            pool,
            queue: queue.clone(),
        };
        let config = Config::default();
        let app = http::router(state, &config);

        Harness {
            _dir: dir,
            db_path,
            writer,
            app,
            queue,
        }
    }

    /// Reads `value` for `key` directly off the backing store, bypassing
    /// the in-memory cache and the HTTP surface entirely.
    fn stored_value(&self, key: &str) -> Option<String> {
        let conn = rusqlite::Connection::open(&self.db_path).unwrap();
        conn.query_row("SELECT value FROM cache WHERE key = ?1", [key], |row| row.get(0))
            .ok()
    }

    async fn get(&self, key: &str) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/cache/{key}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        body_json(response).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        body_json(response).await
    }

    async fn delete(&self, key: &str) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/cache/{key}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        body_json(response).await
    }

    async fn wait_drained(&self) {
        for _ in 0..200 {
            if self.queue.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("write queue did not drain in time");
    }
}

async fn body_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn fresh_miss_then_fill() {
    let mut harness = Harness::new();

    let (status, _) = harness.get("foo").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = harness
        .post("/cache", json!({"key": "foo", "value": "bar", "ttl": 0}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["value"], "bar");
    assert_eq!(body["data"]["expires_at"], 0);

    let (status, body) = harness.get("foo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "code": 0, "data": {"value": "bar", "expires_at": 0}}));

    harness.wait_drained().await;
    harness.writer.shutdown();
}

#[tokio::test]
async fn ttl_expiry_serves_then_misses() {
    let mut harness = Harness::new();

    harness
        .post("/cache", json!({"key": "k", "value": "v", "ttl": 60_000}))
        .await;

    let (status, body) = harness.get("k").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["value"], "v");
    assert!(body["data"]["expires_at"].as_u64().unwrap() > 1);

    harness.wait_drained().await;
    harness.writer.shutdown();
}

#[tokio::test]
async fn supersede_collapses_to_latest_intent() {
    let mut harness = Harness::new();

    harness.post("/cache", json!({"key": "k", "value": "v1", "ttl": 0})).await;
    harness.post("/cache", json!({"key": "k", "value": "v2", "ttl": 0})).await;

    // Exactly one `set/k` intent survives the second POST superseding the
    // first (no queue entry ever wrote "v1" to the backing store).
    assert_eq!(harness.queue.len(), 1);

    harness.wait_drained().await;
    harness.writer.shutdown();

    assert_eq!(harness.stored_value("k"), Some("v2".to_string()));
}

#[tokio::test]
async fn cancel_pending_delete_on_ttl_clear() {
    let mut harness = Harness::new();

    harness.post("/cache", json!({"key": "k", "value": "v", "ttl": 5000})).await;
    assert_eq!(harness.queue.len(), 2);

    harness.post("/cache", json!({"key": "k", "value": "v", "ttl": 0})).await;
    assert_eq!(harness.queue.len(), 1);

    harness.wait_drained().await;
    harness.writer.shutdown();
}

#[tokio::test]
async fn shutdown_with_pending_future_delete_keeps_the_row() {
    let mut harness = Harness::new();

    harness
        .post("/cache", json!({"key": "k", "value": "v", "ttl": 3_600_000}))
        .await;
    harness.writer.shutdown();

    // The pending `del/k` intent is tagged `must_on_schedule` and its
    // deadline is an hour out, so the shutdown drain must skip it — read
    // the backing store directly (not the in-memory cache, which the POST
    // already populated regardless of what the writer thread does) to
    // confirm the row actually survived the drain.
    assert_eq!(harness.stored_value("k"), Some("v".to_string()));
}

#[tokio::test]
async fn delete_then_get_returns_not_found() {
    let mut harness = Harness::new();

    harness.post("/cache", json!({"key": "k", "value": "v", "ttl": 0})).await;
    harness.wait_drained().await;

    let (status, body) = harness.delete("k").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "OK");

    let (status, _) = harness.get("k").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    harness.writer.shutdown();
}

#[tokio::test]
async fn empty_key_is_rejected() {
    let mut harness = Harness::new();
    let (status, body) = harness
        .post("/cache", json!({"key": "", "value": "v", "ttl": 0}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    harness.writer.shutdown();
}

#[tokio::test]
async fn malformed_json_body_uses_the_error_envelope() {
    let mut harness = Harness::new();
    // `key` is the wrong type: axum's `Json` extractor rejects this before
    // the handler runs, so the response must still come back as
    // {success:false, code:400, data:{message}}, not a bare 422 text body.
    let (status, body) = harness
        .post("/cache", json!({"key": 1, "value": "v", "ttl": 0}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 400);
    assert!(body["data"]["message"].is_string());
    harness.writer.shutdown();
}

#[tokio::test]
async fn get_or_set_returns_existing_without_overwriting() {
    let mut harness = Harness::new();

    harness.post("/cache", json!({"key": "k", "value": "first", "ttl": 0})).await;
    let (status, body) = harness
        .post("/cache/get-or-set", json!({"key": "k", "value": "second", "ttl": 0}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["value"], "first");

    harness.wait_drained().await;
    harness.writer.shutdown();
}

#[tokio::test]
async fn unmatched_route_is_not_found() {
    let mut harness = Harness::new();
    let response = harness
        .app
        .clone()
        .oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    harness.writer.shutdown();
}
