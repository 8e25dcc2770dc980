//! Single-node regression tests.
//!
//! Drives the full route table of one node over an in-memory KV and fake
//! runtime: the storage lifecycle, container lifecycle, and pod CRUD,
//! including the error statuses clients see.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use tower::ServiceExt;

use berth_api::{build_router, AppState};
use berth_cluster::PeerClient;
use berth_runtime::{FakeRuntime, ResourceSnapshot, StaticProbe};
use berth_state::{KvStore, Store};
use berth_storage::StorageService;

fn test_node(dir: &std::path::Path) -> (AppState, FakeRuntime) {
    let store = Store::new(KvStore::open_in_memory());
    let runtime = FakeRuntime::new();
    let probe = Arc::new(StaticProbe::new(ResourceSnapshot {
        disk: 1 << 30,
        memory: 1 << 30,
        cores: 4,
    }));
    let peers = PeerClient::new().unwrap();
    let storage = StorageService::new(dir, store.clone(), peers.clone(), probe.clone(), "h1", 8888);
    let state = AppState {
        store,
        runtime: Arc::new(runtime.clone()),
        probe,
        peers,
        storage,
        local_host: "h1".to_string(),
        listen_port: 8888,
    };
    (state, runtime)
}

async fn body_bytes(resp: axum::response::Response) -> Bytes {
    axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn storage_lifecycle_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_node(dir.path());
    let router = build_router(state);

    // Upload 13 bytes.
    let req = Request::builder()
        .method("POST")
        .uri("/storage_upload/a.txt")
        .header("content-type", "application/octet-stream")
        .body(Body::from("hello, world!"))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Listed with the local owner.
    let resp = router.clone().oneshot(get("/storage_list")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let records: serde_json::Value =
        serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(records[0]["name"], "a.txt");
    assert_eq!(records[0]["host"], "h1");
    assert_eq!(records[0]["size"], 13);
    assert_eq!(records[0]["replicas"], 1);

    // Download returns the same bytes.
    let resp = router
        .clone()
        .oneshot(get("/storage_download/a.txt"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, Bytes::from_static(b"hello, world!"));

    // Size as decimal text.
    let resp = router
        .clone()
        .oneshot(get("/storage_file_size/a.txt"))
        .await
        .unwrap();
    assert_eq!(body_bytes(resp).await, Bytes::from_static(b"13"));

    // Remove, then the list is empty and a second remove is 404.
    let resp = router
        .clone()
        .oneshot(get("/storage_remove/a.txt"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, Bytes::from_static(b"OK"));

    let resp = router.clone().oneshot(get("/storage_list")).await.unwrap();
    let records: serde_json::Value =
        serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 0);

    let resp = router
        .oneshot(get("/storage_remove/a.txt"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_upload_is_conflict_with_text_body() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_node(dir.path());
    let router = build_router(state);

    let req = post("/storage_upload/a.txt", "one");
    assert_eq!(
        router.clone().oneshot(req).await.unwrap().status(),
        StatusCode::OK
    );

    let resp = router
        .oneshot(post("/storage_upload/a.txt", "two"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(body.contains("a.txt"));
}

#[tokio::test]
async fn container_lifecycle_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (state, runtime) = test_node(dir.path());
    let router = build_router(state);

    // Run returns the runtime id as text.
    let resp = router
        .clone()
        .oneshot(post(
            "/container_run",
            r#"{"image":"nginx","name":"web-0"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let id = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(runtime.is_running(&id));

    // The local listing reports the id.
    let resp = router.clone().oneshot(get("/container_list")).await.unwrap();
    let ids: Vec<String> = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(ids, vec![id.clone()]);

    // The cluster listing reports the record.
    let resp = router
        .clone()
        .oneshot(get("/container_list_all"))
        .await
        .unwrap();
    let records: serde_json::Value =
        serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(records[0]["name"], "web-0");
    assert_eq!(records[0]["host"], "h1");

    // Stop, then remove.
    let resp = router
        .clone()
        .oneshot(post("/container_stop", r#"{"name":"web-0"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!runtime.is_running(&id));

    let resp = router
        .clone()
        .oneshot(post("/container_remove", r#"{"name":"web-0"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .oneshot(post("/container_stop", r#"{"name":"web-0"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pod_crud_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_node(dir.path());
    let router = build_router(state);

    // Invalid: zero replicas.
    let resp = router
        .clone()
        .oneshot(post(
            "/pod_add",
            r#"{"name":"web","image":"nginx","count":0}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = router
        .clone()
        .oneshot(post(
            "/pod_add",
            r#"{"name":"web","image":"nginx","count":3,"cores":1,"memory":1024,"disk":1024}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router.clone().oneshot(get("/pod_list")).await.unwrap();
    let pods: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(pods[0]["name"], "web");
    assert_eq!(pods[0]["count"], 3);

    // Remove answers with the pod name.
    let resp = router
        .clone()
        .oneshot(post("/pod_remove", r#"{"name":"web"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, Bytes::from_static(b"web"));

    let resp = router.oneshot(get("/pod_list")).await.unwrap();
    let pods: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(pods.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn host_info_and_empty_host_list() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_node(dir.path());
    let router = build_router(state);

    let resp = router.clone().oneshot(get("/host_info")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let info: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(info["name"], "h1");
    assert_eq!(info["cores"], 4);

    let resp = router.oneshot(get("/host_list")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn dashboard_renders() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_node(dir.path());
    let router = build_router(state);

    let resp = router.oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(body.contains("<html"));
    assert!(body.contains("berth"));
}

#[tokio::test]
async fn malformed_json_is_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _) = test_node(dir.path());
    let router = build_router(state);

    let resp = router
        .oneshot(post("/pod_add", "{not json"))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}
