use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sift_core::compress::compress_token;
use sift_core::store::{IndexStore, DOC_COUNT_KEY};
use sift_core::Posting;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(path: &Path) {
    let mut store = IndexStore::open(path).unwrap();
    let batch = store.rebuild().unwrap();
    let d0 = batch.insert_document("https://rust-lang.org/learn", 4).unwrap();
    let d1 = batch.insert_document("https://example.com/rust", 4).unwrap();
    let d2 = batch.insert_document("https://example.com/python", 4).unwrap();
    let posting = |token: &str, doc_id, tf| Posting { token: compress_token(token).unwrap(), doc_id, frequency: 1, tf, idf: 1.0 };
    // doc0 has the higher rust weight
    batch
        .insert_postings(&[
            posting("rust", d0, 0.8),
            posting("rust", d1, 0.6),
            posting("python", d2, 0.5),
            posting("crab", d1, 0.25),
        ])
        .unwrap();
    batch.set_metadata(DOC_COUNT_KEY, "3").unwrap();
    batch.commit().unwrap();
}

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn app() -> (tempfile::TempDir, Router) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.db");
    build_tiny_index(&path);
    let app = sift_server::build_app(path).unwrap();
    (dir, app)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (_dir, app) = app();
    let (status, json) = call(app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["url"], "https://rust-lang.org/learn");
    assert_eq!(arr[1]["url"], "https://example.com/rust");
    assert_eq!(arr[0]["highlighted_url"], "https://<mark>rust</mark>-lang.org/learn");
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn boolean_operators_reach_the_engine() {
    let (_dir, app) = app();
    let (_, json) = call(app.clone(), "/search?q=rust%20not%20crab").await;
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["url"], "https://rust-lang.org/learn");

    let (_, json) = call(app, "/search?q=rust%20or%20python&k=1").await;
    assert_eq!(json["total_hits"], 3);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    // operator words are not highlighted, even inside ".org"
    assert_eq!(arr[0]["highlighted_url"], "https://<mark>rust</mark>-lang.org/learn");
}

#[tokio::test]
async fn empty_query_is_not_an_error() {
    let (_dir, app) = app();
    let (status, json) = call(app, "/search?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_check() {
    let (_dir, app) = app();
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[test]
fn missing_index_fails_at_startup() {
    let dir = tempdir().unwrap();
    assert!(sift_server::build_app(dir.path().join("absent.db")).is_err());
}
