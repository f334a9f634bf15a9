//! FirebaseLog against a local stand-in for the Realtime Database REST API

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use shelfwatch_core::{ImageSource, LogRecord, StockReport, Threshold};
use shelfwatch_storage::{FirebaseLog, StaticToken, StockLog, StorageError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorded {
    writes: Arc<Mutex<Vec<(HashMap<String, String>, Value)>>>,
}

async fn push_handler(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if query.get("access_token").map(String::as_str) != Some("good-token") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Permission denied"})));
    }
    let mut writes = recorded.writes.lock().unwrap();
    writes.push((query, body));
    let key = format!("-Nkey{}", writes.len());
    (StatusCode::OK, Json(json!({ "name": key })))
}

async fn spawn_database() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/stock_logs.json", post(push_handler))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/", addr), recorded)
}

fn record(count: usize) -> LogRecord {
    let report = StockReport::new(count, Threshold::new(4).unwrap());
    LogRecord::from_report(&report, ImageSource::Camera, Some("shelf.jpg".to_string()))
}

#[tokio::test]
async fn test_append_posts_record_under_namespace() {
    let (url, recorded) = spawn_database().await;
    let log = FirebaseLog::new(&url, "stock_logs", Arc::new(StaticToken("good-token".to_string()))).unwrap();

    let key = log.append(&record(2)).await.unwrap();
    assert_eq!(key, "-Nkey1");

    let writes = recorded.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    let (_, body) = &writes[0];
    assert_eq!(body["count"], 2);
    assert_eq!(body["threshold"], 4);
    assert_eq!(body["tier"], "understocked");
    assert_eq!(body["source"], "camera");
    assert_eq!(body["image_name"], "shelf.jpg");
}

#[tokio::test]
async fn test_append_surfaces_rejection() {
    let (url, recorded) = spawn_database().await;
    let log = FirebaseLog::new(&url, "stock_logs", Arc::new(StaticToken("bad-token".to_string()))).unwrap();

    match log.append(&record(9)).await {
        Err(StorageError::Rejected { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("Permission denied"));
        }
        other => panic!("expected rejection, got {:?}", other.map(|_| ())),
    }
    assert!(recorded.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_append_unknown_namespace_is_an_error() {
    let (url, _recorded) = spawn_database().await;
    let log = FirebaseLog::new(&url, "other_logs", Arc::new(StaticToken("good-token".to_string()))).unwrap();
    assert!(log.append(&record(1)).await.is_err());
}
