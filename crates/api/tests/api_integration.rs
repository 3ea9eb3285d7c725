//! API integration tests.
//!
//! These run the router against an in-memory `SQLite` collection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use futures::StreamExt;
use reportline_api::{router as api_router, AppState};
use reportline_core::{DbReportStore, HttpReportStore, Report, ReportStore};
use reportline_db::repositories::ReportRepository;
use reportline_db::test_utils::memory_db;
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn create_test_store() -> DbReportStore {
    let db = Arc::new(memory_db().await.unwrap());
    DbReportStore::new(ReportRepository::new(db), "reportes")
}

fn create_test_app(store: DbReportStore) -> Router {
    api_router("reportes").with_state(AppState::new(store))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(body: &str) -> Request<Body> {
    Request::builder()
        .uri("/reportes.json")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_empty_collection_is_null() {
    let app = create_test_app(create_test_store().await);

    let response = app.oneshot(get("/reportes.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_push_then_list() {
    let store = create_test_store().await;
    let app = create_test_app(store.clone());

    let response = app
        .clone()
        .oneshot(post(
            r#"{"type":"Physical","description":"d","location":"l","nickname":"anonymous","timestamp":100}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let name = body_json(response).await["name"].as_str().unwrap().to_string();

    let response = app.oneshot(get("/reportes.json")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body[&name]["type"], "Physical");
    assert_eq!(body[&name]["timestamp"], 100);
    assert!(body[&name].get("id").is_none());
}

#[tokio::test]
async fn test_list_serves_stored_gaps() {
    let store = create_test_store().await;
    let name = store
        .append_record(&json!({ "type": "Verbal", "description": "d", "location": "l" }))
        .await
        .unwrap();
    let app = create_test_app(store);

    let first = body_json(app.clone().oneshot(get("/reportes.json")).await.unwrap()).await;
    assert_eq!(first[&name], json!({ "type": "Verbal", "description": "d", "location": "l" }));

    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = body_json(app.oneshot(get("/reportes.json")).await.unwrap()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = create_test_app(create_test_store().await);

    let response = app.oneshot(get("/elsewhere.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_push_rejects_non_object() {
    let app = create_test_app(create_test_store().await);

    let response = app.clone().oneshot(post("[1,2]")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");

    let response = app.oneshot(post("not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stream_sends_snapshot_first() {
    let store = create_test_store().await;
    store
        .append(Report::candidate("Verbal", "d", "l", None))
        .await
        .unwrap();
    let app = create_test_app(store.clone());

    let response = app.oneshot(get("/reportes/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.starts_with("event: put\n"));
    assert!(text.contains("\"path\":\"/\""));
    assert!(text.contains("Verbal"));
    assert_eq!(store.active_listeners(), 1);

    drop(body);
    assert_eq!(store.active_listeners(), 0);
}

#[tokio::test]
async fn test_stream_read_failure_cancels() {
    let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
    let store = DbReportStore::new(ReportRepository::new(db), "reportes");
    let app = create_test_app(store.clone());

    let response = app.oneshot(get("/reportes/stream")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.starts_with("event: cancel\n"));
    assert!(text.contains("Fetch error"));

    let end = tokio::time::timeout(Duration::from_secs(2), body.next())
        .await
        .unwrap();
    assert!(end.is_none());

    drop(body);
    assert_eq!(store.active_listeners(), 0);
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_http_subscription_settles_on_defaulted_record() {
    let store = create_test_store().await;
    store
        .append_record(&json!({ "type": "Verbal", "description": "d", "location": "l" }))
        .await
        .unwrap();
    let base = serve(create_test_app(store)).await;

    let remote = HttpReportStore::new(&base, "reportes")
        .unwrap()
        .with_poll_interval(Duration::from_millis(20));
    let mut subscription = remote.subscribe();

    let first = subscription.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].nickname, "anonymous");

    let again = tokio::time::timeout(Duration::from_millis(300), subscription.next()).await;
    assert!(again.is_err(), "unchanged collection emitted again");
}

#[tokio::test]
async fn test_http_store_against_server() {
    let base = serve(create_test_app(create_test_store().await)).await;

    let remote = HttpReportStore::new(&base, "reportes")
        .unwrap()
        .with_poll_interval(Duration::from_millis(50));
    assert!(remote.fetch_once().await.unwrap().is_empty());

    let mut subscription = remote.subscribe();
    let first = subscription.next().await.unwrap().unwrap();
    assert!(first.is_empty());

    let mut older = Report::candidate("Physical", "old", "l", None);
    older.timestamp = 100;
    let mut newer = Report::candidate("Physical", "new", "l", None);
    newer.timestamp = 200;
    let id = remote.append(older).await.unwrap();
    remote.append(newer).await.unwrap();

    let reports = remote.fetch_once().await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].description, "new");
    assert_eq!(reports[1].id.as_deref(), Some(id.as_str()));

    let latest = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = subscription.next().await.unwrap().unwrap();
            if snapshot.len() == 2 {
                break snapshot;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(latest[0].timestamp, 200);

    subscription.unsubscribe();
    assert_eq!(remote.active_listeners(), 0);
}
