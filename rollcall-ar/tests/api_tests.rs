//! HTTP API tests against the full router with a scripted recognition fake

mod support;

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use rollcall_ar::config::{EngineConfig, FaceApiConfig, ServiceConfig};
use rollcall_ar::{build_router, AppState};
use support::{seed_class, seed_gallery_face, seed_student, test_pool, FakeFace, FakeRecognition};

fn test_config() -> ServiceConfig {
    ServiceConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: PathBuf::from(":memory:"),
        face_api: FaceApiConfig {
            endpoint: "http://localhost:9".to_string(),
            api_key: "test-key".to_string(),
            collection_id: "test-gallery".to_string(),
        },
        engine: EngineConfig::default(),
    }
}

fn test_app(pool: SqlitePool, fake: Arc<FakeRecognition>) -> axum::Router {
    build_router(AppState::new(pool, test_config(), fake))
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (_dir, pool) = test_pool().await;
    let app = test_app(pool, Arc::new(FakeRecognition::new()));

    let (status, body) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rollcall-ar");
}

#[tokio::test]
async fn resolve_rejects_empty_photo_batch() {
    let (_dir, pool) = test_pool().await;
    let app = test_app(pool, Arc::new(FakeRecognition::new()));

    let (status, body) = post_json(
        app,
        "/attendance/resolve",
        json!({
            "classId": Uuid::new_v4(),
            "teacherId": Uuid::new_v4(),
            "photos": [],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn resolve_rejects_oversized_photo_batch() {
    let (_dir, pool) = test_pool().await;
    let app = test_app(pool, Arc::new(FakeRecognition::new()));

    let photos: Vec<String> = (0..11).map(|i| BASE64.encode(format!("p{}", i))).collect();
    let (status, body) = post_json(
        app,
        "/attendance/resolve",
        json!({
            "classId": Uuid::new_v4(),
            "teacherId": Uuid::new_v4(),
            "photos": photos,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("10"), "message cites the limit: {}", message);
}

#[tokio::test]
async fn resolve_rejects_invalid_base64() {
    let (_dir, pool) = test_pool().await;
    let app = test_app(pool, Arc::new(FakeRecognition::new()));

    let (status, _) = post_json(
        app,
        "/attendance/resolve",
        json!({
            "classId": Uuid::new_v4(),
            "teacherId": Uuid::new_v4(),
            "photos": ["not base64!!"],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resolve_unknown_class_is_not_found() {
    let (_dir, pool) = test_pool().await;
    let app = test_app(pool, Arc::new(FakeRecognition::new()));

    let (status, body) = post_json(
        app,
        "/attendance/resolve",
        json!({
            "classId": Uuid::new_v4(),
            "teacherId": Uuid::new_v4(),
            "photos": [BASE64.encode(b"photo-1")],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn resolve_persists_an_auditable_session() {
    let (_dir, pool) = test_pool().await;
    let class_id = Uuid::new_v4();
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    seed_class(&pool, class_id, "4B").await;
    seed_student(&pool, class_id, a, "Ada").await;
    seed_student(&pool, class_id, b, "Ben").await;
    seed_gallery_face(&pool, "g-ada", a).await;

    let fake = Arc::new(FakeRecognition::new());
    fake.script_photo(
        b"photo-1",
        vec![FakeFace::new("tmp-p1-f1", &[("g-ada", 97.5)])],
    );

    let app = test_app(pool.clone(), fake.clone());
    let (status, body) = post_json(
        app.clone(),
        "/attendance/resolve",
        json!({
            "classId": class_id,
            "teacherId": Uuid::new_v4(),
            "photos": [BASE64.encode(b"photo-1")],
            "diagnostics": true,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expectedCount"], 2);
    assert_eq!(body["presentCount"], 1);
    assert_eq!(body["absentCount"], 1);
    assert_eq!(body["totalFacesDetected"], 1);
    assert_eq!(body["decisions"].as_array().unwrap().len(), 2);
    assert!(body["trace"].is_array());
    assert!(fake.registered_faces().is_empty());

    // One record per roster student was written
    let record_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance_records WHERE session_id = ?",
    )
    .bind(body["sessionId"].as_str().unwrap())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(record_count, 2);

    // The persisted session is served back for audit
    let session_id = body["sessionId"].as_str().unwrap();
    let (status, audit) = get_json(app, &format!("/attendance/sessions/{}", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(audit["session"]["presentCount"], 1);
    assert_eq!(audit["session"]["state"], "COMPLETED");
    assert_eq!(audit["decisions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn trace_is_omitted_without_diagnostics() {
    let (_dir, pool) = test_pool().await;
    let class_id = Uuid::new_v4();
    let a = Uuid::new_v4();

    seed_class(&pool, class_id, "4B").await;
    seed_student(&pool, class_id, a, "Ada").await;
    seed_gallery_face(&pool, "g-ada", a).await;

    let fake = Arc::new(FakeRecognition::new());
    fake.script_photo(
        b"photo-1",
        vec![FakeFace::new("tmp-p1-f1", &[("g-ada", 97.5)])],
    );

    let app = test_app(pool, fake);
    let (status, body) = post_json(
        app,
        "/attendance/resolve",
        json!({
            "classId": class_id,
            "teacherId": Uuid::new_v4(),
            "photos": [BASE64.encode(b"photo-1")],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("trace").is_none());
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (_dir, pool) = test_pool().await;
    let app = test_app(pool, Arc::new(FakeRecognition::new()));

    let (status, _) = get_json(
        app,
        &format!("/attendance/sessions/{}", Uuid::new_v4()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
