//! Backend CRUD routes driven through `oneshot`.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use leadrelay_core::LeadStore;
use leadrelay_gateway::backend;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Router {
    backend::router(LeadStore::open(Some(dir.path().join("leads"))).unwrap())
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_is_ok() {
    let dir = TempDir::new().unwrap();
    let res = app(&dir)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn create_then_read() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, created) = call(
        &app,
        Method::POST,
        "/api/leads",
        Some(json!({
            "name": "John",
            "source": "website",
            "contact": { "email": "john@example.com", "phone": null },
            "interestedProducts": ["A"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["message"], "Lead created successfully");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, lead) = call(&app, Method::GET, &format!("/api/leads/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lead["id"], id.as_str());
    assert_eq!(lead["name"], "John");
    assert_eq!(lead["status"], "New");
    assert_eq!(lead["interestedProducts"], json!(["A"]));

    let (status, all) = call(&app, Method::GET, "/api/leads", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, body) = call(&app, Method::GET, "/api/leads/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Not found" }));

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/leads/nope",
        Some(json!({ "status": "Contacted" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "error": "Lead not found", "message": "No lead found with ID: nope" })
    );
}

#[tokio::test]
async fn update_merges_fields() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (_, created) = call(
        &app,
        Method::POST,
        "/api/leads",
        Some(json!({ "name": "Jane", "contact": { "email": "jane@example.com" } })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/leads/{}", id);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "status": "Contacted", "contact": { "phone": "555" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Lead updated successfully" }));

    let (_, lead) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(lead["id"], id.as_str());
    assert_eq!(lead["name"], "Jane");
    assert_eq!(lead["status"], "Contacted");
    assert_eq!(lead["contact"], json!({ "email": "jane@example.com", "phone": "555" }));
}

#[tokio::test]
async fn delete_twice() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let body = json!({ "name": "Temp" });
    let (_, created) = call(&app, Method::POST, "/api/leads", Some(body)).await;
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/leads/{}", id);

    let (status, body) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedId"], id.as_str());
    assert_eq!(
        body["message"],
        format!("Lead with ID {} has been deleted successfully", id)
    );

    let (status, body) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Lead not found");
}

#[tokio::test]
async fn wrong_shape_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/leads",
        Some(json!({ "name": "X", "interestedProducts": "not a list" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
