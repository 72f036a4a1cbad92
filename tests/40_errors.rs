mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{individual_body, TestApp};
use serde_json::json;

#[tokio::test]
async fn path_type_mismatch_is_a_bad_request() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");

    let (status, body) = app.get("/api/examinations/not-a-uuid", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    common::assert_error_body(&body, 400);

    let (status, _) = app.get("/api/individuals/abc", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/individuals")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from("{\"national_id\": "))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    common::assert_error_body(&body, 400);
}

#[tokio::test]
async fn validation_errors_name_every_field() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");

    let mut body = individual_body("12a");
    body["first_name"] = json!(" ");
    body["email"] = json!("nope");

    let (status, body) = app.post("/api/individuals", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let message = body["message"].as_str().unwrap();
    assert!(message.contains("national_id"), "{message}");
    assert!(message.contains("first_name"), "{message}");
    assert!(message.contains("email"), "{message}");
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");

    let (status, body) = app
        .post(
            "/api/individuals",
            &token,
            json!({ "national_id": "123", "birth_date": "1990-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "first_name: must not be blank, last_name: must not be blank");

    let (status, body) = app
        .request(Method::PUT, "/api/practitioners/me", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("first_name: must not be blank, last_name: must not be blank, email:"), "{message}");
}

#[tokio::test]
async fn duplicate_national_id_is_a_conflict() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");
    app.create_individual(&token, "555").await;

    let (status, body) = app.post("/api/individuals", &token, individual_body("555")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    common::assert_error_body(&body, 409);
}

#[tokio::test]
async fn national_id_is_free_again_after_deletion() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");
    let id = app.create_individual(&token, "555").await;

    let (status, _) = app.delete(&format!("/api/individuals/{}", id), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let replacement = app.create_individual(&token, "555").await;
    assert_ne!(replacement, id);
}

#[tokio::test]
async fn deleting_twice_is_not_found() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");
    let id = app.create_individual(&token, "777").await;
    let path = format!("/api/individuals/{}", id);

    let (status, _) = app.delete(&path, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.delete(&path, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("No active patient found with Patient Id: {}", id));

    let (status, _) = app.get(&path, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn individuals_are_searchable_by_national_id() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");
    let id = app.create_individual(&token, "111").await;
    app.create_individual(&token, "222").await;

    let (status, body) = app.get("/api/individuals?national_id=111", &token).await;
    assert_eq!(status, StatusCode::OK);
    let found = body["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], id);

    let (_, body) = app.get("/api/individuals", &token).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let app = TestApp::new();
    let token = app.practitioner_token("doc-1");

    let mut body = individual_body("999");
    body["address"] = json!("x".repeat(3 * 1024 * 1024));

    let (status, _) = app.post("/api/individuals", &token, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
