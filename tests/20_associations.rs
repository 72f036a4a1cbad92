mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn linked_practitioner_can_open_an_examination() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;

    let (status, body) = app
        .post("/api/examinations", &scenario.practitioner_token, scenario.examination_body())
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let passcode = body["data"]["passcode"].as_str().unwrap();
    assert_eq!(passcode.len(), 10);
    assert!(passcode.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(body["data"]["practitioner_id"], scenario.practitioner_id);
    assert_eq!(body["data"]["facility_id"], scenario.facility_id);
    assert_eq!(body["data"]["individual_id"], scenario.individual_id);
}

#[tokio::test]
async fn examination_without_association_is_not_found() {
    let app = TestApp::new();
    let practitioner = app.practitioner_token("doc-1");
    let facility = app.facility_token("hosp-10");
    let practitioner_id = app.practitioner_id(&practitioner).await;
    let facility_id = app.facility_id(&facility).await;
    let individual_id = app.create_individual(&practitioner, "12345").await;

    let (status, body) = app
        .post(
            "/api/examinations",
            &practitioner,
            json!({
                "practitioner_id": practitioner_id,
                "facility_id": facility_id,
                "individual_id": individual_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        format!(
            "No active association found with Doctor Id: {} and Hospital Id: {}",
            practitioner_id, facility_id
        )
    );
    assert!(app.examinations.is_empty().await);
}

#[tokio::test]
async fn examination_for_unknown_patient_is_not_found() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;

    let mut body = scenario.examination_body();
    body["individual_id"] = json!(scenario.individual_id + 1000);

    let (status, body) = app.post("/api/examinations", &scenario.practitioner_token, body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("Patient Id"));
    assert!(app.examinations.is_empty().await);
}

#[tokio::test]
async fn linking_twice_is_a_conflict() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;

    let (status, body) = app
        .post(
            &format!("/api/facilities/me/practitioners/{}", scenario.practitioner_id),
            &scenario.facility_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    common::assert_error_body(&body, 409);
}

#[tokio::test]
async fn linking_an_unknown_practitioner_is_not_found() {
    let app = TestApp::new();
    let facility = app.facility_token("hosp-10");
    app.facility_id(&facility).await;

    let (status, _) = app
        .post("/api/facilities/me/practitioners/4242", &facility, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unlinking_revokes_the_association() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;
    let path = format!("/api/facilities/me/practitioners/{}", scenario.practitioner_id);

    let (status, _) = app.delete(&path, &scenario.facility_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&path, &scenario.facility_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/examinations", &scenario.practitioner_token, scenario.examination_body())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn facility_lists_its_practitioners() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;

    let (status, body) = app.get("/api/facilities/me/practitioners", &scenario.facility_token).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], scenario.practitioner_id);
    assert_eq!(listed[0]["first_name"], "Test");
}

#[tokio::test]
async fn practitioner_reads_a_single_facility() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;

    let (status, body) = app
        .get(&format!("/api/facilities/{}", scenario.facility_id), &scenario.practitioner_token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["id"], scenario.facility_id);
}

#[tokio::test]
async fn reassigning_to_an_unlinked_facility_is_refused() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;
    let other = app.facility_id(&app.facility_token("hosp-11")).await;

    let (_, created) = app
        .post("/api/examinations", &scenario.practitioner_token, scenario.examination_body())
        .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/examinations/{}", id),
            Some(&scenario.practitioner_token),
            Some(json!({ "facility_id": other })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&format!("/api/examinations/{}", id), &scenario.practitioner_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["facility_id"], scenario.facility_id);
}
