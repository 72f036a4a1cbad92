mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{TestApp, SECRET};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use clinic_api::app::{build_router, RouterOptions, Services, Stores};
use clinic_api::auth::{AccessPolicy, JwtVerifier};
use clinic_api::config::SiblingConfig;
use clinic_api::database::Repository;
use clinic_api::middleware::SecurityContext;
use clinic_api::siblings::{AssociationChecks, HttpSiblings, PractitionerLookup, SiblingError};
use clinic_api::types::{Scope, ServiceKind};

async fn serve(router: Router) -> String {
    let port = portpicker::pick_unused_port().expect("free port");
    let listener = TcpListener::bind(("127.0.0.1", port)).await.expect("bind");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://127.0.0.1:{}/", port)
}

fn siblings_at(base: &str, timeout_ms: u64) -> HttpSiblings {
    let config = SiblingConfig {
        practitioner_url: base.to_string(),
        facility_url: base.to_string(),
        individual_url: base.to_string(),
        timeout_ms,
    };
    HttpSiblings::new(&config, JwtVerifier::new(SECRET, 1).unwrap()).unwrap()
}

#[tokio::test]
async fn internal_endpoints_answer_over_http() {
    let app = TestApp::new();
    let scenario = app.linked_scenario().await;
    let base = serve(app.router.clone()).await;
    let siblings = siblings_at(&base, 2_000);

    assert!(siblings
        .check_association(scenario.practitioner_id, scenario.facility_id)
        .await
        .unwrap());
    assert!(!siblings
        .check_association(scenario.practitioner_id, scenario.facility_id + 1)
        .await
        .unwrap());

    assert!(siblings.check_individual_exists(scenario.individual_id).await.unwrap());
    assert!(!siblings.check_individual_exists(scenario.individual_id + 1).await.unwrap());

    let summary = siblings.get_practitioner(scenario.practitioner_id).await.unwrap().unwrap();
    assert_eq!(summary.id, scenario.practitioner_id);
    assert_eq!(summary.first_name, "Test");
    assert!(siblings.get_practitioner(scenario.practitioner_id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn examination_service_checks_through_siblings() {
    let siblings_app = TestApp::new();
    let scenario = siblings_app.linked_scenario().await;
    let base = serve(siblings_app.router.clone()).await;

    let verifier = JwtVerifier::new(SECRET, 1).unwrap();
    let remote = Arc::new(siblings_at(&base, 2_000));
    let stores = Stores::memory();
    let services = Services::assemble(&stores, &[ServiceKind::Examination], remote.clone(), remote);
    let router = build_router(
        &services,
        SecurityContext::new(verifier, AccessPolicy::default()),
        &RouterOptions::default(),
    );

    let exam_app = TestApp {
        router,
        ..TestApp::new()
    };

    let (status, body) = exam_app
        .post("/api/examinations", &scenario.practitioner_token, scenario.examination_body())
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let mut unlinked = scenario.examination_body();
    unlinked["facility_id"] = serde_json::json!(scenario.facility_id + 1);
    let (status, _) = exam_app
        .post("/api/examinations", &scenario.practitioner_token, unlinked)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn silent_sibling_times_out() {
    let port = portpicker::pick_unused_port().expect("free port");
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let siblings = siblings_at(&format!("http://127.0.0.1:{}", port), 200);
    let started = std::time::Instant::now();
    let err = siblings.check_individual_exists(1).await.unwrap_err();

    assert!(matches!(err, SiblingError::Timeout(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn unreachable_sibling_fails_the_request() {
    let port = portpicker::pick_unused_port().expect("free port");
    let remote = Arc::new(siblings_at(&format!("http://127.0.0.1:{}", port), 500));

    let stores = Stores::memory();
    let services = Services::assemble(&stores, &[ServiceKind::Examination], remote.clone(), remote);
    let verifier = JwtVerifier::new(SECRET, 1).unwrap();
    let router = build_router(
        &services,
        SecurityContext::new(verifier, AccessPolicy::default()),
        &RouterOptions::default(),
    );
    let app = TestApp {
        router,
        ..TestApp::new()
    };

    let token = app.practitioner_token("doc-1");
    let (status, body) = app
        .post(
            "/api/examinations",
            &token,
            serde_json::json!({ "practitioner_id": 1, "facility_id": 10, "individual_id": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "A dependent service call failed");
    assert!(stores.examinations.examinations.list(Scope::Any).await.unwrap().is_empty());
}

#[tokio::test]
async fn sibling_without_the_internal_route_is_not_absence() {
    // A process that mounts only examinations has no /internal/associations
    let stores = Stores::memory();
    let local = Arc::new(stores.local_siblings());
    let services = Services::assemble(&stores, &[ServiceKind::Examination], local.clone(), local);
    let router = build_router(
        &services,
        SecurityContext::new(JwtVerifier::new(SECRET, 1).unwrap(), AccessPolicy::default()),
        &RouterOptions::default(),
    );
    let base = serve(router).await;
    let siblings = siblings_at(&base, 2_000);

    let err = siblings.check_association(1, 10).await.unwrap_err();
    assert!(matches!(err, SiblingError::Status { status: 404, .. }), "{err:?}");

    let err = siblings.check_individual_exists(100).await.unwrap_err();
    assert!(matches!(err, SiblingError::Status { status: 404, .. }), "{err:?}");

    // Practitioner lookups still read 404 as absent
    assert!(siblings.get_practitioner(1).await.unwrap().is_none());
}
