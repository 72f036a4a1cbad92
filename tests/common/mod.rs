#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use clinic_api::app::{build_router, RouterOptions, Services, Stores};
use clinic_api::auth::{AccessPolicy, IdentityClaims, JwtVerifier, ROLE_FACILITY, ROLE_PRACTITIONER};
use clinic_api::database::models::{Examination, Practitioner};
use clinic_api::database::MemoryRepository;
use clinic_api::middleware::SecurityContext;
use clinic_api::services::ExaminationStores;

pub const SECRET: &str = "integration-test-secret";

/// Every service mounted in-process over memory stores
pub struct TestApp {
    pub router: Router,
    pub stores: Stores,
    pub verifier: JwtVerifier,
    pub practitioners: Arc<MemoryRepository<Practitioner>>,
    pub examinations: Arc<MemoryRepository<Examination>>,
}

impl TestApp {
    pub fn new() -> Self {
        let practitioners = Arc::new(MemoryRepository::<Practitioner>::new());
        let examinations = Arc::new(MemoryRepository::<Examination>::new());

        let base = Stores::memory();
        let stores = Stores {
            practitioners: practitioners.clone(),
            examinations: ExaminationStores {
                examinations: examinations.clone(),
                ..base.examinations.clone()
            },
            ..base
        };

        let verifier = JwtVerifier::new(SECRET, 1).expect("verifier");
        let services = Services::all_local(&stores);
        let security = SecurityContext::new(verifier.clone(), AccessPolicy::default());
        let router = build_router(&services, security, &RouterOptions::default());

        Self {
            router,
            stores,
            verifier,
            practitioners,
            examinations,
        }
    }

    pub fn token(&self, sub: &str, roles: &[&str]) -> String {
        let mut identity = IdentityClaims::new(sub, roles);
        identity.given_name = "Test".to_string();
        identity.family_name = sub.to_string();
        identity.email = format!("{}@example.com", sub);
        self.verifier.issue(&identity).expect("token")
    }

    pub fn practitioner_token(&self, sub: &str) -> String {
        self.token(sub, &[ROLE_PRACTITIONER])
    }

    pub fn facility_token(&self, sub: &str) -> String {
        self.token(sub, &[ROLE_FACILITY])
    }

    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    /// Resolves (provisioning on first call) the id behind a practitioner token
    pub async fn practitioner_id(&self, token: &str) -> i64 {
        let (status, body) = self.get("/api/practitioners/me", token).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().expect("practitioner id")
    }

    pub async fn facility_id(&self, token: &str) -> i64 {
        let (status, body) = self.get("/api/facilities/me", token).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_i64().expect("facility id")
    }

    pub async fn create_individual(&self, token: &str, national_id: &str) -> i64 {
        let (status, body) = self.post("/api/individuals", token, individual_body(national_id)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().expect("individual id")
    }

    /// Practitioner linked to a facility, plus one patient
    pub async fn linked_scenario(&self) -> Scenario {
        let practitioner_token = self.practitioner_token("doc-1");
        let facility_token = self.facility_token("hosp-10");

        let practitioner_id = self.practitioner_id(&practitioner_token).await;
        let facility_id = self.facility_id(&facility_token).await;

        let (status, body) = self
            .post(
                &format!("/api/facilities/me/practitioners/{}", practitioner_id),
                &facility_token,
                json!({}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let individual_id = self.create_individual(&practitioner_token, "19900101").await;

        Scenario {
            practitioner_token,
            facility_token,
            practitioner_id,
            facility_id,
            individual_id,
        }
    }
}

pub struct Scenario {
    pub practitioner_token: String,
    pub facility_token: String,
    pub practitioner_id: i64,
    pub facility_id: i64,
    pub individual_id: i64,
}

impl Scenario {
    pub fn examination_body(&self) -> Value {
        json!({
            "practitioner_id": self.practitioner_id,
            "facility_id": self.facility_id,
            "individual_id": self.individual_id,
        })
    }
}

pub fn individual_body(national_id: &str) -> Value {
    json!({
        "national_id": national_id,
        "first_name": "Grace",
        "last_name": "Hopper",
        "birth_date": "1986-12-09",
        "gender": "female",
        "email": "",
        "phone_number": "",
        "address": "",
    })
}

pub fn assert_error_body(body: &Value, status: u16) {
    assert_eq!(body["status"], status, "{body}");
    assert!(body["message"].is_string(), "{body}");
    assert!(body["timestamp"].is_string(), "{body}");
}
