use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::StoreBackend;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::ServiceKind;

#[derive(Clone)]
pub struct PublicState {
    pub mounted: Arc<Vec<ServiceKind>>,
    pub backend: StoreBackend,
}

pub fn routes(state: PublicState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/docs", get(docs))
        .with_state(state)
}

/// Route catalogue of one service
pub fn catalogue(kind: ServiceKind) -> &'static [&'static str] {
    match kind {
        ServiceKind::Practitioner => &[
            "GET /api/practitioners/me",
            "PUT /api/practitioners/me",
            "PATCH /api/practitioners/me",
            "DELETE /api/practitioners/me",
            "GET /api/practitioners",
            "GET /api/practitioners/:id",
            "GET /internal/practitioners/:id",
        ],
        ServiceKind::Facility => &[
            "GET /api/facilities/me",
            "PUT /api/facilities/me",
            "PATCH /api/facilities/me",
            "DELETE /api/facilities/me",
            "GET /api/facilities/me/practitioners",
            "POST /api/facilities/me/practitioners/:practitioner_id",
            "DELETE /api/facilities/me/practitioners/:practitioner_id",
            "GET /api/facilities",
            "GET /api/facilities/:id",
            "GET /internal/associations?practitioner_id=&facility_id=",
        ],
        ServiceKind::Individual => &[
            "POST /api/individuals",
            "GET /api/individuals[?national_id=]",
            "GET /api/individuals/:id",
            "PUT /api/individuals/:id",
            "PATCH /api/individuals/:id",
            "DELETE /api/individuals/:id",
            "GET /internal/individuals/:id/exists",
        ],
        ServiceKind::Examination => &[
            "POST /api/examinations",
            "GET /api/examinations/:id",
            "PUT /api/examinations/:id",
            "PATCH /api/examinations/:id",
            "DELETE /api/examinations/:id",
            "GET /api/examinations/:id/view",
            "POST /api/examinations/:id/series",
            "DELETE /api/examinations/:id/series/:series_id",
            "POST /api/examinations/:id/series/:series_id/assets",
            "DELETE /api/examinations/:id/series/:series_id/assets/:asset_id",
            "POST /api/examinations/:id/attachments",
            "DELETE /api/examinations/:id/attachments/:attachment_id",
            "GET /public/examinations/:passcode (public)",
        ],
    }
}

async fn root(State(state): State<PublicState>) -> ApiResult<Value> {
    let services: Vec<&str> = state.mounted.iter().map(ServiceKind::as_str).collect();
    Ok(ApiResponse::success(json!({
        "name": "Clinic API",
        "version": env!("CARGO_PKG_VERSION"),
        "services": services,
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "docs": "/docs (public)",
            "passcode": "/public/examinations/:passcode (public)",
            "api": "/api/* (bearer token)",
            "internal": "/internal/* (service token)",
        }
    })))
}

async fn docs(State(state): State<PublicState>) -> ApiResult<Value> {
    let mut services = serde_json::Map::new();
    for kind in state.mounted.iter() {
        services.insert(kind.as_str().to_string(), json!(catalogue(*kind)));
    }
    Ok(ApiResponse::success(Value::Object(services)))
}

async fn health(State(state): State<PublicState>) -> Response {
    let now = chrono::Utc::now();

    match &state.backend {
        StoreBackend::Memory => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "memory",
        }))
        .into_response(),
        StoreBackend::Postgres(manager) => match manager.health_check().await {
            Ok(()) => ApiResponse::success(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok",
            }))
            .into_response(),
            Err(e) => {
                tracing::error!("Health check failed: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "success": false,
                        "error": "database unavailable",
                        "data": {
                            "status": "degraded",
                            "timestamp": now,
                        }
                    })),
                )
                    .into_response()
            }
        },
    }
}
