use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::database::models::Practitioner;
use crate::error::ApiError;
use crate::middleware::{resolve_identity_middleware, ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::services::practitioner_service::{PractitionerPatch, PractitionerUpdate};
use crate::services::{IdentityResolver, PractitionerService, ResolvedIdentity};
use crate::siblings::PractitionerSummary;

type Me = ResolvedIdentity<Practitioner>;

pub fn routes(service: Arc<PractitionerService>) -> Router {
    let resolver = Arc::new(IdentityResolver::<Practitioner>::new(service.repository()));

    Router::new()
        .route("/api/practitioners/me", get(me).put(replace_me).patch(patch_me).delete(delete_me))
        .route("/api/practitioners", get(list))
        .route("/api/practitioners/:id", get(show))
        .route_layer(from_fn_with_state(resolver, resolve_identity_middleware::<Practitioner>))
        .with_state(service)
}

pub fn internal_routes(service: Arc<PractitionerService>) -> Router {
    Router::new()
        .route("/internal/practitioners/:id", get(internal_show))
        .with_state(service)
}

/// GET /api/practitioners/me
async fn me(State(service): State<Arc<PractitionerService>>, me: Me) -> ApiResult<Practitioner> {
    Ok(ApiResponse::success(service.get(me.id).await?))
}

/// PUT /api/practitioners/me
async fn replace_me(
    State(service): State<Arc<PractitionerService>>,
    me: Me,
    ApiJson(update): ApiJson<PractitionerUpdate>,
) -> ApiResult<Practitioner> {
    Ok(ApiResponse::success(service.replace(me.id, update).await?))
}

/// PATCH /api/practitioners/me
async fn patch_me(
    State(service): State<Arc<PractitionerService>>,
    me: Me,
    ApiJson(patch): ApiJson<PractitionerPatch>,
) -> ApiResult<Practitioner> {
    Ok(ApiResponse::success(service.patch(me.id, patch).await?))
}

/// DELETE /api/practitioners/me
async fn delete_me(State(service): State<Arc<PractitionerService>>, me: Me) -> ApiResult<()> {
    service.delete(me.id).await?;
    Ok(ApiResponse::no_content())
}

async fn list(State(service): State<Arc<PractitionerService>>) -> ApiResult<Vec<Practitioner>> {
    Ok(ApiResponse::success(service.list().await?))
}

async fn show(
    State(service): State<Arc<PractitionerService>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Practitioner> {
    Ok(ApiResponse::success(service.get(id).await?))
}

/// GET /internal/practitioners/:id, 404 when not active
async fn internal_show(
    State(service): State<Arc<PractitionerService>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<PractitionerSummary> {
    let summary = service
        .summary(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No active doctor found with Doctor Id: {}", id)))?;
    Ok(ApiResponse::success(summary))
}
