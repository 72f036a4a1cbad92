use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::database::models::{Facility, FacilityLink};
use crate::middleware::{resolve_identity_middleware, ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::facility_service::{FacilityPatch, FacilityUpdate};
use crate::services::{FacilityService, IdentityResolver, ResolvedIdentity};
use crate::siblings::{Existence, PractitionerSummary};

type Me = ResolvedIdentity<Facility>;

pub fn routes(service: Arc<FacilityService>) -> Router {
    let resolver = Arc::new(IdentityResolver::<Facility>::new(service.repository()));

    Router::new()
        .route("/api/facilities/me", get(me).put(replace_me).patch(patch_me).delete(delete_me))
        .route("/api/facilities/me/practitioners", get(my_practitioners))
        .route(
            "/api/facilities/me/practitioners/:practitioner_id",
            post(link_practitioner).delete(unlink_practitioner),
        )
        .route("/api/facilities", get(list))
        .route("/api/facilities/:id", get(show))
        .route_layer(from_fn_with_state(resolver, resolve_identity_middleware::<Facility>))
        .with_state(service)
}

pub fn internal_routes(service: Arc<FacilityService>) -> Router {
    Router::new()
        .route("/internal/associations", get(internal_association))
        .with_state(service)
}

async fn me(State(service): State<Arc<FacilityService>>, me: Me) -> ApiResult<Facility> {
    Ok(ApiResponse::success(service.get(me.id).await?))
}

async fn replace_me(
    State(service): State<Arc<FacilityService>>,
    me: Me,
    ApiJson(update): ApiJson<FacilityUpdate>,
) -> ApiResult<Facility> {
    Ok(ApiResponse::success(service.replace(me.id, update).await?))
}

async fn patch_me(
    State(service): State<Arc<FacilityService>>,
    me: Me,
    ApiJson(patch): ApiJson<FacilityPatch>,
) -> ApiResult<Facility> {
    Ok(ApiResponse::success(service.patch(me.id, patch).await?))
}

async fn delete_me(State(service): State<Arc<FacilityService>>, me: Me) -> ApiResult<()> {
    service.delete(me.id).await?;
    Ok(ApiResponse::no_content())
}

/// GET /api/facilities/me/practitioners (best effort)
async fn my_practitioners(State(service): State<Arc<FacilityService>>, me: Me) -> ApiResult<Vec<PractitionerSummary>> {
    Ok(ApiResponse::success(service.practitioners_of(me.id).await?))
}

async fn link_practitioner(
    State(service): State<Arc<FacilityService>>,
    me: Me,
    ApiPath(practitioner_id): ApiPath<i64>,
) -> ApiResult<FacilityLink> {
    Ok(ApiResponse::created(service.link(me.id, practitioner_id).await?))
}

async fn unlink_practitioner(
    State(service): State<Arc<FacilityService>>,
    me: Me,
    ApiPath(practitioner_id): ApiPath<i64>,
) -> ApiResult<()> {
    service.unlink(me.id, practitioner_id).await?;
    Ok(ApiResponse::no_content())
}

async fn list(State(service): State<Arc<FacilityService>>) -> ApiResult<Vec<Facility>> {
    Ok(ApiResponse::success(service.list().await?))
}

/// GET /api/facilities/:id, the one facility route open to practitioners
async fn show(State(service): State<Arc<FacilityService>>, ApiPath(id): ApiPath<i64>) -> ApiResult<Facility> {
    Ok(ApiResponse::success(service.get(id).await?))
}

#[derive(Debug, Deserialize)]
struct AssociationQuery {
    practitioner_id: i64,
    facility_id: i64,
}

async fn internal_association(
    State(service): State<Arc<FacilityService>>,
    ApiQuery(query): ApiQuery<AssociationQuery>,
) -> ApiResult<Existence> {
    let exists = service
        .association_exists(query.practitioner_id, query.facility_id)
        .await?;
    Ok(ApiResponse::success(Existence { exists }))
}
