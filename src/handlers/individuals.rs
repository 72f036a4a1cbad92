use axum::{extract::State, routing::get, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::database::models::{Individual, NewIndividual};
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::services::individual_service::IndividualPatch;
use crate::services::IndividualService;
use crate::siblings::Existence;

pub fn routes(service: Arc<IndividualService>) -> Router {
    Router::new()
        .route("/api/individuals", get(list).post(create))
        .route("/api/individuals/:id", get(show).put(replace).patch(patch).delete(delete))
        .with_state(service)
}

pub fn internal_routes(service: Arc<IndividualService>) -> Router {
    Router::new()
        .route("/internal/individuals/:id/exists", get(internal_exists))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    national_id: Option<String>,
}

async fn list(
    State(service): State<Arc<IndividualService>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Individual>> {
    Ok(ApiResponse::success(service.list(query.national_id.as_deref()).await?))
}

async fn create(
    State(service): State<Arc<IndividualService>>,
    ApiJson(draft): ApiJson<NewIndividual>,
) -> ApiResult<Individual> {
    Ok(ApiResponse::created(service.create(draft).await?))
}

async fn show(State(service): State<Arc<IndividualService>>, ApiPath(id): ApiPath<i64>) -> ApiResult<Individual> {
    Ok(ApiResponse::success(service.get(id).await?))
}

async fn replace(
    State(service): State<Arc<IndividualService>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<NewIndividual>,
) -> ApiResult<Individual> {
    Ok(ApiResponse::success(service.replace(id, update).await?))
}

async fn patch(
    State(service): State<Arc<IndividualService>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<IndividualPatch>,
) -> ApiResult<Individual> {
    Ok(ApiResponse::success(service.patch(id, patch).await?))
}

async fn delete(State(service): State<Arc<IndividualService>>, ApiPath(id): ApiPath<i64>) -> ApiResult<()> {
    service.delete(id).await?;
    Ok(ApiResponse::no_content())
}

async fn internal_exists(
    State(service): State<Arc<IndividualService>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Existence> {
    Ok(ApiResponse::success(Existence {
        exists: service.exists(id).await?,
    }))
}
